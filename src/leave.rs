use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{LeaveApproval, LeaveRequest};

/// In-memory leave-request queue plus the notification feed shown to
/// parents. Newest entries first, matching the dashboard lists.
#[derive(Debug, Default)]
pub struct LeaveLog {
    requests: Vec<LeaveRequest>,
    notifications: Vec<String>,
}

impl LeaveLog {
    pub fn new() -> LeaveLog {
        LeaveLog::default()
    }

    /// Files a leave request for one day. Requests start Pending;
    /// approval is a school-side decision recorded later.
    pub fn submit(
        &mut self,
        student_id: Uuid,
        date: NaiveDate,
        reason: &str,
        file_name: Option<String>,
    ) -> Result<&LeaveRequest, CoreError> {
        if reason.trim().is_empty() {
            return Err(CoreError::EmptyLeaveReason);
        }

        let request = LeaveRequest {
            id: Uuid::new_v4(),
            student_id,
            date,
            reason: reason.trim().to_string(),
            file_name,
            status: LeaveApproval::Pending,
            submitted_at: Utc::now(),
        };
        self.notifications.insert(
            0,
            format!("Leave requested for {} - pending approval", request.date),
        );
        self.requests.insert(0, request);
        Ok(&self.requests[0])
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.notifications.insert(0, message.into());
    }

    pub fn requests(&self) -> &[LeaveRequest] {
        &self.requests
    }

    pub fn notifications(&self) -> &[String] {
        &self.notifications
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    #[test]
    fn submitted_requests_start_pending() {
        let mut log = LeaveLog::new();
        let student = Uuid::new_v4();
        let request = log
            .submit(student, day(4), "Medical", Some("note.pdf".to_string()))
            .unwrap();
        assert_eq!(request.status, LeaveApproval::Pending);
        assert_eq!(request.student_id, student);
        assert_eq!(request.file_name.as_deref(), Some("note.pdf"));
    }

    #[test]
    fn blank_reason_is_rejected() {
        let mut log = LeaveLog::new();
        let result = log.submit(Uuid::new_v4(), day(4), "   ", None);
        assert!(matches!(result, Err(CoreError::EmptyLeaveReason)));
        assert!(log.requests().is_empty());
        assert!(log.notifications().is_empty());
    }

    #[test]
    fn newest_request_comes_first() {
        let mut log = LeaveLog::new();
        let student = Uuid::new_v4();
        log.submit(student, day(4), "Medical", None).unwrap();
        log.submit(student, day(9), "Family function", None).unwrap();
        assert_eq!(log.requests().len(), 2);
        assert_eq!(log.requests()[0].date, day(9));
        assert_eq!(log.requests()[1].date, day(4));
    }

    #[test]
    fn submission_lands_in_the_notification_feed() {
        let mut log = LeaveLog::new();
        log.submit(Uuid::new_v4(), day(4), "Medical", None).unwrap();
        log.notify("Remark saved for 2025-09-05");
        assert_eq!(log.notifications().len(), 2);
        assert_eq!(log.notifications()[0], "Remark saved for 2025-09-05");
        assert!(log.notifications()[1].starts_with("Leave requested for 2025-09-04"));
    }
}
