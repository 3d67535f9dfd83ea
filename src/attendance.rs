use chrono::{Datelike, NaiveDate};

use crate::error::CoreError;
use crate::models::{AttendanceStatus, AttendanceSummary, CalendarCell, MonthAttendance};

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, CoreError> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(CoreError::InvalidMonth(month))
}

pub fn days_in_month(year: i32, month: u32) -> Result<u32, CoreError> {
    let first = first_of_month(year, month)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or(CoreError::InvalidMonth(month))?;
    Ok((next - first).num_days() as u32)
}

/// Day of week of the 1st, 0 = Sunday .. 6 = Saturday. Determines the
/// leading blank cells of a 7-column calendar grid.
pub fn first_weekday_of_month(year: i32, month: u32) -> Result<u32, CoreError> {
    Ok(first_of_month(year, month)?.weekday().num_days_from_sunday())
}

/// Counts recorded days by status. Dates carrying only a remark (NoData
/// status) stay out of the totals, so the percentage reflects recorded
/// school days only. An empty month is a valid zero summary, not an
/// error.
pub fn summarize(month: &MonthAttendance) -> AttendanceSummary {
    let mut summary = AttendanceSummary {
        total: 0,
        present: 0,
        absent: 0,
        holiday: 0,
        leave: 0,
        percent: 0,
    };

    for record in month.records() {
        match record.status {
            AttendanceStatus::Present => summary.present += 1,
            AttendanceStatus::Absent => summary.absent += 1,
            AttendanceStatus::Holiday => summary.holiday += 1,
            AttendanceStatus::OnLeave => summary.leave += 1,
            AttendanceStatus::NoData => continue,
        }
        summary.total += 1;
    }

    if summary.total > 0 {
        summary.percent = (summary.present as f64 / summary.total as f64 * 100.0).round() as u32;
    }
    summary
}

pub fn is_low_attendance(summary: &AttendanceSummary, threshold_percent: u32) -> bool {
    summary.percent < threshold_percent
}

/// Full-month grid for rendering: `first_weekday_of_month` blanks, then
/// one cell per day 1..=days_in_month paired with its record (NoData
/// where the month has none). Pure in its inputs; recomputing yields the
/// same grid.
pub fn build_calendar_grid(month: &MonthAttendance) -> Result<Vec<CalendarCell>, CoreError> {
    let leading = first_weekday_of_month(month.year, month.month)? as usize;
    let days = days_in_month(month.year, month.month)?;

    let mut cells = Vec::with_capacity(leading + days as usize);
    cells.resize(leading, CalendarCell::Blank);

    for day in 1..=days {
        let date = NaiveDate::from_ymd_opt(month.year, month.month, day)
            .ok_or(CoreError::InvalidMonth(month.month))?;
        let (status, remark) = match month.get(date) {
            Some(record) => (record.status, record.remark.clone()),
            None => (AttendanceStatus::NoData, None),
        };
        cells.push(CalendarCell::Day {
            date,
            status,
            remark,
        });
    }

    Ok(cells)
}
