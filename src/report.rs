use std::fmt::Write as _;
use std::io::Write;

use chrono::{Datelike, NaiveDate};

use crate::attendance;
use crate::error::CoreError;
use crate::geo;
use crate::models::{
    AttendanceStatus, CalendarCell, Coordinate, MonthAttendance, StudentProfile, TransportConfig,
};

/// Markdown attendance report for one student and month, the file the
/// dashboard offered as a PDF download.
pub fn build_attendance_report(
    student: &StudentProfile,
    month: &MonthAttendance,
    threshold_percent: u32,
) -> String {
    let summary = attendance::summarize(month);

    let mut output = String::new();
    let _ = writeln!(output, "# Attendance Summary");
    let _ = writeln!(
        output,
        "{} ({} {}), month {}",
        student.name,
        student.grade,
        student.section,
        month.month_key()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Student: {}", student.name);
    let _ = writeln!(output, "- Student ID: {}", month.student_id);
    let _ = writeln!(output, "- Month: {}", month.month_key());
    let _ = writeln!(output, "- Total: {}", summary.total);
    let _ = writeln!(output, "- Present: {}", summary.present);
    let _ = writeln!(output, "- Absent: {}", summary.absent);
    let _ = writeln!(output, "- Leave: {}", summary.leave);
    let _ = writeln!(output, "- Holiday: {}", summary.holiday);
    let _ = writeln!(output, "- Percent: {}%", summary.percent);

    if month.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "No attendance recorded this month.");
    }

    if attendance::is_low_attendance(&summary, threshold_percent) {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "Low attendance: {}% is below the {}% threshold.",
            summary.percent, threshold_percent
        );
    }

    let leave_days: Vec<_> = month
        .records()
        .filter(|r| r.status == AttendanceStatus::OnLeave)
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Leave Days");
    if leave_days.is_empty() {
        let _ = writeln!(output, "No leave recorded this month.");
    } else {
        for record in leave_days {
            match &record.leave {
                Some(detail) => {
                    let _ = writeln!(
                        output,
                        "- {}: {} ({})",
                        record.date, detail.reason, detail.status
                    );
                }
                None => {
                    let _ = writeln!(output, "- {}", record.date);
                }
            }
        }
    }

    let remarks: Vec<_> = month
        .records()
        .filter(|r| r.remark.as_deref().is_some_and(|t| !t.is_empty()))
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Remarks");
    if remarks.is_empty() {
        let _ = writeln!(output, "No remarks this month.");
    } else {
        for record in remarks {
            if let Some(remark) = &record.remark {
                let _ = writeln!(output, "- {}: {}", record.date, remark);
            }
        }
    }

    output
}

/// The summary table row the dashboard exported: Student, Month, Total,
/// Present, Absent, Leave, Holiday, Percent.
pub fn write_summary_csv(
    writer: impl Write,
    student: &StudentProfile,
    month: &MonthAttendance,
) -> anyhow::Result<()> {
    let summary = attendance::summarize(month);
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "Student", "Month", "Total", "Present", "Absent", "Leave", "Holiday", "Percent",
    ])?;
    let month_key = month.month_key();
    let counts = [
        summary.total.to_string(),
        summary.present.to_string(),
        summary.absent.to_string(),
        summary.leave.to_string(),
        summary.holiday.to_string(),
        format!("{}%", summary.percent),
    ];
    csv_writer.write_record(
        [student.name.as_str(), month_key.as_str()]
            .into_iter()
            .chain(counts.iter().map(String::as_str)),
    )?;
    csv_writer.flush()?;
    Ok(())
}

/// One row per day of the month, a no-data placeholder where nothing
/// was recorded. The same shape the dashboard's CSV export produced,
/// and the shape `data::read_attendance_csv` accepts back.
pub fn write_month_csv(writer: impl Write, month: &MonthAttendance) -> anyhow::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["date", "status", "remark", "leave_reason", "leave_status"])?;

    for day in 1..=attendance::days_in_month(month.year, month.month)? {
        let date = NaiveDate::from_ymd_opt(month.year, month.month, day)
            .ok_or(CoreError::InvalidMonth(month.month))?;
        let record = month.get(date);
        let status = record.map_or(AttendanceStatus::NoData, |r| r.status);
        let status_field = match status {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Holiday => "holiday",
            AttendanceStatus::OnLeave => "leave",
            AttendanceStatus::NoData => "no-data",
        };
        let remark = record.and_then(|r| r.remark.as_deref()).unwrap_or("");
        let (leave_reason, leave_status) = match record.and_then(|r| r.leave.as_ref()) {
            Some(detail) => (detail.reason.as_str(), detail.status.to_string()),
            None => ("", String::new()),
        };
        let date_field = date.to_string();
        csv_writer.write_record([
            date_field.as_str(),
            status_field,
            remark,
            leave_reason,
            leave_status.as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// 7-column text rendering of the month grid for terminal display.
pub fn render_text_calendar(month: &MonthAttendance) -> Result<String, CoreError> {
    let grid = attendance::build_calendar_grid(month)?;

    let mut output = String::new();
    let _ = writeln!(output, "{}", month.month_key());
    let _ = writeln!(output, "Sun  Mon  Tue  Wed  Thu  Fri  Sat");
    for week in grid.chunks(7) {
        let mut row = String::new();
        for cell in week {
            match cell {
                CalendarCell::Blank => row.push_str("     "),
                CalendarCell::Day { date, status, .. } => {
                    let letter = match status {
                        AttendanceStatus::Present => 'P',
                        AttendanceStatus::Absent => 'A',
                        AttendanceStatus::Holiday => 'H',
                        AttendanceStatus::OnLeave => 'L',
                        AttendanceStatus::NoData => '.',
                    };
                    let _ = write!(row, "{:>2}{:<3}", date.day(), letter);
                }
            }
        }
        let _ = writeln!(output, "{}", row.trim_end());
    }

    Ok(output)
}

/// Markdown transport sheet: bus crew, stop schedule, and a seat table
/// with the live ETA from the supplied vehicle position.
pub fn build_transport_report(
    config: &TransportConfig,
    students: &[StudentProfile],
    vehicle: Coordinate,
) -> Result<String, CoreError> {
    let mut output = String::new();
    let _ = writeln!(output, "# Transport Records");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Bus & Driver");
    let _ = writeln!(output, "- Bus: {}", config.bus.bus_no);
    let _ = writeln!(
        output,
        "- Driver: {} ({})",
        config.bus.driver.name, config.bus.driver.phone
    );
    let _ = writeln!(
        output,
        "- Attendant: {} ({})",
        config.bus.attendant.name, config.bus.attendant.phone
    );
    let _ = writeln!(output, "- Capacity: {}", config.bus.capacity);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Route");
    for point in config.route.points() {
        let _ = writeln!(output, "- ({:.4}, {:.4})", point.lat, point.lon);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Stops & Schedule");
    for stop in &config.stops {
        let _ = writeln!(output, "- {}: pickup {}", stop.name, stop.pickup);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students");
    for student in students {
        let stop = crate::data::find_stop(&config.stops, &student.stop_id)?;
        let eta = geo::eta_minutes(vehicle, stop.coords, config.speed_kmh)?;
        let _ = writeln!(
            output,
            "- {} (seat {}): {} stop, ETA {} mins",
            student.name, student.seat, stop.name, eta
        );
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;
    use crate::models::DayRecord;
    use uuid::Uuid;

    fn student() -> StudentProfile {
        StudentProfile {
            id: Uuid::new_v4(),
            name: "Alice Doe".to_string(),
            grade: "5th Grade".to_string(),
            section: "A".to_string(),
            stop_id: "S1".to_string(),
            seat: "A1".to_string(),
        }
    }

    fn september_2025(student_id: Uuid) -> MonthAttendance {
        let mut month = MonthAttendance::new(student_id, 2025, 9).unwrap();
        month
            .insert(DayRecord {
                date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
                status: AttendanceStatus::Present,
                remark: None,
                leave: None,
            })
            .unwrap();
        month
            .insert(DayRecord {
                date: NaiveDate::from_ymd_opt(2025, 9, 2).unwrap(),
                status: AttendanceStatus::Absent,
                remark: Some("note pending".to_string()),
                leave: None,
            })
            .unwrap();
        month
    }

    #[test]
    fn report_carries_the_export_fields() {
        let student = student();
        let month = september_2025(student.id);
        let report = build_attendance_report(&student, &month, 75);
        assert!(report.contains("- Student: Alice Doe"));
        assert!(report.contains("- Month: 2025-09"));
        assert!(report.contains("- Total: 2"));
        assert!(report.contains("- Present: 1"));
        assert!(report.contains("- Absent: 1"));
        assert!(report.contains("- Leave: 0"));
        assert!(report.contains("- Holiday: 0"));
        assert!(report.contains("- Percent: 50%"));
        assert!(report.contains("Low attendance"));
        assert!(report.contains("- 2025-09-02: note pending"));
    }

    #[test]
    fn high_threshold_flag_disappears_when_met() {
        let student = student();
        let month = september_2025(student.id);
        let report = build_attendance_report(&student, &month, 40);
        assert!(!report.contains("Low attendance"));
    }

    #[test]
    fn summary_csv_has_the_dashboard_columns() {
        let student = student();
        let month = september_2025(student.id);
        let mut buffer = Vec::new();
        write_summary_csv(&mut buffer, &student, &month).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Student,Month,Total,Present,Absent,Leave,Holiday,Percent"
        );
        assert_eq!(lines.next().unwrap(), "Alice Doe,2025-09,2,1,1,0,0,50%");
    }

    #[test]
    fn month_csv_writes_every_day_with_placeholders() {
        let student = student();
        let month = september_2025(student.id);
        let mut buffer = Vec::new();
        write_month_csv(&mut buffer, &month).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 1 + 30);
        assert_eq!(lines[1], "2025-09-01,present,,,");
        assert_eq!(lines[2], "2025-09-02,absent,note pending,,");
        assert_eq!(lines[3], "2025-09-03,no-data,,,");
    }

    #[test]
    fn month_csv_round_trips_through_import() {
        let student = student();
        let month = september_2025(student.id);
        let mut buffer = Vec::new();
        write_month_csv(&mut buffer, &month).unwrap();

        let months = data::read_attendance_csv(buffer.as_slice(), student.id).unwrap();
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].len(), 2);
        assert_eq!(
            attendance::summarize(&months[0]),
            attendance::summarize(&month)
        );
    }

    #[test]
    fn text_calendar_offsets_the_first_week() {
        let student = student();
        let month = september_2025(student.id);
        let text = render_text_calendar(&month).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "2025-09");
        assert_eq!(lines[1], "Sun  Mon  Tue  Wed  Thu  Fri  Sat");
        // September 2025 starts on a Monday, so the first cell is blank.
        assert!(lines[2].starts_with("      1P   2A   3."));
        assert_eq!(lines.len(), 2 + 5);
        assert!(lines[6].contains("30"));
    }

    #[test]
    fn transport_report_lists_crew_stops_and_etas() {
        let config = data::sample_transport_config().unwrap();
        let students = data::sample_students().unwrap();
        let report =
            build_transport_report(&config, &students, config.route.point(0)).unwrap();
        assert!(report.contains("- Bus: OD-02-1234"));
        assert!(report.contains("- Driver: Ramesh Kumar (+91-9876543210)"));
        assert!(report.contains("- Main Gate: pickup 7:15 AM"));
        assert!(report.contains("Alice Doe (seat A1): Main Gate stop, ETA 0 mins"));
        assert!(report.contains("Bob Doe (seat B2): River View stop"));
    }

    #[test]
    fn unknown_student_stop_fails_the_transport_report() {
        let config = data::sample_transport_config().unwrap();
        let mut students = data::sample_students().unwrap();
        students[0].stop_id = "S9".to_string();
        let result = build_transport_report(&config, &students, config.route.point(0));
        assert!(matches!(result, Err(CoreError::StopNotFound(_))));
    }
}
