use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use crate::attendance;
use crate::error::CoreError;
use crate::models::{
    AttendanceStatus, BusInfo, ContactPerson, Coordinate, DayRecord, LeaveApproval, LeaveDetail,
    MonthAttendance, Route, Stop, StudentProfile, TransportConfig,
};

/// Generates a demo month with the dashboard's mock distribution: 8%
/// holiday, 10% absent, 5% leave, the rest present. Deterministic for a
/// fixed seed so fixtures and seeded demo files are reproducible.
pub fn seed_month(
    student_id: Uuid,
    year: i32,
    month: u32,
    seed: u64,
) -> Result<MonthAttendance, CoreError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut records = MonthAttendance::new(student_id, year, month)?;

    for day in 1..=attendance::days_in_month(year, month)? {
        let date =
            NaiveDate::from_ymd_opt(year, month, day).ok_or(CoreError::InvalidMonth(month))?;
        let roll: f64 = rng.gen();
        let status = if roll < 0.08 {
            AttendanceStatus::Holiday
        } else if roll < 0.18 {
            AttendanceStatus::Absent
        } else if roll < 0.23 {
            AttendanceStatus::OnLeave
        } else {
            AttendanceStatus::Present
        };

        let remark = (status == AttendanceStatus::Absent)
            .then(|| "Absent: parent's note pending".to_string());
        let leave = (status == AttendanceStatus::OnLeave).then(|| LeaveDetail {
            reason: "Medical".to_string(),
            status: LeaveApproval::Approved,
        });

        records.insert(DayRecord {
            date,
            status,
            remark,
            leave,
        })?;
    }

    Ok(records)
}

pub fn import_attendance_csv(
    path: &Path,
    student_id: Uuid,
) -> anyhow::Result<Vec<MonthAttendance>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    read_attendance_csv(file, student_id)
}

/// Reads per-day rows (date, status, remark, leave_reason, leave_status)
/// and groups them into one MonthAttendance per calendar month. NoData
/// rows are placeholders in exports and are skipped here.
pub fn read_attendance_csv(
    reader: impl Read,
    student_id: Uuid,
) -> anyhow::Result<Vec<MonthAttendance>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        date: NaiveDate,
        status: AttendanceStatus,
        remark: Option<String>,
        leave_reason: Option<String>,
        leave_status: Option<LeaveApproval>,
    }

    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut months: BTreeMap<(i32, u32), MonthAttendance> = BTreeMap::new();

    for result in csv_reader.deserialize::<CsvRow>() {
        let row = result?;
        if row.status == AttendanceStatus::NoData {
            continue;
        }

        let key = (row.date.year(), row.date.month());
        let month = match months.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(slot) => slot.insert(MonthAttendance::new(student_id, key.0, key.1)?),
        };

        let leave = (row.status == AttendanceStatus::OnLeave).then(|| LeaveDetail {
            reason: row
                .leave_reason
                .clone()
                .unwrap_or_else(|| "Unspecified".to_string()),
            status: row.leave_status.unwrap_or(LeaveApproval::Pending),
        });

        month.insert(DayRecord {
            date: row.date,
            status: row.status,
            remark: row.remark,
            leave,
        })?;
    }

    Ok(months.into_values().collect())
}

pub fn load_transport_config(path: &Path) -> anyhow::Result<TransportConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: TransportConfig =
        serde_json::from_str(&raw).context("invalid transport config")?;
    if config.speed_kmh <= 0.0 {
        return Err(CoreError::InvalidSpeed(config.speed_kmh).into());
    }
    Ok(config)
}

pub fn find_stop<'a>(stops: &'a [Stop], id: &str) -> Result<&'a Stop, CoreError> {
    stops
        .iter()
        .find(|stop| stop.id == id)
        .ok_or_else(|| CoreError::StopNotFound(id.to_string()))
}

/// Demo route, stops and bus from the school's Bhubaneswar pilot.
pub fn sample_transport_config() -> Result<TransportConfig, CoreError> {
    Ok(TransportConfig {
        route: Route::new(vec![
            Coordinate::new(20.2959, 85.8245),
            Coordinate::new(20.2965, 85.8255),
            Coordinate::new(20.2972, 85.8262),
            Coordinate::new(20.2980, 85.8268),
            Coordinate::new(20.2988, 85.8275),
        ])?,
        stops: vec![
            Stop {
                id: "S1".to_string(),
                name: "Main Gate".to_string(),
                coords: Coordinate::new(20.2959, 85.8245),
                pickup: "7:15 AM".to_string(),
            },
            Stop {
                id: "S2".to_string(),
                name: "Oak Street".to_string(),
                coords: Coordinate::new(20.2972, 85.8262),
                pickup: "7:25 AM".to_string(),
            },
            Stop {
                id: "S3".to_string(),
                name: "River View".to_string(),
                coords: Coordinate::new(20.2988, 85.8275),
                pickup: "7:35 AM".to_string(),
            },
        ],
        bus: BusInfo {
            bus_no: "OD-02-1234".to_string(),
            driver: ContactPerson {
                name: "Ramesh Kumar".to_string(),
                phone: "+91-9876543210".to_string(),
            },
            attendant: ContactPerson {
                name: "Sita Devi".to_string(),
                phone: "+91-9123456780".to_string(),
            },
            capacity: 40,
        },
        speed_kmh: 20.0,
        tick_ms: 2000,
    })
}

pub fn sample_students() -> anyhow::Result<Vec<StudentProfile>> {
    Ok(vec![
        StudentProfile {
            id: Uuid::parse_str("7c9a6e84-53b2-4bb0-9c23-4f3d1a2b8c01")?,
            name: "Alice Doe".to_string(),
            grade: "5th Grade".to_string(),
            section: "A".to_string(),
            stop_id: "S1".to_string(),
            seat: "A1".to_string(),
        },
        StudentProfile {
            id: Uuid::parse_str("f1b4d2c8-7e95-4a61-b0d4-9a8c3e5f7d02")?,
            name: "Bob Doe".to_string(),
            grade: "8th Grade".to_string(),
            section: "B".to_string(),
            stop_id: "S3".to_string(),
            seat: "B2".to_string(),
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_is_deterministic() {
        let student = Uuid::new_v4();
        let first = seed_month(student, 2025, 9, 42).unwrap();
        let second = seed_month(student, 2025, 9, 42).unwrap();
        let a: Vec<_> = first.records().cloned().collect();
        let b: Vec<_> = second.records().cloned().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn seeded_month_covers_every_day() {
        let month = seed_month(Uuid::new_v4(), 2024, 2, 7).unwrap();
        assert_eq!(month.len(), 29);
        for record in month.records() {
            assert_ne!(record.status, AttendanceStatus::NoData);
            if record.status == AttendanceStatus::Absent {
                assert!(record.remark.is_some());
            }
            if record.status == AttendanceStatus::OnLeave {
                assert!(record.leave.is_some());
            }
        }
    }

    #[test]
    fn csv_rows_group_by_month_and_skip_placeholders() {
        let csv = "\
date,status,remark,leave_reason,leave_status
2025-09-01,present,,,
2025-09-02,absent,note pending,,
2025-09-03,no-data,,,
2025-10-01,leave,,Medical,Approved
";
        let student = Uuid::new_v4();
        let months = read_attendance_csv(csv.as_bytes(), student).unwrap();
        assert_eq!(months.len(), 2);

        let september = &months[0];
        assert_eq!(september.month_key(), "2025-09");
        assert_eq!(september.len(), 2);
        assert!(september
            .get(NaiveDate::from_ymd_opt(2025, 9, 3).unwrap())
            .is_none());

        let october = &months[1];
        assert_eq!(october.month_key(), "2025-10");
        let record = october
            .get(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap())
            .unwrap();
        assert_eq!(record.status, AttendanceStatus::OnLeave);
        let leave = record.leave.as_ref().unwrap();
        assert_eq!(leave.reason, "Medical");
        assert_eq!(leave.status, LeaveApproval::Approved);
    }

    #[test]
    fn unknown_stop_id_is_not_found() {
        let config = sample_transport_config().unwrap();
        assert!(find_stop(&config.stops, "S2").is_ok());
        assert!(matches!(
            find_stop(&config.stops, "S9"),
            Err(CoreError::StopNotFound(_))
        ));
    }

    #[test]
    fn sample_config_matches_the_pilot_route() {
        let config = sample_transport_config().unwrap();
        assert_eq!(config.route.len(), 5);
        assert_eq!(config.stops.len(), 3);
        assert_eq!(config.bus.bus_no, "OD-02-1234");
        assert_eq!(config.speed_kmh, 20.0);
    }
}
