use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Coordinate {
        Coordinate { lat, lon }
    }
}

/// Fixed patrol path for one bus. Cyclic: after the last point the
/// vehicle wraps back to the first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Coordinate>", into = "Vec<Coordinate>")]
pub struct Route {
    points: Vec<Coordinate>,
}

impl Route {
    pub fn new(points: Vec<Coordinate>) -> Result<Route, CoreError> {
        if points.len() < 2 {
            return Err(CoreError::RouteTooShort(points.len()));
        }
        Ok(Route { points })
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn point(&self, index: usize) -> Coordinate {
        self.points[index % self.points.len()]
    }
}

impl TryFrom<Vec<Coordinate>> for Route {
    type Error = CoreError;

    fn try_from(points: Vec<Coordinate>) -> Result<Route, CoreError> {
        Route::new(points)
    }
}

impl From<Route> for Vec<Coordinate> {
    fn from(route: Route) -> Vec<Coordinate> {
        route.points
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehiclePosition {
    pub index: usize,
    pub coords: Coordinate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub coords: Coordinate,
    /// Scheduled pickup time of day, display only. Not checked against
    /// the live ETA.
    pub pickup: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactPerson {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusInfo {
    pub bus_no: String,
    pub driver: ContactPerson,
    pub attendant: ContactPerson,
    pub capacity: u32,
}

#[derive(Debug, Clone)]
pub struct StudentProfile {
    pub id: Uuid,
    pub name: String,
    pub grade: String,
    pub section: String,
    pub stop_id: String,
    pub seat: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Holiday,
    #[serde(rename = "leave")]
    OnLeave,
    /// Implicit state for any date with no record. Never stored in a
    /// MonthAttendance map.
    #[serde(rename = "no-data")]
    NoData,
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let label = match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::Holiday => "Holiday",
            AttendanceStatus::OnLeave => "Leave",
            AttendanceStatus::NoData => "N/A",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveApproval {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for LeaveApproval {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let label = match self {
            LeaveApproval::Pending => "Pending",
            LeaveApproval::Approved => "Approved",
            LeaveApproval::Rejected => "Rejected",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveDetail {
    pub reason: String,
    pub status: LeaveApproval,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub remark: Option<String>,
    pub leave: Option<LeaveDetail>,
}

/// Daily records for one student over one calendar month, keyed by date.
#[derive(Debug, Clone)]
pub struct MonthAttendance {
    pub student_id: Uuid,
    pub year: i32,
    pub month: u32,
    records: BTreeMap<NaiveDate, DayRecord>,
}

impl MonthAttendance {
    pub fn new(student_id: Uuid, year: i32, month: u32) -> Result<MonthAttendance, CoreError> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::InvalidMonth(month));
        }
        Ok(MonthAttendance {
            student_id,
            year,
            month,
            records: BTreeMap::new(),
        })
    }

    pub fn month_key(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }

    /// Inserts the record, replacing any earlier record for the same
    /// date. Records dated outside this month are rejected.
    pub fn insert(&mut self, record: DayRecord) -> Result<(), CoreError> {
        if record.date.year() != self.year || record.date.month() != self.month {
            return Err(CoreError::DateOutsideMonth {
                date: record.date,
                month_key: self.month_key(),
            });
        }
        self.records.insert(record.date, record);
        Ok(())
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DayRecord> {
        self.records.get(&date)
    }

    pub fn records(&self) -> impl Iterator<Item = &DayRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Teacher-remark annotation. Upserts: a date with no record gets a
    /// NoData record carrying the remark, so a remark can land on any
    /// day of the month.
    pub fn set_remark(&mut self, date: NaiveDate, text: &str) -> Result<(), CoreError> {
        if date.year() != self.year || date.month() != self.month {
            return Err(CoreError::DateOutsideMonth {
                date,
                month_key: self.month_key(),
            });
        }
        self.records
            .entry(date)
            .or_insert(DayRecord {
                date,
                status: AttendanceStatus::NoData,
                remark: None,
                leave: None,
            })
            .remark = Some(text.to_string());
        Ok(())
    }
}

/// Derived on demand from a MonthAttendance; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub holiday: usize,
    pub leave: usize,
    pub percent: u32,
}

#[derive(Debug, Clone)]
pub struct LeaveRequest {
    pub id: Uuid,
    pub student_id: Uuid,
    pub date: NaiveDate,
    pub reason: String,
    pub file_name: Option<String>,
    pub status: LeaveApproval,
    pub submitted_at: DateTime<Utc>,
}

/// One cell of a 7-column month grid: a leading blank before the first
/// weekday, or a day paired with its recorded status.
#[derive(Debug, Clone, PartialEq)]
pub enum CalendarCell {
    Blank,
    Day {
        date: NaiveDate,
        status: AttendanceStatus,
        remark: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub route: Route,
    pub stops: Vec<Stop>,
    pub bus: BusInfo,
    pub speed_kmh: f64,
    pub tick_ms: u64,
}
