use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("route must have at least two points, got {0}")]
    RouteTooShort(usize),

    #[error("speed must be positive, got {0} km/h")]
    InvalidSpeed(f64),

    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),

    #[error("date {date} is outside month {month_key}")]
    DateOutsideMonth { date: NaiveDate, month_key: String },

    #[error("stop not found: {0}")]
    StopNotFound(String),

    #[error("leave request needs a reason")]
    EmptyLeaveReason,
}
