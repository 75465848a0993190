use thiserror::Error;

/// Domain errors raised by the tracker core
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TrackerError {
    /// Text that names none of the four schedule categories
    #[error("unknown day type: {0:?}")]
    InvalidDayType(String),

    /// Text that names neither "study" nor "break"
    #[error("unknown activity type: {0:?}")]
    InvalidActivityType(String),

    /// An append was attempted with zero, negative or NaN hours
    #[error("duration must be positive, got {0} hours")]
    NonPositiveDuration(f64),

    /// A stored value that cannot be upgraded to an activity record
    #[error("malformed legacy record for {date}: {reason}")]
    MalformedLegacyRecord { date: String, reason: String },
}
