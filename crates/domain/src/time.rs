//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for log entries and run-window bounds.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Whether `at` falls inside the inclusive window `[start, end]`.
///
/// A missing bound is open on that side; with both bounds missing every
/// instant is inside the window.
#[must_use]
pub fn within_window(at: Timestamp, start: Option<Timestamp>, end: Option<Timestamp>) -> bool {
    start.is_none_or(|start| at >= start) && end.is_none_or(|end| at <= end)
}
