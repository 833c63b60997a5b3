//! Log ring — fixed-capacity rolling record of circuit activity.
//!
//! Every condition notification, evaluation outcome, executor response and
//! failure is appended here so a circuit can be inspected while it runs and
//! after it halts. Once full, each append overwrites the oldest entry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::time::{self, Timestamp};

/// Number of entries a circuit keeps.
pub const LOG_CAPACITY: usize = 1000;

/// What kind of activity a [`LogEntry`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    /// Condition notifications, logic outcomes, run-constraint transitions.
    Condition,
    /// Failures of any phase.
    Error,
    /// Results returned by the executor.
    Response,
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Condition => f.write_str("condition"),
            Self::Error => f.write_str("error"),
            Self::Response => f.write_str("response"),
        }
    }
}

/// Error returned when parsing an unknown [`LogCategory`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log category `{0}`")]
pub struct UnknownCategory(pub String);

impl FromStr for LogCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "condition" => Ok(Self::Condition),
            "error" => Ok(Self::Error),
            "response" => Ok(Self::Response),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// A single record in the [`LogRing`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub category: LogCategory,
    pub message: String,
    /// JSON-serialized context for the entry.
    pub payload: String,
    pub timestamp: Timestamp,
}

/// Fixed-capacity circular buffer of [`LogEntry`] values.
#[derive(Debug, Clone)]
pub struct LogRing {
    entries: Vec<LogEntry>,
    capacity: usize,
    /// Slot the next append writes to once the ring is full.
    next: usize,
}

impl Default for LogRing {
    fn default() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }
}

impl LogRing {
    /// Create an empty ring holding [`LOG_CAPACITY`] entries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty ring with a custom capacity (at least one entry).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            next: 0,
        }
    }

    /// Append an entry, evicting the oldest one when the ring is full.
    ///
    /// The entry is mirrored to `tracing` at a level matching its category.
    pub fn append(
        &mut self,
        category: LogCategory,
        message: impl Into<String>,
        payload: &serde_json::Value,
    ) {
        let entry = LogEntry {
            category,
            message: message.into(),
            payload: payload.to_string(),
            timestamp: time::now(),
        };

        match category {
            LogCategory::Error => {
                tracing::error!(%category, payload = %entry.payload, "{}", entry.message);
            }
            LogCategory::Condition | LogCategory::Response => {
                tracing::info!(%category, payload = %entry.payload, "{}", entry.message);
            }
        }

        if self.entries.len() < self.capacity {
            self.entries.push(entry);
        } else {
            self.entries[self.next] = entry;
            self.next = (self.next + 1) % self.capacity;
        }
    }

    /// Return entries oldest-to-newest, optionally restricted to one category.
    #[must_use]
    pub fn read(&self, category: Option<LogCategory>) -> Vec<LogEntry> {
        let (newer, older) = self.entries.split_at(self.next);
        older
            .iter()
            .chain(newer)
            .filter(|entry| category.is_none_or(|c| entry.category == c))
            .cloned()
            .collect()
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries held at once.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_return_entries_in_append_order() {
        let mut ring = LogRing::new();
        ring.append(LogCategory::Condition, "first", &json!(1));
        ring.append(LogCategory::Response, "second", &json!(2));

        let messages: Vec<_> = ring.read(None).into_iter().map(|e| e.message).collect();
        assert_eq!(messages, ["first", "second"]);
    }

    #[test]
    fn should_evict_oldest_entry_when_full() {
        let mut ring = LogRing::new();
        for i in 0..=LOG_CAPACITY {
            ring.append(LogCategory::Condition, format!("entry {i}"), &json!(i));
        }

        let entries = ring.read(None);
        assert_eq!(entries.len(), LOG_CAPACITY);
        assert_eq!(entries[0].message, "entry 1");
        assert_eq!(entries[LOG_CAPACITY - 1].message, format!("entry {LOG_CAPACITY}"));
    }

    #[test]
    fn should_keep_chronological_order_after_several_wraps() {
        let mut ring = LogRing::with_capacity(3);
        for i in 0..8 {
            ring.append(LogCategory::Condition, i.to_string(), &json!(null));
        }

        let messages: Vec<_> = ring.read(None).into_iter().map(|e| e.message).collect();
        assert_eq!(messages, ["5", "6", "7"]);
    }

    #[test]
    fn should_filter_by_category() {
        let mut ring = LogRing::new();
        ring.append(LogCategory::Condition, "matched", &json!({"id": 1}));
        ring.append(LogCategory::Error, "boom", &json!({"phase": "execute"}));
        ring.append(LogCategory::Condition, "unmatched", &json!({"id": 1}));

        let errors = ring.read(Some(LogCategory::Error));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "boom");
        assert_eq!(errors[0].payload, r#"{"phase":"execute"}"#);
        assert_eq!(ring.read(Some(LogCategory::Condition)).len(), 2);
    }

    #[test]
    fn should_never_grow_past_capacity() {
        let mut ring = LogRing::with_capacity(2);
        for _ in 0..10 {
            ring.append(LogCategory::Response, "r", &json!({}));
        }
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.capacity(), 2);
    }

    #[test]
    fn should_parse_category_case_insensitively() {
        assert_eq!("ERROR".parse::<LogCategory>(), Ok(LogCategory::Error));
        assert_eq!("condition".parse::<LogCategory>(), Ok(LogCategory::Condition));
        assert!("debug".parse::<LogCategory>().is_err());
    }
}
