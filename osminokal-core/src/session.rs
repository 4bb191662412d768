//! The session record that flows through the pipeline.
//!
//! Sources convert their upstream payloads into [`Session`]s, and calendars
//! work exclusively with them.

use chrono::{DateTime, Utc};

/// One free energy window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Stable id, used as the idempotency key by calendars.
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Session {
    /// Build a session, rejecting empty or inverted windows.
    pub fn new(id: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if end <= start {
            return None;
        }

        Some(Session {
            id: id.into(),
            start,
            end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejects_end_before_start() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert!(Session::new("a", start, end).is_none());
        assert!(Session::new("a", start, start).is_none());
        assert!(Session::new("a", end, start).is_some());
    }
}
