//! Calendar events derived from sessions.

use chrono::{DateTime, Utc};

use crate::session::Session;

pub const EVENT_SUMMARY: &str = "Octopus Energy free energy session";

/// Suffix appended to the session id to name the calendar object.
pub const OBJECT_SUFFIX: &str = "-osminokal-event.ics";

/// A reminder/alarm attached to every event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reminder {
    /// Minutes before the event start to trigger
    pub minutes: i64,
    /// VALARM ACTION
    pub action: &'static str,
    pub description: &'static str,
}

const PLUG_IN: &str = "reminder to plug in!";

/// Alarms on every materialized event: 1h, 6h and 12h before the start.
pub const REMINDERS: [Reminder; 3] = [
    Reminder {
        minutes: 60,
        action: "DISPLAY",
        description: PLUG_IN,
    },
    Reminder {
        minutes: 6 * 60,
        action: "DISPLAY",
        description: PLUG_IN,
    },
    Reminder {
        minutes: 12 * 60,
        action: "DISPLAY",
        description: PLUG_IN,
    },
];

/// The calendar-side view of a session, ready for ICS generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub uid: String,
    pub summary: &'static str,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// DTSTAMP: when the event was materialized, not a session attribute.
    pub created: DateTime<Utc>,
    pub reminders: &'static [Reminder],
}

impl CalendarEvent {
    pub fn from_session(session: &Session, created: DateTime<Utc>) -> Self {
        CalendarEvent {
            uid: session.id.clone(),
            summary: EVENT_SUMMARY,
            start: session.start,
            end: session.end,
            created,
            reminders: &REMINDERS,
        }
    }

    /// Object name inside the calendar collection. Stable for a given session id.
    pub fn object_name(&self) -> String {
        format!("{}{}", self.uid, OBJECT_SUFFIX)
    }
}
