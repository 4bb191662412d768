//! ICS file generation.

use chrono::{DateTime, Utc};
use icalendar::{Alarm, Calendar, Component, EventLike, Trigger};

use crate::event::CalendarEvent;

pub const PRODUCT_ID: &str = "-//osminokal//osminokal//EN";

/// Generate .ics content for one event with its reminders
pub fn generate_ics(event: &CalendarEvent) -> String {
    let mut cal = Calendar::new();

    let mut ics_event = icalendar::Event::new();
    ics_event.uid(&event.uid);
    ics_event.summary(event.summary);
    ics_event.add_property("DTSTAMP", format_utc(&event.created));
    ics_event.add_property("DTSTART", format_utc(&event.start));
    ics_event.add_property("DTEND", format_utc(&event.end));

    for reminder in event.reminders {
        let trigger = Trigger::before_start(chrono::Duration::minutes(reminder.minutes));
        let mut alarm = Alarm::display(reminder.description, trigger);
        alarm.add_property("ACTION", reminder.action);
        ics_event.alarm(alarm);
    }

    let ics_event = ics_event.done();
    cal.push(ics_event);
    let cal = cal.done();

    strip_ics_bloat(&cal.to_string())
}

fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Clean up ICS output from the icalendar crate
/// - Use our PRODID
/// - Remove CALSCALE:GREGORIAN (it's the default)
/// - Remove DTSTAMP and UID inside VALARM sections (not required by RFC 5545)
fn strip_ics_bloat(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());
    let mut in_valarm = false;
    let mut in_prodid = false;

    for line in ics.lines() {
        // The crate's PRODID may be folded across lines.
        if in_prodid && line.starts_with(' ') {
            continue;
        }
        in_prodid = line.starts_with("PRODID:");
        if in_prodid {
            result.push_str("PRODID:");
            result.push_str(PRODUCT_ID);
            result.push_str("\r\n");
            continue;
        }

        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        if line == "BEGIN:VALARM" {
            in_valarm = true;
        } else if line == "END:VALARM" {
            in_valarm = false;
        }

        if in_valarm && (line.starts_with("DTSTAMP:") || line.starts_with("UID:")) {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}
