//! ICS generation for materialized sessions.
//!
//! Writes VCALENDAR objects according to RFC 5545.

mod generate;

pub use generate::{PRODUCT_ID, generate_ics};
