//! Core pipeline for osminokal.
//!
//! Free energy sessions are fetched from an upstream [`source`], given stable
//! ids by the [`identity`] deriver where the feed has none, and written as
//! reminder events to every configured [`calendar`]. [`sync`] runs one such
//! tick; [`scheduler`] repeats it on an interval until shutdown.

pub mod calendar;
pub mod config;
pub mod error;
pub mod event;
pub mod http;
pub mod ics;
pub mod identity;
pub mod scheduler;
pub mod session;
pub mod source;
pub mod sync;

pub use error::{OsminokalError, OsminokalResult};
pub use session::Session;
