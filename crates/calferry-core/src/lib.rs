//! Core types: events, times, legacy timezone resolution, tracing setup

pub mod event;
pub mod time;
pub mod tracing;
pub mod tz;

pub use event::{RawAttendee, RawEvent, ResponseStatus};
pub use time::{DateWindow, EventTime};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
pub use tz::{TimezoneMap, TimezoneUnresolved};
