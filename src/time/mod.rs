//! Clock and scheduling built on a hardware counter
pub mod clock;
pub mod schedule;
pub mod units;

pub use clock::ClockBase;
pub use schedule::{has_reached, Deadline, Periodic, Resolution, Span, VariableDeadline};
pub use units::{counts_on, micros, millis, overflows_counts, secs, ticks_on, Counts};
