//! Error types for run-time timing conversions
//!
//! Compile-time durations are checked by const evaluation and never produce these;
//! they only come back from the `*_for` / `reset_after` family that accept
//! run-time durations.

use core::fmt;

use ufmt::derive::uDebug;

/// Result type for run-time timing conversions
pub type Result<T> = core::result::Result<T, TimingError>;

/// Reasons a run-time duration cannot be used
#[derive(Debug, uDebug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimingError {
    /// Duration rounds to zero counts, which is the empty-pulse sentinel
    ZeroDuration,
    /// Duration does not fit the 16-bit count of a single pulse
    ExceedsPulseRange,
    /// Duration is 2^31 counts or more, past the wraparound horizon
    ExceedsWrapHorizon,
}

impl fmt::Display for TimingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingError::ZeroDuration => write!(f, "duration rounds to zero counts"),
            TimingError::ExceedsPulseRange => write!(f, "duration exceeds a 16-bit pulse"),
            TimingError::ExceedsWrapHorizon => {
                write!(f, "duration exceeds the 2^31 count wraparound horizon")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_limit() {
        assert_eq!(
            std::format!("{}", TimingError::ExceedsWrapHorizon),
            "duration exceeds the 2^31 count wraparound horizon"
        );
        assert_eq!(
            std::format!("{}", TimingError::ZeroDuration),
            "duration rounds to zero counts"
        );
    }
}
