//! A single timed output level

use fugit::MicrosDurationU32;
use ufmt::{uDisplay, uWrite, Formatter};

use crate::error::{Result, TimingError};
use crate::hal::HardwareCounter;
use crate::time::units;

/// Output level held for `duration` counts of the transmitting counter.
///
/// A zero duration is the empty pulse, used as the "nothing more to send"
/// marker; it is never put on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ufmt::derive::uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pulse {
    high: bool,
    duration: u16,
}

impl Pulse {
    pub const EMPTY: Pulse = Pulse::new(false, 0);

    pub const fn new(high: bool, duration: u16) -> Self {
        Self { high, duration }
    }

    pub const fn high(duration: u16) -> Self {
        Self::new(true, duration)
    }

    pub const fn low(duration: u16) -> Self {
        Self::new(false, duration)
    }

    pub const fn duration(&self) -> u16 {
        self.duration
    }

    pub const fn is_high(&self) -> bool {
        self.high
    }

    pub const fn is_empty(&self) -> bool {
        self.duration == 0
    }

    pub const fn is_defined(&self) -> bool {
        self.duration != 0
    }

    /// High pulse of `micros` microseconds on counter `C`. Meant for const
    /// contexts, where a zero or over-long duration fails to compile.
    ///
    /// # Panics
    ///
    /// Called at run time, panics when `micros` rounds to zero counts or
    /// exceeds 16 bits of counts. Use [`Pulse::high_for`] for durations only
    /// known at run time.
    pub const fn high_on<C: HardwareCounter>(micros: u64) -> Self {
        Self::new(true, pulse_counts::<C>(micros))
    }

    /// Low counterpart of [`Pulse::high_on`], with the same panics; see
    /// [`Pulse::low_for`] for run-time durations.
    pub const fn low_on<C: HardwareCounter>(micros: u64) -> Self {
        Self::new(false, pulse_counts::<C>(micros))
    }

    /// High pulse from a run-time duration
    pub fn high_for<C: HardwareCounter>(duration: MicrosDurationU32) -> Result<Self> {
        Ok(Self::new(true, checked_pulse_counts::<C>(duration)?))
    }

    pub fn low_for<C: HardwareCounter>(duration: MicrosDurationU32) -> Result<Self> {
        Ok(Self::new(false, checked_pulse_counts::<C>(duration)?))
    }
}

const fn pulse_counts<C: HardwareCounter>(micros: u64) -> u16 {
    let counts = units::counts_on::<C>(micros).value();
    assert!(counts > 0, "pulse duration rounds to zero counts");
    assert!(counts <= u16::MAX as u64, "pulse duration exceeds 16-bit counts");
    counts as u16
}

fn checked_pulse_counts<C: HardwareCounter>(duration: MicrosDurationU32) -> Result<u16> {
    match units::counts_for::<C>(duration).value() {
        0 => Err(TimingError::ZeroDuration),
        counts if counts > u16::MAX as u64 => Err(TimingError::ExceedsPulseRange),
        counts => Ok(counts as u16),
    }
}

/// `H250` for a high pulse of 250 counts, `L50` for a low one
impl uDisplay for Pulse {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> core::result::Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str(if self.high { "H" } else { "L" })?;
        uDisplay::fmt(&self.duration, f)
    }
}
