//! Hardware seams the timing core is built on
//!
//! The core never touches registers itself. A platform supplies a
//! [`HardwareCounter`] for the clock and a [`Comparator`] for the pulse
//! transmitter; `hal::timer` binds both to the ATmega328P timers.

#[cfg(target_arch = "avr")]
pub mod timer;

/// Clock-select divisors shared by the 8- and 16-bit AVR timers.
///
/// The discriminant is the CSn2:0 bit pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prescaler {
    Direct = 1,
    Div8 = 2,
    Div64 = 3,
    Div256 = 4,
    Div1024 = 5,
}

impl Prescaler {
    /// Maps a divisor to its prescaler. Panics (at compile time in const
    /// contexts) for ratios the timers do not support.
    pub const fn from_ratio(ratio: u16) -> Self {
        match ratio {
            1 => Prescaler::Direct,
            8 => Prescaler::Div8,
            64 => Prescaler::Div64,
            256 => Prescaler::Div256,
            1024 => Prescaler::Div1024,
            _ => panic!("prescaler must be one of 1, 8, 64, 256, 1024"),
        }
    }

    /// log2 of the divisor
    pub const fn power_of_two(self) -> u32 {
        match self {
            Prescaler::Direct => 0,
            Prescaler::Div8 => 3,
            Prescaler::Div64 => 6,
            Prescaler::Div256 => 8,
            Prescaler::Div1024 => 10,
        }
    }

    pub const fn ratio(self) -> u16 {
        1 << self.power_of_two()
    }

    /// CSn2:0 clock-select bits
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// A free-running counter whose width and prescaler are fixed at compile time.
///
/// Methods take `&self` so the counter can live inside a `static` clock that the
/// overflow interrupt also reaches.
pub trait HardwareCounter {
    /// Raw register value, `u8` or `u16`
    type Value: Copy + Into<u32>;

    /// Counter width; the counter overflows every `2^WIDTH_BITS` counts
    const WIDTH_BITS: u32;

    const PRESCALER: Prescaler;

    const CPU_FREQ_HZ: u32 = crate::config::CPU_FREQ_HZ;

    fn value(&self) -> Self::Value;

    fn enable_overflow_interrupt(&self);

    /// True when the counter has wrapped but the overflow interrupt has not run yet.
    fn overflow_pending(&self) -> bool;
}

/// An output-compare unit that raises an interrupt when its counter reaches the
/// armed value.
pub trait Comparator {
    /// The counter the comparator matches against; its prescaler converts
    /// durations into counts.
    type Counter: HardwareCounter;

    /// Arms a match `counts` counts after the counter's current value.
    fn arm_from_now(&mut self, counts: u16);

    /// Arms a match `counts` counts after the previous match, so edges do not
    /// drift by the interrupt latency.
    fn arm_from_last(&mut self, counts: u16);

    /// Stops raising match interrupts.
    fn disarm(&mut self);
}
