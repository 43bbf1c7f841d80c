//! Duration to counter-unit arithmetic
//!
//! Everything here is `const fn`; used in a const context the division happens
//! at compile time. Compile-time durations are plain microsecond values built
//! with [`secs`], [`millis`] and [`micros`] so they can be passed as const
//! generic arguments.

use fugit::MicrosDurationU32;

use crate::hal::HardwareCounter;

pub const fn secs(n: u64) -> u64 {
    n * 1_000_000
}

pub const fn millis(n: u64) -> u64 {
    n * 1_000
}

pub const fn micros(n: u64) -> u64 {
    n
}

/// Whole counts of a specific counter, possibly wider than 32 bits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Counts(u64);

impl Counts {
    pub const fn value(self) -> u64 {
        self.0
    }

    /// False when the duration lies beyond the 32-bit count space and must be
    /// measured in ticks instead.
    pub const fn fits_u32(self) -> bool {
        self.0 <= u32::MAX as u64
    }

    pub const fn as_u32(self) -> Option<u32> {
        if self.fits_u32() {
            Some(self.0 as u32)
        } else {
            None
        }
    }
}

/// Counts of `C` in `micros` microseconds, rounded to nearest.
pub const fn counts_on<C: HardwareCounter>(micros: u64) -> Counts {
    Counts(scale(micros, C::CPU_FREQ_HZ, C::PRESCALER.power_of_two()))
}

/// Overflow ticks of `C` in `micros` microseconds, rounded to nearest.
pub const fn ticks_on<C: HardwareCounter>(micros: u64) -> u64 {
    scale(
        micros,
        C::CPU_FREQ_HZ,
        C::PRESCALER.power_of_two() + C::WIDTH_BITS,
    )
}

/// True when `micros` cannot be expressed in 32-bit counts of `C`.
pub const fn overflows_counts<C: HardwareCounter>(micros: u64) -> bool {
    !counts_on::<C>(micros).fits_u32()
}

/// Run-time variant of [`counts_on`]
pub fn counts_for<C: HardwareCounter>(duration: MicrosDurationU32) -> Counts {
    counts_on::<C>(duration.to_micros() as u64)
}

/// Run-time variant of [`ticks_on`]
pub fn ticks_for<C: HardwareCounter>(duration: MicrosDurationU32) -> u64 {
    ticks_on::<C>(duration.to_micros() as u64)
}

// micros * hz / (10^6 * 2^shift), half rounding up
const fn scale(micros: u64, hz: u32, shift: u32) -> u64 {
    let den = 1_000_000u64 << shift;
    match micros.checked_mul(hz as u64) {
        Some(num) => num / den + ((num % den) * 2 >= den) as u64,
        None => {
            let num = micros as u128 * hz as u128;
            let den = den as u128;
            let rounded = num / den + ((num % den) * 2 >= den) as u128;
            if rounded > u64::MAX as u128 {
                u64::MAX
            } else {
                rounded as u64
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::Prescaler;

    struct Uno8<const DIV: u16>;

    impl<const DIV: u16> HardwareCounter for Uno8<DIV> {
        type Value = u8;
        const WIDTH_BITS: u32 = 8;
        const PRESCALER: Prescaler = Prescaler::from_ratio(DIV);
        const CPU_FREQ_HZ: u32 = 16_000_000;

        fn value(&self) -> u8 {
            0
        }
        fn enable_overflow_interrupt(&self) {}
        fn overflow_pending(&self) -> bool {
            false
        }
    }

    struct Uno16;

    impl HardwareCounter for Uno16 {
        type Value = u16;
        const WIDTH_BITS: u32 = 16;
        const PRESCALER: Prescaler = Prescaler::Div8;
        const CPU_FREQ_HZ: u32 = 16_000_000;

        fn value(&self) -> u16 {
            0
        }
        fn enable_overflow_interrupt(&self) {}
        fn overflow_pending(&self) -> bool {
            false
        }
    }

    #[test]
    fn known_count_table() {
        assert_eq!(counts_on::<Uno8<64>>(millis(1)).value(), 250);
        assert_eq!(counts_on::<Uno8<64>>(micros(4)).value(), 1);
        assert_eq!(counts_on::<Uno8<8>>(micros(80)).value(), 160);
        assert_eq!(counts_on::<Uno8<1>>(micros(1)).value(), 16);
        assert_eq!(counts_on::<Uno8<1024>>(secs(1)).value(), 15_625);
        assert_eq!(counts_on::<Uno16>(millis(18)).value(), 36_000);
    }

    #[test]
    fn known_tick_table() {
        // 256 counts of 4us each
        assert_eq!(ticks_on::<Uno8<64>>(micros(1024)), 1);
        assert_eq!(ticks_on::<Uno8<64>>(secs(1)), 977);
        assert_eq!(ticks_on::<Uno16>(secs(1)), 31);
    }

    #[test]
    fn sub_count_durations_round_to_nearest() {
        // one count is 4us
        assert_eq!(counts_on::<Uno8<64>>(micros(1)).value(), 0);
        assert_eq!(counts_on::<Uno8<64>>(micros(2)).value(), 1);
        assert_eq!(counts_on::<Uno8<64>>(micros(5)).value(), 1);
        assert_eq!(counts_on::<Uno8<64>>(micros(6)).value(), 2);
    }

    #[test]
    fn overflow_flagged_past_32_bit_horizon() {
        // 2^32 counts at 4us is a little over 4.7 hours
        assert!(!overflows_counts::<Uno8<64>>(secs(60 * 60)));
        assert!(overflows_counts::<Uno8<64>>(secs(5 * 60 * 60)));
        assert_eq!(counts_on::<Uno8<64>>(secs(5 * 60 * 60)).as_u32(), None);
        assert!(overflows_counts::<Uno8<1>>(secs(300)));
    }

    #[test]
    fn huge_durations_saturate_instead_of_wrapping() {
        let counts = counts_on::<Uno8<1>>(u64::MAX);
        assert_eq!(counts.value(), u64::MAX);
        assert!(!counts.fits_u32());
    }

    #[test]
    fn runtime_conversion_matches_const() {
        let d = MicrosDurationU32::millis(18);
        assert_eq!(counts_for::<Uno16>(d), counts_on::<Uno16>(millis(18)));
        assert_eq!(ticks_for::<Uno8<64>>(MicrosDurationU32::secs(1)), 977);
    }

    #[test]
    fn evaluates_in_const_context() {
        const ONE_MS: Counts = counts_on::<Uno8<64>>(millis(1));
        assert_eq!(ONE_MS.as_u32(), Some(250));
    }
}
