//! Wraparound-safe "has this moment passed" checks
//!
//! All primitives here compare absolute 32-bit times with
//! [`has_reached`]: a target counts as reached when `now - target`, read as a
//! signed 32-bit delta, is not negative. That stays correct across the 2^32
//! wrap as long as targets are less than 2^31 away, which every constructor
//! enforces.
//!
//! Fixed delays are type parameters in microseconds:
//!
//! ```ignore
//! let mut blink = Periodic::<_, { millis(500) }>::new(&CLOCK);
//! let timeout = Deadline::<_, { secs(2) }>::new(&CLOCK);
//! ```

use core::cell::Cell;
use core::convert::Infallible;
use core::marker::PhantomData;

use critical_section::Mutex;
use fugit::MicrosDurationU32;

use crate::config::WRAP_HORIZON;
use crate::error::{Result, TimingError};
use crate::hal::HardwareCounter;
use crate::time::units;
use crate::time::ClockBase;

/// True once `now` is at or past `target`, modulo 2^32.
#[inline]
pub const fn has_reached(now: u32, target: u32) -> bool {
    now.wrapping_sub(target) as i32 >= 0
}

/// Which clock reading a delay is measured against
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// `ClockBase::counts`, full counter resolution
    Counts,
    /// `ClockBase::ticks`, for delays past the count horizon
    Ticks,
}

/// A delay together with the resolution it is measured in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub resolution: Resolution,
    pub delay: u32,
}

impl Span {
    /// Picks counts when `micros` stays below 2^31 counts of `C`, ticks
    /// otherwise. Fails const evaluation if even ticks are too coarse.
    pub const fn of<C: HardwareCounter>(micros: u64) -> Span {
        let counts = units::counts_on::<C>(micros).value();
        if counts < WRAP_HORIZON {
            return Span {
                resolution: Resolution::Counts,
                delay: counts as u32,
            };
        }
        let ticks = units::ticks_on::<C>(micros);
        assert!(
            ticks < WRAP_HORIZON,
            "delay must stay below 2^31 ticks to survive wraparound"
        );
        Span {
            resolution: Resolution::Ticks,
            delay: ticks as u32,
        }
    }

    /// Like [`Span::of`] but refuses to fall back to ticks.
    pub const fn counts_of<C: HardwareCounter>(micros: u64) -> Span {
        let counts = units::counts_on::<C>(micros).value();
        assert!(
            counts < WRAP_HORIZON,
            "delay must stay below 2^31 counts to survive wraparound"
        );
        Span {
            resolution: Resolution::Counts,
            delay: counts as u32,
        }
    }

    #[inline]
    fn now<C: HardwareCounter>(self, clock: &ClockBase<C>) -> u32 {
        match self.resolution {
            Resolution::Counts => clock.counts(),
            Resolution::Ticks => clock.ticks(),
        }
    }
}

/// Recurring check that fires once every `MICROS` microseconds.
///
/// Each firing moves the target on by exactly one period, so a late poll does
/// not shift the phase; a poll more than one period late fires on consecutive
/// polls until it has caught up.
pub struct Periodic<'a, C, const MICROS: u64> {
    clock: &'a ClockBase<C>,
    next: u32,
}

impl<'a, C: HardwareCounter, const MICROS: u64> Periodic<'a, C, MICROS> {
    pub const SPAN: Span = Span::of::<C>(MICROS);

    pub fn new(clock: &'a ClockBase<C>) -> Self {
        let next = Self::SPAN.now(clock).wrapping_add(Self::SPAN.delay);
        Self { clock, next }
    }

    pub fn is_now(&mut self) -> bool {
        if has_reached(Self::SPAN.now(self.clock), self.next) {
            self.next = self.next.wrapping_add(Self::SPAN.delay);
            true
        } else {
            false
        }
    }

    /// `nb` flavour of [`Periodic::is_now`], for `nb::block!`.
    pub fn wait(&mut self) -> nb::Result<(), Infallible> {
        if self.is_now() {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

#[derive(Clone, Copy)]
struct Target {
    next: u32,
    elapsed: bool,
}

/// Target shared between normal code and interrupt handlers. Arming and
/// polling each happen inside one critical section, so a reader never sees a
/// new `next` paired with a stale `elapsed`.
struct SharedTarget {
    target: Mutex<Cell<Target>>,
}

impl SharedTarget {
    const fn disarmed() -> Self {
        Self {
            target: Mutex::new(Cell::new(Target {
                next: 0,
                elapsed: true,
            })),
        }
    }

    fn arm(&self, read_now: impl FnOnce() -> u32, delay: u32) {
        critical_section::with(|cs| {
            let next = read_now().wrapping_add(delay);
            self.target.borrow(cs).set(Target {
                next,
                elapsed: false,
            });
        });
    }

    fn poll(&self, read_now: impl FnOnce() -> u32) -> bool {
        critical_section::with(|cs| {
            let cell = self.target.borrow(cs);
            let target = cell.get();
            if target.elapsed || !has_reached(read_now(), target.next) {
                return false;
            }
            cell.set(Target {
                elapsed: true,
                ..target
            });
            true
        })
    }

    fn elapsed(&self) -> bool {
        critical_section::with(|cs| self.target.borrow(cs).get().elapsed)
    }
}

/// One-shot check, armed `MICROS` microseconds after construction or reset.
pub struct Deadline<'a, C, const MICROS: u64> {
    clock: &'a ClockBase<C>,
    shared: SharedTarget,
}

impl<'a, C: HardwareCounter, const MICROS: u64> Deadline<'a, C, MICROS> {
    pub const SPAN: Span = Span::of::<C>(MICROS);

    pub fn new(clock: &'a ClockBase<C>) -> Self {
        let deadline = Self {
            clock,
            shared: SharedTarget::disarmed(),
        };
        deadline.reset();
        deadline
    }

    /// True exactly once, on the first poll at or after the deadline.
    pub fn is_now(&self) -> bool {
        self.shared.poll(|| Self::SPAN.now(self.clock))
    }

    /// Whether the deadline has fired since the last reset
    pub fn is_elapsed(&self) -> bool {
        self.shared.elapsed()
    }

    /// Re-arms `MICROS` microseconds from now.
    pub fn reset(&self) {
        self.shared.arm(|| Self::SPAN.now(self.clock), Self::SPAN.delay);
    }

    /// `nb` flavour of [`Deadline::is_now`]
    pub fn wait(&self) -> nb::Result<(), Infallible> {
        if self.is_now() {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

struct CountSpan<C, const MICROS: u64>(PhantomData<C>);

impl<C: HardwareCounter, const MICROS: u64> CountSpan<C, MICROS> {
    const SPAN: Span = Span::counts_of::<C>(MICROS);
}

/// One-shot check on count resolution whose delay is chosen at each reset.
/// Starts disarmed: it reports elapsed and never fires until reset.
pub struct VariableDeadline<'a, C> {
    clock: &'a ClockBase<C>,
    shared: SharedTarget,
}

impl<'a, C: HardwareCounter> VariableDeadline<'a, C> {
    pub const fn new(clock: &'a ClockBase<C>) -> Self {
        Self {
            clock,
            shared: SharedTarget::disarmed(),
        }
    }

    pub fn is_now(&self) -> bool {
        self.shared.poll(|| self.clock.counts())
    }

    pub fn is_elapsed(&self) -> bool {
        self.shared.elapsed()
    }

    /// Arms `MICROS` microseconds from now; too long a delay fails to compile.
    pub fn reset<const MICROS: u64>(&self) {
        self.reset_counts(CountSpan::<C, MICROS>::SPAN.delay);
    }

    /// Arms from a run-time duration.
    pub fn reset_after(&self, duration: MicrosDurationU32) -> Result<()> {
        let counts = units::counts_for::<C>(duration).value();
        if counts >= WRAP_HORIZON {
            return Err(TimingError::ExceedsWrapHorizon);
        }
        self.reset_counts(counts as u32);
        Ok(())
    }

    fn reset_counts(&self, delay: u32) {
        self.shared.arm(|| self.clock.counts(), delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCounter;
    use crate::time::units::{micros, millis, secs};

    type Clock = ClockBase<MockCounter<8>>;

    #[test]
    fn has_reached_across_wraparound() {
        assert!(has_reached(10, 10));
        assert!(has_reached(11, 10));
        assert!(!has_reached(9, 10));
        // target just past the wrap, now just before it
        assert!(!has_reached(u32::MAX - 5, 3));
        assert!(has_reached(3, u32::MAX - 5));
        assert!(has_reached(0, u32::MAX));
    }

    #[test]
    fn span_chooses_resolution() {
        // 4us counts, 1024us ticks
        assert_eq!(
            Span::of::<MockCounter<8>>(millis(1)),
            Span {
                resolution: Resolution::Counts,
                delay: 250
            }
        );
        // 3 hours is 2.7e9 counts, past 2^31
        assert_eq!(
            Span::of::<MockCounter<8>>(secs(3 * 60 * 60)),
            Span {
                resolution: Resolution::Ticks,
                delay: 10_546_875
            }
        );
    }

    #[test]
    fn periodic_fires_once_per_period() {
        let clock = Clock::new(MockCounter::new());
        let mut periodic = Periodic::<_, { millis(1) }>::new(&clock);

        clock.advance(249);
        assert!(!periodic.is_now());
        clock.advance(1);
        assert!(periodic.is_now());
        assert!(!periodic.is_now());

        clock.advance(250);
        assert!(periodic.is_now());
        assert!(!periodic.is_now());
    }

    #[test]
    fn periodic_keeps_phase_when_polled_late() {
        let clock = Clock::new(MockCounter::new());
        let mut periodic = Periodic::<_, { millis(1) }>::new(&clock);

        // polled 100 counts late
        clock.advance(350);
        assert!(periodic.is_now());
        // next target is 500, not 600
        clock.advance(149);
        assert!(!periodic.is_now());
        clock.advance(1);
        assert!(periodic.is_now());
    }

    #[test]
    fn periodic_catches_up_after_missed_periods() {
        let clock = Clock::new(MockCounter::new());
        let mut periodic = Periodic::<_, { millis(1) }>::new(&clock);

        clock.advance(3 * 250);
        assert!(periodic.is_now());
        assert!(periodic.is_now());
        assert!(periodic.is_now());
        assert!(!periodic.is_now());
    }

    #[test]
    fn periodic_on_ticks_for_long_periods() {
        let clock = Clock::new(MockCounter::new());
        let mut periodic = Periodic::<_, { secs(3 * 60 * 60) }>::new(&clock);
        assert_eq!(
            Periodic::<MockCounter<8>, { secs(3 * 60 * 60) }>::SPAN.resolution,
            Resolution::Ticks
        );

        for _ in 0..10_546_874u32 / 65_536 {
            clock.advance(65_536 * 256);
        }
        assert!(!periodic.is_now());
        clock.advance(2 * 65_536 * 256);
        assert!(periodic.is_now());
    }

    #[test]
    fn periodic_wait_is_nb() {
        let clock = Clock::new(MockCounter::new());
        let mut periodic = Periodic::<_, { micros(40) }>::new(&clock);
        assert_eq!(periodic.wait(), Err(nb::Error::WouldBlock));
        clock.advance(10);
        assert_eq!(periodic.wait(), Ok(()));
    }

    #[test]
    fn deadline_fires_exactly_once_until_reset() {
        let clock = Clock::new(MockCounter::new());
        let deadline = Deadline::<_, { millis(1) }>::new(&clock);

        assert!(!deadline.is_now());
        assert!(!deadline.is_elapsed());

        clock.advance(250);
        assert!(deadline.is_now());
        assert!(deadline.is_elapsed());
        clock.advance(1_000);
        assert!(!deadline.is_now());
        assert!(deadline.is_elapsed());

        deadline.reset();
        assert!(!deadline.is_elapsed());
        clock.advance(249);
        assert!(!deadline.is_now());
        clock.advance(1);
        assert!(deadline.is_now());
    }

    #[test]
    fn deadline_survives_count_wraparound() {
        // counts wrap every 2^24 ticks on an 8-bit counter
        let clock = Clock::with_initial_ticks(MockCounter::new(), (1 << 24) - 1);
        let deadline = Deadline::<_, { millis(2) }>::new(&clock);

        clock.advance(255);
        assert_eq!(clock.counts(), u32::MAX);
        assert!(!deadline.is_now());
        clock.advance(244);
        assert_eq!(clock.counts(), 243);
        assert!(!deadline.is_now());
        clock.advance(1);
        assert!(deadline.is_now());
        assert!(!deadline.is_now());
    }

    #[test]
    fn wraparound_property_holds_for_many_start_points() {
        let starts = [0u32, 1 << 23, (1 << 24) - 2, (1 << 24) - 1, u32::MAX];
        for &start in &starts {
            let clock = Clock::with_initial_ticks(MockCounter::new(), start);
            clock.advance(200);
            let deadline = Deadline::<_, { millis(5) }>::new(&clock);
            let mut fired = 0;
            for step in 1..=1_500u32 {
                clock.advance(1);
                if deadline.is_now() {
                    fired += 1;
                    assert_eq!(step, 1_250, "start {}", start);
                }
            }
            assert_eq!(fired, 1, "start {}", start);
        }
    }

    #[test]
    fn deadline_wait_is_nb() {
        let clock = Clock::new(MockCounter::new());
        let deadline = Deadline::<_, { micros(8) }>::new(&clock);
        assert_eq!(deadline.wait(), Err(nb::Error::WouldBlock));
        clock.advance(2);
        assert_eq!(deadline.wait(), Ok(()));
        assert_eq!(deadline.wait(), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn variable_deadline_starts_disarmed() {
        let clock = Clock::new(MockCounter::new());
        let deadline = VariableDeadline::new(&clock);
        assert!(deadline.is_elapsed());
        clock.advance(10_000);
        assert!(!deadline.is_now());
    }

    #[test]
    fn variable_deadline_takes_new_delay_on_each_reset() {
        let clock = Clock::new(MockCounter::new());
        let deadline = VariableDeadline::new(&clock);

        deadline.reset::<{ micros(80) }>();
        assert!(!deadline.is_elapsed());
        clock.advance(19);
        assert!(!deadline.is_now());
        clock.advance(1);
        assert!(deadline.is_now());

        deadline.reset::<{ millis(18) }>();
        clock.advance(4_499);
        assert!(!deadline.is_now());
        clock.advance(1);
        assert!(deadline.is_now());
    }

    #[test]
    fn variable_deadline_runtime_reset() {
        let clock = Clock::new(MockCounter::new());
        let deadline = VariableDeadline::new(&clock);

        assert_eq!(deadline.reset_after(MicrosDurationU32::micros(120)), Ok(()));
        clock.advance(30);
        assert!(deadline.is_now());

        // 2^31 counts at 4us is about 8590 seconds; u32 micros tops out near 4295
        assert_eq!(deadline.reset_after(MicrosDurationU32::secs(4_000)), Ok(()));
    }

    #[test]
    fn variable_deadline_rejects_delays_past_horizon() {
        let clock = ClockBase::new(FastCounter);
        let deadline = VariableDeadline::new(&clock);
        // 300s at 16 MHz is 4.8e9 counts
        assert_eq!(
            deadline.reset_after(MicrosDurationU32::secs(300)),
            Err(TimingError::ExceedsWrapHorizon)
        );
        assert!(deadline.is_elapsed());
    }

    struct FastCounter;

    impl HardwareCounter for FastCounter {
        type Value = u16;
        const WIDTH_BITS: u32 = 16;
        const PRESCALER: crate::hal::Prescaler = crate::hal::Prescaler::Direct;
        const CPU_FREQ_HZ: u32 = 16_000_000;

        fn value(&self) -> u16 {
            0
        }
        fn enable_overflow_interrupt(&self) {}
        fn overflow_pending(&self) -> bool {
            false
        }
    }
}
