//! Simulated hardware for host tests
//!
//! `MockCounter` stands in for a timer counter (prescaler 64 at 16 MHz, like
//! Timer0 on an Uno), `MockComparator` for an output-compare unit. Time only
//! moves when a test moves it.

use core::cell::Cell;

use crate::hal::{Comparator, HardwareCounter, Prescaler};
use crate::time::ClockBase;

/// Counter of `BITS` width (at most 16) with a manually driven raw value.
pub struct MockCounter<const BITS: u32 = 8> {
    raw: Cell<u32>,
    auto_advance: u32,
    overflow_flag: Cell<bool>,
    interrupt_enabled: Cell<bool>,
}

impl<const BITS: u32> MockCounter<BITS> {
    const TOP: u32 = {
        assert!(BITS > 0 && BITS <= 16, "mock counters are 1 to 16 bits wide");
        (1 << BITS) - 1
    };

    pub const fn new() -> Self {
        Self {
            raw: Cell::new(0),
            auto_advance: 0,
            overflow_flag: Cell::new(false),
            interrupt_enabled: Cell::new(false),
        }
    }

    /// Moves the counter on by `counts` after every read, like a free-running
    /// timer. Wraps are only flagged, never serviced.
    pub const fn with_auto_advance(mut self, counts: u32) -> Self {
        self.auto_advance = counts;
        self
    }

    /// Moves the raw value on by `counts` and returns how many times it wrapped.
    /// A wrap raises the overflow flag; nothing services it.
    pub fn advance_raw(&self, counts: u32) -> u32 {
        let total = self.raw.get() as u64 + counts as u64;
        let wraps = (total >> BITS) as u32;
        self.raw.set((total as u32) & Self::TOP);
        if wraps > 0 {
            self.overflow_flag.set(true);
        }
        wraps
    }

    pub fn raw(&self) -> u32 {
        self.raw.get()
    }

    pub fn clear_overflow(&self) {
        self.overflow_flag.set(false);
    }

    pub fn overflow_interrupt_enabled(&self) -> bool {
        self.interrupt_enabled.get()
    }
}

impl<const BITS: u32> Default for MockCounter<BITS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const BITS: u32> HardwareCounter for MockCounter<BITS> {
    type Value = u16;
    const WIDTH_BITS: u32 = BITS;
    const PRESCALER: Prescaler = Prescaler::Div64;
    const CPU_FREQ_HZ: u32 = 16_000_000;

    fn value(&self) -> u16 {
        let raw = self.raw.get() as u16;
        if self.auto_advance > 0 {
            self.advance_raw(self.auto_advance);
        }
        raw
    }

    fn enable_overflow_interrupt(&self) {
        self.interrupt_enabled.set(true);
    }

    fn overflow_pending(&self) -> bool {
        self.overflow_flag.get()
    }
}

impl<const BITS: u32> ClockBase<MockCounter<BITS>> {
    /// Lets `counts` counts pass, running the overflow interrupt for every wrap.
    pub fn advance(&self, counts: u32) {
        let wraps = self.counter().advance_raw(counts);
        for _ in 0..wraps {
            self.on_overflow();
        }
        self.counter().clear_overflow();
    }
}

/// Output-compare unit on a simulated 32-bit timeline.
///
/// `now` only changes through [`MockComparator::fire`] or
/// [`MockComparator::set_now`].
#[derive(Debug, Default)]
pub struct MockComparator {
    now: u32,
    target: u32,
    armed: bool,
    arm_count: u32,
}

impl MockComparator {
    pub const fn new() -> Self {
        Self {
            now: 0,
            target: 0,
            armed: false,
            arm_count: 0,
        }
    }

    pub fn now(&self) -> u32 {
        self.now
    }

    /// Simulates time passing without a match, e.g. interrupt latency.
    pub fn set_now(&mut self, now: u32) {
        self.now = now;
    }

    /// Absolute time of the armed match, if any
    pub fn armed_at(&self) -> Option<u32> {
        self.armed.then_some(self.target)
    }

    /// Number of times a match was programmed
    pub fn arm_count(&self) -> u32 {
        self.arm_count
    }

    /// Jumps to the armed match and returns its time. The caller then runs the
    /// match interrupt.
    pub fn fire(&mut self) -> Option<u32> {
        let at = self.armed_at()?;
        self.now = at;
        Some(at)
    }
}

impl Comparator for MockComparator {
    type Counter = MockCounter<16>;

    fn arm_from_now(&mut self, counts: u16) {
        self.target = self.now.wrapping_add(counts as u32);
        self.armed = true;
        self.arm_count += 1;
    }

    fn arm_from_last(&mut self, counts: u16) {
        self.target = self.target.wrapping_add(counts as u32);
        self.armed = true;
        self.arm_count += 1;
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_wraps_at_width() {
        let counter = MockCounter::<8>::new();
        assert_eq!(counter.advance_raw(255), 0);
        assert!(!counter.overflow_pending());
        assert_eq!(counter.advance_raw(2), 1);
        assert_eq!(counter.raw(), 1);
        assert!(counter.overflow_pending());

        let wide = MockCounter::<16>::new();
        assert_eq!(wide.advance_raw(3 * 65_536 + 5), 3);
        assert_eq!(wide.value(), 5);
    }

    #[test]
    fn auto_advance_moves_after_each_read() {
        let counter = MockCounter::<8>::new().with_auto_advance(100);
        assert_eq!(counter.value(), 0);
        assert_eq!(counter.value(), 100);
        assert_eq!(counter.value(), 200);
        assert_eq!(counter.value(), 44);
        assert!(counter.overflow_pending());
    }

    #[test]
    fn clock_advance_services_overflows() {
        let clock = ClockBase::new(MockCounter::<8>::new());
        clock.advance(600);
        assert_eq!(clock.ticks(), 2);
        assert_eq!(clock.counter().raw(), 88);
        assert!(!clock.counter().overflow_pending());
    }

    #[test]
    fn comparator_arms_relative_to_now_or_last_match() {
        let mut comparator = MockComparator::new();
        assert_eq!(comparator.fire(), None);

        comparator.set_now(10);
        comparator.arm_from_now(100);
        assert_eq!(comparator.armed_at(), Some(110));
        assert_eq!(comparator.fire(), Some(110));

        // late interrupt does not shift the next edge
        comparator.set_now(117);
        comparator.arm_from_last(50);
        assert_eq!(comparator.armed_at(), Some(160));

        comparator.disarm();
        assert_eq!(comparator.armed_at(), None);
        assert_eq!(comparator.arm_count(), 2);
    }
}
