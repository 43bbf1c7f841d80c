//! Overflow-extended clock on top of a free-running hardware counter

use core::cell::Cell;

use critical_section::Mutex;
use embedded_hal::blocking::delay::{DelayMs, DelayUs};
use fugit::MicrosDurationU32;

use crate::config::WRAP_HORIZON;
use crate::hal::HardwareCounter;
use crate::time::units;

/// Default idle hook: spin.
pub fn noop() {}

/// Extends a hardware counter into a 32-bit tick counter.
///
/// A tick is one full overflow of the counter; a count is one increment of it.
/// The clock is meant to live in a `static` so the counter's overflow
/// interrupt can reach [`ClockBase::on_overflow`]:
///
/// ```ignore
/// static CLOCK: ClockBase<Timer0<64>> = ClockBase::new(Timer0::new());
/// ```
pub struct ClockBase<C> {
    counter: C,
    ticks: Mutex<Cell<u32>>,
    idle: fn(),
}

impl<C: HardwareCounter> ClockBase<C> {
    const CYCLES_PER_MICRO: u64 = {
        assert!(
            C::CPU_FREQ_HZ % 1_000_000 == 0 && C::CPU_FREQ_HZ > 0,
            "clock arithmetic needs a whole-MHz CPU frequency"
        );
        (C::CPU_FREQ_HZ / 1_000_000) as u64
    };

    pub const fn new(counter: C) -> Self {
        Self::with_initial_ticks(counter, 0)
    }

    /// Starts the tick counter somewhere other than zero, mostly to exercise
    /// wraparound.
    pub const fn with_initial_ticks(counter: C, ticks: u32) -> Self {
        Self {
            counter,
            ticks: Mutex::new(Cell::new(ticks)),
            idle: noop,
        }
    }

    /// Replaces the hook [`ClockBase::delay`] calls while it waits, e.g. to
    /// sleep or kick a watchdog.
    pub const fn with_idle(mut self, idle: fn()) -> Self {
        self.idle = idle;
        self
    }

    /// Enables the counter's overflow interrupt; ticks only advance afterwards.
    pub fn start(&self) {
        self.counter.enable_overflow_interrupt();
        log_debug!(
            "clock started: {} bit counter, prescaler {}",
            C::WIDTH_BITS,
            C::PRESCALER.ratio()
        );
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }

    /// Overflow interrupt body. On AVR the handler runs with interrupts
    /// disabled, so the critical section costs nothing extra there.
    #[inline]
    pub fn on_overflow(&self) {
        critical_section::with(|cs| {
            let ticks = self.ticks.borrow(cs);
            ticks.set(ticks.get().wrapping_add(1));
        });
    }

    /// Counter overflows since start, wrapping at 2^32.
    pub fn ticks(&self) -> u32 {
        critical_section::with(|cs| self.ticks.borrow(cs).get())
    }

    /// `(ticks << width) | counter`, wrapping at 2^32.
    ///
    /// If the counter wraps between the hardware overflow and the overflow
    /// interrupt running, this returns a fresh raw value paired with the old
    /// tick count, i.e. up to one tick early. The error is bounded by the
    /// latency of the overflow interrupt; [`ClockBase::counts_compensated`]
    /// narrows it using the pending-overflow flag.
    pub fn counts(&self) -> u32 {
        critical_section::with(|cs| {
            let ticks = self.ticks.borrow(cs).get();
            let raw: u32 = self.counter.value().into();
            (ticks << C::WIDTH_BITS) | raw
        })
    }

    /// Like [`ClockBase::counts`] but counts a pending, not yet serviced
    /// overflow when the raw value has already wrapped.
    pub fn counts_compensated(&self) -> u32 {
        critical_section::with(|cs| {
            let mut ticks = self.ticks.borrow(cs).get();
            let raw: u32 = self.counter.value().into();
            let top = (1u32 << C::WIDTH_BITS) - 1;
            if self.counter.overflow_pending() && raw < top {
                ticks = ticks.wrapping_add(1);
            }
            (ticks << C::WIDTH_BITS) | raw
        })
    }

    /// Elapsed microseconds at tick resolution.
    pub fn micros(&self) -> u64 {
        let shift = C::PRESCALER.power_of_two() + C::WIDTH_BITS;
        ((self.ticks() as u64) << shift) / Self::CYCLES_PER_MICRO
    }

    /// Elapsed milliseconds at tick resolution.
    pub fn millis(&self) -> u64 {
        self.micros() / 1_000
    }

    /// Busy-waits `ticks` overflows, calling the idle hook in between.
    pub fn delay_ticks(&self, ticks: u32) {
        self.delay_ticks_with(ticks, self.idle);
    }

    /// Busy-waits `ticks` overflows, calling `idle` in between. The tick counter
    /// may wrap once during the wait.
    pub fn delay_ticks_with(&self, ticks: u32, mut idle: impl FnMut()) {
        let start = self.ticks();
        while self.ticks().wrapping_sub(start) < ticks {
            idle();
        }
    }

    /// Busy-waits `counts` counter increments, calling `idle` in between.
    ///
    /// Reads are compensated for a pending overflow; a plain read taken before
    /// the overflow interrupt runs would land behind `start` and end the wait.
    pub fn delay_counts_with(&self, counts: u32, mut idle: impl FnMut()) {
        let start = self.counts_compensated();
        while self.counts_compensated().wrapping_sub(start) < counts {
            idle();
        }
    }

    /// Busy-waits for `duration`. Short waits run on counts, waits past the
    /// count wraparound horizon on ticks.
    pub fn delay(&self, duration: MicrosDurationU32) {
        self.delay_with(duration, self.idle);
    }

    pub fn delay_with(&self, duration: MicrosDurationU32, idle: impl FnMut()) {
        let counts = units::counts_for::<C>(duration).value();
        if counts < WRAP_HORIZON {
            self.delay_counts_with(counts as u32, idle);
        } else {
            let ticks = units::ticks_for::<C>(duration);
            self.delay_ticks_with(ticks.min(u32::MAX as u64) as u32, idle);
        }
    }

    /// Busy-waits `ms` milliseconds. Waits longer than a `u32` of microseconds
    /// are split into consecutive delays.
    pub fn delay_millis_with(&self, ms: u32, mut idle: impl FnMut()) {
        const MAX_CHUNK_MS: u32 = u32::MAX / 1_000;
        let mut remaining = ms;
        while remaining > 0 {
            let chunk = remaining.min(MAX_CHUNK_MS);
            self.delay_with(MicrosDurationU32::micros(chunk * 1_000), &mut idle);
            remaining -= chunk;
        }
    }
}

impl<C: HardwareCounter> DelayUs<u32> for ClockBase<C> {
    fn delay_us(&mut self, us: u32) {
        self.delay(MicrosDurationU32::micros(us));
    }
}

impl<C: HardwareCounter> DelayMs<u32> for ClockBase<C> {
    fn delay_ms(&mut self, ms: u32) {
        self.delay_millis_with(ms, self.idle);
    }
}
