//! ATmega328P bindings: Timer0/Timer1 as clock counters, Timer1 channel A as
//! the pulse comparator.
//!
//! Register setup is limited to what the core needs: normal counting mode and
//! the clock-select bits. Interrupt vectors stay with the application:
//!
//! ```ignore
//! static CLOCK: ClockBase<Timer0<64>> = ClockBase::new(Timer0::new());
//!
//! #[avr_device::interrupt(atmega328p)]
//! fn TIMER0_OVF() {
//!     CLOCK.on_overflow();
//! }
//! ```

use avr_device::atmega328p::{TC0, TC1};

use super::{Comparator, HardwareCounter, Prescaler};

const TOIE: u8 = 1 << 0;
const TOV: u8 = 1 << 0;
const OCIE_A: u8 = 1 << 1;
const OCF_A: u8 = 1 << 1;

/// 8-bit Timer0 running with prescaler `DIV`
pub struct Timer0<const DIV: u16>;

impl<const DIV: u16> Timer0<DIV> {
    pub const fn new() -> Self {
        Self
    }

    fn regs(&self) -> &avr_device::atmega328p::tc0::RegisterBlock {
        unsafe { &*TC0::ptr() }
    }

    /// Normal mode, counter cleared, clock source selected from `DIV`
    pub fn start(&self) {
        let tc = self.regs();
        tc.tccr0a.write(|w| unsafe { w.bits(0) });
        tc.tcnt0.write(|w| unsafe { w.bits(0) });
        tc.tccr0b
            .write(|w| unsafe { w.bits(<Self as HardwareCounter>::PRESCALER.bits()) });
    }

    pub fn stop(&self) {
        self.regs()
            .tccr0b
            .modify(|r, w| unsafe { w.bits(r.bits() & !0x07) });
    }
}

impl<const DIV: u16> Default for Timer0<DIV> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const DIV: u16> HardwareCounter for Timer0<DIV> {
    type Value = u8;
    const WIDTH_BITS: u32 = 8;
    const PRESCALER: Prescaler = Prescaler::from_ratio(DIV);

    fn value(&self) -> u8 {
        self.regs().tcnt0.read().bits()
    }

    fn enable_overflow_interrupt(&self) {
        self.regs()
            .timsk0
            .modify(|r, w| unsafe { w.bits(r.bits() | TOIE) });
    }

    fn overflow_pending(&self) -> bool {
        self.regs().tifr0.read().bits() & TOV != 0
    }
}

/// 16-bit Timer1 running with prescaler `DIV`
pub struct Timer1<const DIV: u16>;

impl<const DIV: u16> Timer1<DIV> {
    pub const fn new() -> Self {
        Self
    }

    fn regs(&self) -> &avr_device::atmega328p::tc1::RegisterBlock {
        unsafe { &*TC1::ptr() }
    }

    pub fn start(&self) {
        let tc = self.regs();
        tc.tccr1a.write(|w| unsafe { w.bits(0) });
        tc.tcnt1.write(|w| unsafe { w.bits(0) });
        tc.tccr1b
            .write(|w| unsafe { w.bits(<Self as HardwareCounter>::PRESCALER.bits()) });
    }

    pub fn stop(&self) {
        self.regs()
            .tccr1b
            .modify(|r, w| unsafe { w.bits(r.bits() & !0x07) });
    }

    /// Output-compare channel A of this timer
    pub const fn channel_a(self) -> Timer1CompareA<DIV> {
        Timer1CompareA { timer: self }
    }
}

impl<const DIV: u16> Default for Timer1<DIV> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const DIV: u16> HardwareCounter for Timer1<DIV> {
    type Value = u16;
    const WIDTH_BITS: u32 = 16;
    const PRESCALER: Prescaler = Prescaler::from_ratio(DIV);

    fn value(&self) -> u16 {
        self.regs().tcnt1.read().bits()
    }

    fn enable_overflow_interrupt(&self) {
        self.regs()
            .timsk1
            .modify(|r, w| unsafe { w.bits(r.bits() | TOIE) });
    }

    fn overflow_pending(&self) -> bool {
        self.regs().tifr1.read().bits() & TOV != 0
    }
}

/// Timer1 compare channel A. The match interrupt is `TIMER1_COMPA`.
pub struct Timer1CompareA<const DIV: u16> {
    timer: Timer1<DIV>,
}

impl<const DIV: u16> Comparator for Timer1CompareA<DIV> {
    type Counter = Timer1<DIV>;

    fn arm_from_now(&mut self, counts: u16) {
        let tc = self.timer.regs();
        let at = tc.tcnt1.read().bits().wrapping_add(counts);
        tc.ocr1a.write(|w| unsafe { w.bits(at) });
        // stale match flag would fire immediately; writing one clears it
        tc.tifr1.write(|w| unsafe { w.bits(OCF_A) });
        tc.timsk1.modify(|r, w| unsafe { w.bits(r.bits() | OCIE_A) });
    }

    fn arm_from_last(&mut self, counts: u16) {
        let tc = self.timer.regs();
        let at = tc.ocr1a.read().bits().wrapping_add(counts);
        tc.ocr1a.write(|w| unsafe { w.bits(at) });
    }

    fn disarm(&mut self) {
        self.timer
            .regs()
            .timsk1
            .modify(|r, w| unsafe { w.bits(r.bits() & !OCIE_A) });
    }
}
