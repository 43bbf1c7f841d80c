//! Interrupt-driven pulse transmitter
//!
//! The transmitter owns a [`Comparator`] and an [`OutputSink`]. Sending a pulse
//! while idle drives its level at once and arms the comparator for its
//! duration; every match interrupt then moves on to the next pulse, and an
//! exhausted source puts the output back to its idle level.
//!
//! `send` and `on_match` both need `&mut`, so the transmitter is shared with
//! its match interrupt through a critical-section mutex:
//!
//! ```ignore
//! static TX: Mutex<RefCell<Option<SimplePulseTx<Timer1CompareA<8>, PinSink<Pin>>>>> =
//!     Mutex::new(RefCell::new(None));
//!
//! #[avr_device::interrupt(atmega328p)]
//! fn TIMER1_COMPA() {
//!     critical_section::with(|cs| {
//!         if let Some(tx) = TX.borrow_ref_mut(cs).as_mut() {
//!             tx.on_match();
//!         }
//!     });
//! }
//! ```

use embedded_hal::digital::v2::OutputPin;
use fugit::MicrosDurationU32;

use super::{Pulse, PulseQueue};
use crate::config::PULSE_QUEUE_CAPACITY;
use crate::error::Result;
use crate::hal::Comparator;

/// Where the transmitter's levels go
pub trait OutputSink {
    fn set_level(&mut self, high: bool);
}

/// Drives a GPIO pin directly.
///
/// `set_level` runs inside the match interrupt and has nowhere to report to,
/// so errors from the pin are discarded for every `P`. Use a pin whose writes
/// cannot fail (AVR port pins are `Infallible`) or wrap a fallible one in a
/// [`CallbackSink`] that handles the error itself.
pub struct PinSink<P> {
    pin: P,
}

impl<P: OutputPin> PinSink<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> OutputSink for PinSink<P> {
    #[inline]
    fn set_level(&mut self, high: bool) {
        let _ = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
    }
}

/// Hands each level to a closure, run from the match interrupt.
pub struct CallbackSink<F> {
    callback: F,
}

impl<F: FnMut(bool)> CallbackSink<F> {
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F: FnMut(bool)> OutputSink for CallbackSink<F> {
    #[inline]
    fn set_level(&mut self, high: bool) {
        (self.callback)(high)
    }
}

/// Supplies pulses to a transmitter, one per comparator match.
pub trait PulseSource {
    /// The next pulse to send; [`Pulse::EMPTY`] when there is none.
    fn next_pulse(&mut self) -> Pulse;

    /// Level the output rests at between transmissions
    fn is_high_on_idle(&self) -> bool;
}

/// [`PulseSource`] backed by a [`PulseQueue`]
pub struct QueuedSource<const N: usize = PULSE_QUEUE_CAPACITY> {
    queue: PulseQueue<N>,
    idle_high: bool,
}

impl<const N: usize> QueuedSource<N> {
    pub const fn new(idle_high: bool) -> Self {
        Self {
            queue: PulseQueue::new(),
            idle_high,
        }
    }

    #[must_use]
    pub fn append(&mut self, pulse: Pulse) -> bool {
        self.queue.write(pulse)
    }

    pub fn queue(&self) -> &PulseQueue<N> {
        &self.queue
    }
}

impl<const N: usize> PulseSource for QueuedSource<N> {
    fn next_pulse(&mut self) -> Pulse {
        self.queue.read().unwrap_or(Pulse::EMPTY)
    }

    fn is_high_on_idle(&self) -> bool {
        self.idle_high
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxState {
    /// Output at the idle level, comparator disarmed
    Idle,
    /// Output following pulses, exactly one match armed
    Transmitting,
}

/// Pulse transmitter over any [`PulseSource`]
pub struct PulseTx<Cmp, S, Src> {
    comparator: Cmp,
    sink: S,
    source: Src,
    state: TxState,
}

/// Transmitter fed from its own queue
pub type SimplePulseTx<Cmp, S, const N: usize = PULSE_QUEUE_CAPACITY> =
    PulseTx<Cmp, S, QueuedSource<N>>;

impl<Cmp: Comparator, S: OutputSink, Src: PulseSource> PulseTx<Cmp, S, Src> {
    /// Takes over `comparator` and `sink`; the output goes to the idle level.
    pub fn with_source(mut comparator: Cmp, mut sink: S, source: Src) -> Self {
        comparator.disarm();
        sink.set_level(source.is_high_on_idle());
        Self {
            comparator,
            sink,
            source,
            state: TxState::Idle,
        }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == TxState::Idle
    }

    /// Starts sending from the source if the transmitter is idle. A no-op
    /// while transmitting, since the match interrupt keeps pulling pulses.
    pub fn start(&mut self) {
        if self.state == TxState::Transmitting {
            return;
        }
        let pulse = self.source.next_pulse();
        if pulse.is_empty() {
            return;
        }
        self.sink.set_level(pulse.is_high());
        self.comparator.arm_from_now(pulse.duration());
        self.state = TxState::Transmitting;
        log_trace!("pulse tx: transmitting");
    }

    /// Comparator match interrupt body.
    pub fn on_match(&mut self) {
        if self.state == TxState::Idle {
            return;
        }
        let pulse = self.source.next_pulse();
        if pulse.is_defined() {
            self.sink.set_level(pulse.is_high());
            self.comparator.arm_from_last(pulse.duration());
        } else {
            self.comparator.disarm();
            self.sink.set_level(self.source.is_high_on_idle());
            self.state = TxState::Idle;
            log_trace!("pulse tx: idle");
        }
    }

    pub fn comparator(&self) -> &Cmp {
        &self.comparator
    }

    pub fn source(&self) -> &Src {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut Src {
        &mut self.source
    }

    /// Gives the hardware back; the comparator is left disarmed.
    pub fn release(mut self) -> (Cmp, S, Src) {
        self.comparator.disarm();
        (self.comparator, self.sink, self.source)
    }
}

impl<Cmp: Comparator, S: OutputSink, const N: usize> PulseTx<Cmp, S, QueuedSource<N>> {
    pub fn new(comparator: Cmp, sink: S, idle_high: bool) -> Self {
        Self::with_source(comparator, sink, QueuedSource::new(idle_high))
    }

    /// Queues `pulse` and starts transmitting if idle. False when the queue is
    /// full; the pulse is dropped. Empty pulses are accepted and ignored.
    #[must_use]
    pub fn send(&mut self, pulse: Pulse) -> bool {
        if !self.source.append(pulse) {
            log_warn!("pulse tx: queue full, dropped {} counts", pulse.duration());
            return false;
        }
        self.start();
        true
    }

    #[must_use]
    pub fn send_high(&mut self, duration: MicrosDurationU32) -> Result<bool> {
        Ok(self.send(Pulse::high_for::<Cmp::Counter>(duration)?))
    }

    #[must_use]
    pub fn send_low(&mut self, duration: MicrosDurationU32) -> Result<bool> {
        Ok(self.send(Pulse::low_for::<Cmp::Counter>(duration)?))
    }

    /// Pulses queued behind the one currently on the output
    pub fn pending(&self) -> usize {
        self.source.queue().len()
    }
}
