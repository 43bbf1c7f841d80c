//! Bounded FIFO between pulse producers and the transmitter

use heapless::Deque;

use super::Pulse;
use crate::config::PULSE_QUEUE_CAPACITY;

/// Fixed-capacity pulse FIFO holding up to `N` pulses.
///
/// Empty pulses are never stored: writing one succeeds without queueing
/// anything, so a read can only return a pulse that is meant to be sent.
pub struct PulseQueue<const N: usize = PULSE_QUEUE_CAPACITY> {
    pulses: Deque<Pulse, N>,
}

impl<const N: usize> PulseQueue<N> {
    pub const fn new() -> Self {
        Self {
            pulses: Deque::new(),
        }
    }

    /// Appends `pulse`; false when the queue is full and the pulse was dropped.
    #[must_use]
    pub fn write(&mut self, pulse: Pulse) -> bool {
        if pulse.is_empty() {
            return true;
        }
        self.pulses.push_back(pulse).is_ok()
    }

    pub fn read(&mut self) -> Option<Pulse> {
        self.pulses.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.pulses.is_full()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for PulseQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
