//! Pulse trains on an output pin
//!
//! A [`Pulse`] is one level held for a number of counter counts. Pulses wait in
//! a [`PulseQueue`] until the [`PulseTx`] engine, driven by comparator match
//! interrupts, puts them on the output back to back.
pub mod pulse;
pub mod pulse_tx;
pub mod queue;

pub use pulse::Pulse;
pub use pulse_tx::{
    CallbackSink, OutputSink, PinSink, PulseSource, PulseTx, QueuedSource, SimplePulseTx, TxState,
};
pub use queue::PulseQueue;
