//! Timing and pulse generation for AVR microcontrollers
//!
//! - [`time`]: a wraparound-safe clock over a hardware counter, with periodic
//!   timers and deadlines whose resolution is picked at compile time
//! - [`serial`]: interrupt-driven transmission of queued output pulses
//! - [`hal`]: the counter and comparator seams, and the ATmega328P binding
//!
//! ```ignore
//! static CLOCK: ClockBase<Timer0<64>> = ClockBase::new(Timer0::new());
//!
//! #[avr_device::interrupt(atmega328p)]
//! fn TIMER0_OVF() {
//!     CLOCK.on_overflow();
//! }
//!
//! let mut blink = Periodic::<_, { millis(500) }>::new(&CLOCK);
//! loop {
//!     if blink.is_now() {
//!         led.toggle();
//!     }
//! }
//! ```
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod logger;

pub mod config;
pub mod error;
pub mod hal;
pub mod serial;
pub mod time;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{Result, TimingError};
pub use hal::{Comparator, HardwareCounter, Prescaler};
pub use serial::{Pulse, PulseQueue, PulseTx, SimplePulseTx};
pub use time::{ClockBase, Deadline, Periodic, VariableDeadline};
