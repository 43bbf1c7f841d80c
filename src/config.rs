//! Configuration constants for the timing core

/// CPU frequency in Hz, taken from `F_CPU` at build time
pub const CPU_FREQ_HZ: u32 = parse_hz(env!("MCU_FREQ_HZ"));

/// Default number of pulses a transmitter can hold before `send` starts failing
pub const PULSE_QUEUE_CAPACITY: usize = 16;

/// Absolute-time targets must stay closer than this to `now`, or the signed
/// wraparound comparison can no longer tell past from future.
pub const WRAP_HORIZON: u64 = 1 << 31;

const fn parse_hz(digits: &str) -> u32 {
    let bytes = digits.as_bytes();
    assert!(!bytes.is_empty(), "MCU_FREQ_HZ is empty");

    let mut hz: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let digit = bytes[i];
        assert!(digit.is_ascii_digit(), "MCU_FREQ_HZ must be decimal");
        hz = hz * 10 + (digit - b'0') as u32;
        i += 1;
    }
    hz
}
