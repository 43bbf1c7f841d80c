//! Logging macros shared by the timing core
//!
//! - `defmt` feature: forwards to the matching `defmt` macro
//! - Host tests: prints with a level prefix (takes precedence over `defmt`)
//! - Otherwise: the format string is still checked, nothing is emitted
//!
//! Only `{}` placeholders are used so the same call site is valid for both
//! `defmt` and `core::fmt`.

macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(all(feature = "defmt", not(test)))]
        ::defmt::debug!($($arg)*);

        #[cfg(test)]
        std::println!("[DEBUG] {}", format_args!($($arg)*));

        #[cfg(not(any(feature = "defmt", test)))]
        let _ = format_args!($($arg)*);
    }};
}

macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(all(feature = "defmt", not(test)))]
        ::defmt::warn!($($arg)*);

        #[cfg(test)]
        std::println!("[WARN] {}", format_args!($($arg)*));

        #[cfg(not(any(feature = "defmt", test)))]
        let _ = format_args!($($arg)*);
    }};
}

macro_rules! log_trace {
    ($($arg:tt)*) => {{
        #[cfg(all(feature = "defmt", not(test)))]
        ::defmt::trace!($($arg)*);

        #[cfg(test)]
        std::println!("[TRACE] {}", format_args!($($arg)*));

        #[cfg(not(any(feature = "defmt", test)))]
        let _ = format_args!($($arg)*);
    }};
}
