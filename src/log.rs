//! Logging macros for the port layer
//!
//! Thin facade over `defmt`; every macro compiles to nothing when the
//! `defmt` feature is disabled so logging can stay in cold paths without
//! costing anything on constrained builds.

#[cfg(feature = "defmt")]
mod enabled {
    /// Trace-level message
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => { defmt::trace!($($arg)*) };
    }

    /// Debug-level message
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => { defmt::debug!($($arg)*) };
    }

    /// Info-level message
    #[macro_export]
    macro_rules! info {
        ($($arg:tt)*) => { defmt::info!($($arg)*) };
    }

    /// Warning-level message
    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => { defmt::warn!($($arg)*) };
    }

    /// Error-level message
    #[macro_export]
    macro_rules! error {
        ($($arg:tt)*) => { defmt::error!($($arg)*) };
    }
}

#[cfg(not(feature = "defmt"))]
mod disabled {
    #[macro_export]
    macro_rules! trace { ($($arg:tt)*) => {}; }
    #[macro_export]
    macro_rules! debug { ($($arg:tt)*) => {}; }
    #[macro_export]
    macro_rules! info { ($($arg:tt)*) => {}; }
    #[macro_export]
    macro_rules! warn { ($($arg:tt)*) => {}; }
    #[macro_export]
    macro_rules! error { ($($arg:tt)*) => {}; }
}
