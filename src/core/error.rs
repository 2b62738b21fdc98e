//! Error types for the port layer
//!
//! Uses Rust's Result pattern instead of C-style status codes.

/// Port-layer error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum PortError {
    // ============ Context errors ============
    /// Operation cannot be performed from ISR context
    IsrContext = 1001,
    /// Event core has not been initialized
    NotInit = 1002,

    // ============ Mutex errors ============
    /// Recursive acquisition count would overflow
    NestingOverflow = 2001,
    /// Lock is held by another task (non-blocking acquire)
    WouldBlock = 2002,

    // ============ Event errors ============
    /// Event pool exhausted
    QueueFull = 4001,
    /// Receiver tasklet is not registered
    TaskletInvalid = 4002,
    /// No free tasklet slot
    TaskletLimit = 4003,

    // ============ Timer errors ============
    /// No free timer slot
    TimerLimit = 5001,
    /// Handle does not name an active timed event
    TimerInvalid = 5002,
    /// Zero ticks requested for a periodic event
    TimerZeroPeriod = 5003,
}

/// Result type alias for port-layer operations
pub type PortResult<T> = Result<T, PortError>;
