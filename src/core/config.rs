//! Compile-time configuration for the event-loop port layer
//!
//! These constants control the resource limits of the event core.

/// Number of events in the static event pool
pub const CFG_EVENT_POOL_SIZE: usize = 32;

/// Maximum number of registered tasklets
pub const CFG_TASKLET_MAX: usize = 8;

/// Maximum number of concurrently scheduled timed events
pub const CFG_TIMER_MAX: usize = 16;

/// System tick rate in Hz
pub const CFG_TICK_RATE_HZ: u32 = 1000;
