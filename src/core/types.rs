//! Core type definitions for the event-loop port layer
//!
//! These types provide strong typing for the glue between the mesh event
//! scheduler and the underlying RTOS.

/// Identity of an RTOS thread of execution
///
/// Opaque to this crate; obtained from the port layer. Two `TaskId`s
/// compare equal exactly when they name the same RTOS task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId(usize);

impl TaskId {
    /// Wrap a raw task handle from the RTOS
    #[inline(always)]
    pub const fn from_raw(raw: usize) -> Self {
        TaskId(raw)
    }

    /// Raw task handle value
    #[inline(always)]
    pub const fn as_raw(self) -> usize {
        self.0
    }
}

/// Tasklet identifier assigned at registration
pub type TaskletId = u8;

/// Application-chosen event identifier
pub type EventId = u8;

/// Event payload word
pub type EventData = u32;

/// Nesting counter
pub type NestingCtr = u8;

/// Tick counter type
pub type Tick = u32;

/// Handle to a scheduled timed event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerHandle(pub(crate) u8);

/// Dispatch priority of a queued event
///
/// Lower value dispatches first. Events of equal priority dispatch in
/// send order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EventPriority {
    /// Stack-internal events that must preempt everything queued
    Critical = 0,
    /// Protocol-timing events
    High = 1,
    /// Normal application traffic
    Standard = 2,
    /// Background housekeeping
    Low = 3,
}

/// What kind of event a tasklet received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EventType {
    /// First event delivered to a tasklet after registration
    Init = 0,
    /// Application event posted with [`crate::event::send`]
    User = 1,
    /// Expired timed event
    Timer = 2,
}
