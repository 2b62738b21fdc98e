//! Port layer - platform-specific glue
//!
//! Everything the event core needs from the underlying platform: the
//! interrupt mask, and the identity of the calling RTOS task. The
//! semaphore the RTOS provides is abstracted separately through
//! [`crate::sync::sem::RawSem`].

#[cfg(target_arch = "arm")]
pub mod arm;

#[cfg(target_arch = "arm")]
pub use arm::*;

// Stub implementations for non-ARM targets (for host testing)
#[cfg(not(target_arch = "arm"))]
pub mod stub {
    use portable_atomic::{AtomicUsize, Ordering};

    use crate::types::TaskId;

    /// Simulated current-task register
    static CUR_TASK: AtomicUsize = AtomicUsize::new(1);

    /// Mask interrupts, returning whether they were previously unmasked
    #[inline(always)]
    pub fn int_mask() -> bool {
        // No interrupt controller on the host
        true
    }

    /// Restore the interrupt mask captured by [`int_mask`]
    #[inline(always)]
    pub fn int_restore(_was_active: bool) {}

    /// Identity of the calling task
    #[inline]
    pub fn current_task() -> TaskId {
        TaskId::from_raw(CUR_TASK.load(Ordering::Acquire))
    }

    /// Override the simulated task identity (host tests only)
    pub fn set_current_task(id: TaskId) {
        CUR_TASK.store(id.as_raw(), Ordering::Release);
    }
}

#[cfg(not(target_arch = "arm"))]
pub use stub::*;
