//! Semaphore abstraction
//!
//! The blocking primitive under the ownership-tracked mutex and the event
//! loop is owned by the platform, not by this crate. [`RawSem`] is the
//! seam: the Cortex-M port binds it to the vendor RTOS semaphore, and
//! [`SignalSem`] is a portable implementation for targets and host tests
//! that have no RTOS underneath.

use portable_atomic::{AtomicU32, Ordering};

/// A binary or counting semaphore the platform can block on
///
/// Implementations are not required to be reentrant; callers that need
/// recursive acquisition layer [`crate::sync::mutex::OwnedMutex`] on top.
pub trait RawSem {
    /// Block the calling task until the semaphore can be taken
    fn wait(&self);

    /// Take the semaphore without blocking; `true` on success
    fn try_wait(&self) -> bool;

    /// Signal the semaphore. Must be callable from ISR context.
    fn post(&self);
}

/// Portable counting semaphore
///
/// Waits spin on the count, parking the core between polls on Cortex-M.
/// The count saturates instead of wrapping when posts outrun waits.
pub struct SignalSem {
    count: AtomicU32,
}

impl SignalSem {
    /// Create a semaphore with the given initial count
    pub const fn new(initial: u32) -> Self {
        SignalSem {
            count: AtomicU32::new(initial),
        }
    }

    /// Current count
    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }
}

impl RawSem for SignalSem {
    fn wait(&self) {
        loop {
            if self.try_wait() {
                return;
            }
            #[cfg(target_arch = "arm")]
            cortex_m::asm::wfe();
            #[cfg(not(target_arch = "arm"))]
            core::hint::spin_loop();
        }
    }

    fn try_wait(&self) -> bool {
        self.count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| c.checked_sub(1))
            .is_ok()
    }

    fn post(&self) {
        let _ = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| c.checked_add(1));
        #[cfg(target_arch = "arm")]
        cortex_m::asm::sev();
    }
}

impl Default for SignalSem {
    fn default() -> Self {
        Self::new(0)
    }
}
