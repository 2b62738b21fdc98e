//! Cortex-M port
//!
//! Interrupt mask control comes from the core registers; task identity and
//! the blocking semaphore come from the vendor RTOS through `extern "C"`
//! hooks the integrator's glue must provide at link time.

use core::ffi::c_void;

use cortex_m::interrupt;
use cortex_m::register::primask;

use crate::sync::sem::RawSem;
use crate::types::TaskId;

extern "C" {
    /// Handle of the calling RTOS task (e.g. `Task_self()`)
    fn eventos_port_task_self() -> usize;
    /// Block until the semaphore can be taken
    fn eventos_port_sem_wait(sem: *mut c_void);
    /// Take the semaphore without blocking; nonzero on success
    fn eventos_port_sem_trywait(sem: *mut c_void) -> i32;
    /// Signal the semaphore
    fn eventos_port_sem_post(sem: *mut c_void);
}

/// Mask interrupts, returning whether they were previously unmasked
#[inline(always)]
pub fn int_mask() -> bool {
    let was_active = primask::read().is_active();
    interrupt::disable();
    was_active
}

/// Restore the interrupt mask captured by [`int_mask`]
#[inline(always)]
pub fn int_restore(was_active: bool) {
    if was_active {
        unsafe { interrupt::enable() }
    }
}

/// Identity of the calling task
#[inline]
pub fn current_task() -> TaskId {
    TaskId::from_raw(unsafe { eventos_port_task_self() })
}

/// A vendor RTOS semaphore behind the port ABI
///
/// Wraps the opaque handle of a semaphore created by the integrator's
/// RTOS glue. The handle must stay valid for the life of this value.
pub struct RtosSem {
    handle: *mut c_void,
}

unsafe impl Send for RtosSem {}
unsafe impl Sync for RtosSem {}

impl RtosSem {
    /// Wrap an RTOS semaphore handle
    ///
    /// # Safety
    /// `handle` must be a valid semaphore handle for the vendor RTOS the
    /// port hooks are linked against, and must outlive this value.
    pub const unsafe fn from_handle(handle: *mut c_void) -> Self {
        RtosSem { handle }
    }
}

impl RawSem for RtosSem {
    fn wait(&self) {
        unsafe { eventos_port_sem_wait(self.handle) }
    }

    fn try_wait(&self) -> bool {
        unsafe { eventos_port_sem_trywait(self.handle) != 0 }
    }

    fn post(&self) {
        unsafe { eventos_port_sem_post(self.handle) }
    }
}
