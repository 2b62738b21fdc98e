//! Event-loop OS port layer for a mesh-networking stack
//!
//! Glue that hosts the stack's tasklet event scheduler on an RTOS:
//! - Interrupt-level critical sections with state restore
//! - A recursive, ownership-tracked mutex over an external semaphore
//! - Priority-ordered event dispatch from a fixed pool
//! - Tick-driven timed events

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(target_arch = "arm")]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod event;
pub mod port;
pub mod sync;

// ============ Re-exports ============

pub use core::config;
pub use core::config::*;
pub use core::critical;
pub use core::critical::{critical_section, CriticalSection, CsCell};
pub use core::error;
pub use core::error::{PortError, PortResult};
pub use core::types;
pub use core::types::*;

pub use sync::mutex::{MutexGuard, OwnedMutex};
pub use sync::sem::{RawSem, SignalSem};

pub use event::{Event, TaskletFn};
