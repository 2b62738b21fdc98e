//! Critical section handling
//!
//! Interrupt-level mutual exclusion for the event core. Unlike a plain
//! disable/enable pair, the guard restores the interrupt mask that was in
//! effect on entry, so nested critical sections and sections entered with
//! interrupts already masked behave correctly.

use portable_atomic::{AtomicU8, Ordering};

use crate::types::NestingCtr;

/// Current critical-section nesting depth
static NESTING: AtomicU8 = AtomicU8::new(0);

/// RAII guard for critical sections
///
/// Creating the guard disables interrupts; dropping it restores the
/// interrupt mask captured on entry.
pub struct CriticalSection {
    was_active: bool,
}

impl CriticalSection {
    /// Enter a critical section by masking interrupts.
    ///
    /// Returns a guard that restores the previous mask state when dropped.
    #[inline(always)]
    pub fn enter() -> Self {
        let was_active = crate::port::int_mask();
        NESTING.fetch_add(1, Ordering::Relaxed);
        CriticalSection { was_active }
    }

    /// Current nesting depth, 0 when no critical section is active
    #[inline(always)]
    pub fn depth() -> NestingCtr {
        NESTING.load(Ordering::Relaxed)
    }

    /// Check if any critical section is currently active
    #[inline(always)]
    pub fn is_active() -> bool {
        Self::depth() > 0
    }
}

impl Drop for CriticalSection {
    #[inline(always)]
    fn drop(&mut self) {
        NESTING.fetch_sub(1, Ordering::Relaxed);
        crate::port::int_restore(self.was_active);
    }
}

/// Execute a closure with interrupts masked
///
/// The closure receives a reference to the critical section guard, which
/// unlocks access to [`CsCell`] protected data.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    let cs = CriticalSection::enter();
    f(&cs)
}

/// Check if currently executing in an ISR context
#[inline]
pub fn is_isr_context() -> bool {
    #[cfg(target_arch = "arm")]
    {
        let ipsr: u32;
        unsafe {
            core::arch::asm!(
                "mrs {}, IPSR",
                out(reg) ipsr,
                options(nomem, nostack, preserves_flags)
            );
        }
        ipsr != 0
    }

    #[cfg(not(target_arch = "arm"))]
    {
        false
    }
}

// ============ Protected Cell ============

use core::cell::UnsafeCell;

/// A cell whose contents are only reachable inside a critical section.
///
/// The `&CriticalSection` parameter is the proof that interrupts are
/// masked while the closure runs.
pub struct CsCell<T>(UnsafeCell<T>);

unsafe impl<T> Sync for CsCell<T> {}

impl<T> CsCell<T> {
    /// Create a new cell
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }

    /// Run `f` on the protected value
    #[inline(always)]
    pub fn with<R>(&self, _cs: &CriticalSection, f: impl FnOnce(&mut T) -> R) -> R {
        f(unsafe { &mut *self.0.get() })
    }

    /// Get a mutable reference without a critical-section token
    ///
    /// # Safety
    /// Caller must guarantee no concurrent access to the cell.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self) -> &mut T {
        unsafe { &mut *self.0.get() }
    }
}
