//! Recursive ownership-tracked mutex
//!
//! A mutex layered over a non-reentrant platform semaphore. The first
//! acquisition records the owning task; further acquisitions by the owner
//! only bump a nesting count instead of pending on the semaphore again,
//! so a task can re-enter code paths that take the same lock. Release
//! happens by dropping the guard returned from `lock`, and the semaphore
//! is only signalled once the outermost guard goes.
//!
//! Owner identity is `Some` exactly while the nesting count is nonzero,
//! and the count only moves by one at a time inside a critical section.

use core::marker::PhantomData;

use crate::critical::{critical_section, is_isr_context, CsCell};
use crate::error::{PortError, PortResult};
use crate::port;
use crate::sync::sem::RawSem;
use crate::types::{NestingCtr, TaskId};

struct OwnerState {
    owner: Option<TaskId>,
    nesting: NestingCtr,
}

/// Mutex that tracks its owning task and supports recursive acquisition
///
/// Generic over the blocking primitive so the vendor RTOS semaphore and
/// the portable [`crate::sync::sem::SignalSem`] are interchangeable. The
/// semaphore must start with a count of one (unlocked).
///
/// Intended for process-wide lifetime: construct it in a `static` and
/// never destroy it.
pub struct OwnedMutex<S: RawSem> {
    sem: S,
    state: CsCell<OwnerState>,
}

impl<S: RawSem> OwnedMutex<S> {
    /// Create an unlocked mutex over `sem`
    ///
    /// `sem` must be available (count one) or every `lock` will block.
    pub const fn new(sem: S) -> Self {
        OwnedMutex {
            sem,
            state: CsCell::new(OwnerState {
                owner: None,
                nesting: 0,
            }),
        }
    }

    /// Acquire the mutex, blocking until it is available.
    ///
    /// If the calling task already holds the mutex the nesting count is
    /// incremented without touching the semaphore. The returned guard
    /// releases one level of nesting when dropped.
    ///
    /// # Errors
    /// * `IsrContext` - called from an ISR, where pending is not allowed
    /// * `NestingOverflow` - recursive acquisition count would wrap
    pub fn lock(&self) -> PortResult<MutexGuard<'_, S>> {
        if is_isr_context() {
            return Err(PortError::IsrContext);
        }

        let me = port::current_task();

        let nested = critical_section(|cs| {
            self.state.with(cs, |st| {
                if st.owner == Some(me) {
                    st.nesting = st
                        .nesting
                        .checked_add(1)
                        .ok_or(PortError::NestingOverflow)?;
                    Ok(true)
                } else {
                    Ok(false)
                }
            })
        })?;

        if !nested {
            self.sem.wait();
            self.take_ownership(me);
        }

        Ok(MutexGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Acquire the mutex without blocking.
    ///
    /// # Errors
    /// * `WouldBlock` - another task holds the mutex
    /// * `IsrContext`, `NestingOverflow` - as for [`lock`](Self::lock)
    pub fn try_lock(&self) -> PortResult<MutexGuard<'_, S>> {
        if is_isr_context() {
            return Err(PortError::IsrContext);
        }

        let me = port::current_task();

        let nested = critical_section(|cs| {
            self.state.with(cs, |st| {
                if st.owner == Some(me) {
                    st.nesting = st
                        .nesting
                        .checked_add(1)
                        .ok_or(PortError::NestingOverflow)?;
                    Ok(true)
                } else {
                    Ok(false)
                }
            })
        })?;

        if !nested {
            if !self.sem.try_wait() {
                return Err(PortError::WouldBlock);
            }
            self.take_ownership(me);
        }

        Ok(MutexGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Check whether the calling task is the recorded owner
    pub fn is_owner(&self) -> bool {
        let me = port::current_task();
        critical_section(|cs| self.state.with(cs, |st| st.owner == Some(me)))
    }

    /// Task currently holding the mutex, if any
    pub fn owner(&self) -> Option<TaskId> {
        critical_section(|cs| self.state.with(cs, |st| st.owner))
    }

    /// Current recursive acquisition depth
    pub fn lock_depth(&self) -> NestingCtr {
        critical_section(|cs| self.state.with(cs, |st| st.nesting))
    }

    fn take_ownership(&self, me: TaskId) {
        critical_section(|cs| {
            self.state.with(cs, |st| {
                debug_assert!(st.owner.is_none() && st.nesting == 0);
                st.owner = Some(me);
                st.nesting = 1;
            })
        });
        crate::trace!("mutex acquired by task {}", me.as_raw());
    }

    fn release(&self) {
        let fully_released = critical_section(|cs| {
            self.state.with(cs, |st| {
                debug_assert!(st.owner.is_some() && st.nesting > 0);
                st.nesting -= 1;
                if st.nesting == 0 {
                    st.owner = None;
                    true
                } else {
                    false
                }
            })
        });

        if fully_released {
            self.sem.post();
        }
    }
}

/// RAII handle for one level of mutex acquisition
///
/// Dropping the guard releases that level; the semaphore is signalled
/// when the last guard for the owning task goes away. The guard is tied
/// to the acquiring task and cannot be sent to another.
pub struct MutexGuard<'a, S: RawSem> {
    lock: &'a OwnedMutex<S>,
    _not_send: PhantomData<*const ()>,
}

impl<S: RawSem> MutexGuard<'_, S> {
    /// Release this level of acquisition explicitly
    pub fn unlock(self) {}
}

impl<S: RawSem> Drop for MutexGuard<'_, S> {
    #[inline]
    fn drop(&mut self) {
        self.lock.release();
    }
}

// Manual impl: the semaphore type has no Debug requirement
impl<S: RawSem> core::fmt::Debug for MutexGuard<'_, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MutexGuard")
            .field("owner", &self.lock.owner())
            .field("depth", &self.lock.lock_depth())
            .finish()
    }
}
