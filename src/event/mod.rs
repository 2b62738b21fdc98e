//! Tasklet event scheduler
//!
//! The event loop this port layer exists to host. Stack and application
//! code register tasklets (event handler functions) and post events to
//! them; a dedicated RTOS task drains the queue through [`run`]. Events
//! live in a fixed pool and dispatch in priority order, FIFO within a
//! priority.
//!
//! Queue manipulation happens inside critical sections so [`send`] is
//! ISR-safe. Dispatch holds the scheduler mutex around each handler call,
//! so code anywhere below the handler can detect loop context through
//! [`in_dispatch`] and outside code can fence the loop out with
//! [`scheduler_lock`].

pub mod timer;

use crate::config::{CFG_EVENT_POOL_SIZE, CFG_TASKLET_MAX};
use crate::critical::{critical_section, is_isr_context, CsCell};
use crate::error::{PortError, PortResult};
use crate::sync::mutex::{MutexGuard, OwnedMutex};
use crate::sync::sem::{RawSem, SignalSem};
use crate::types::{EventData, EventId, EventPriority, EventType, TaskletId};

/// Tasklet event handler
pub type TaskletFn = fn(&Event);

/// An event queued to a tasklet
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Event {
    /// Tasklet the event is delivered to
    pub receiver: TaskletId,
    /// Tasklet that posted the event
    pub sender: TaskletId,
    /// Kind of event
    pub event_type: EventType,
    /// Application-chosen identifier
    pub event_id: EventId,
    /// Payload word
    pub data: EventData,
    /// Dispatch priority
    pub priority: EventPriority,
}

impl Event {
    /// A user event to `receiver` with standard priority and no payload
    pub const fn new(receiver: TaskletId, event_id: EventId) -> Self {
        Event {
            receiver,
            sender: 0,
            event_type: EventType::User,
            event_id,
            data: 0,
            priority: EventPriority::Standard,
        }
    }
}

// ============ Event Core ============

#[derive(Clone, Copy)]
struct Slot {
    event: Event,
    next: Option<u8>,
}

impl Slot {
    const EMPTY: Slot = Slot {
        event: Event::new(0, 0),
        next: None,
    };
}

struct EventCore {
    initialized: bool,
    tasklets: [Option<TaskletFn>; CFG_TASKLET_MAX],
    pool: [Slot; CFG_EVENT_POOL_SIZE],
    /// Head of the free slot list
    free: Option<u8>,
    /// Head of the pending queue, highest priority first
    queued: Option<u8>,
}

impl EventCore {
    const fn new() -> Self {
        EventCore {
            initialized: false,
            tasklets: [None; CFG_TASKLET_MAX],
            pool: [Slot::EMPTY; CFG_EVENT_POOL_SIZE],
            free: None,
            queued: None,
        }
    }

    fn reset(&mut self) {
        self.tasklets = [None; CFG_TASKLET_MAX];
        self.queued = None;
        self.free = Some(0);
        for i in 0..CFG_EVENT_POOL_SIZE {
            self.pool[i].next = if i + 1 < CFG_EVENT_POOL_SIZE {
                Some((i + 1) as u8)
            } else {
                None
            };
        }
        self.initialized = true;
    }

    fn alloc(&mut self) -> Option<u8> {
        let idx = self.free?;
        self.free = self.pool[idx as usize].next;
        self.pool[idx as usize].next = None;
        Some(idx)
    }

    fn free_slot(&mut self, idx: u8) {
        self.pool[idx as usize].next = self.free;
        self.free = Some(idx);
    }

    /// Insert after the last queued slot of equal or higher priority
    fn enqueue(&mut self, idx: u8) {
        let prio = self.pool[idx as usize].event.priority;

        let mut prev: Option<u8> = None;
        let mut cur = self.queued;
        while let Some(c) = cur {
            if self.pool[c as usize].event.priority > prio {
                break;
            }
            prev = cur;
            cur = self.pool[c as usize].next;
        }

        self.pool[idx as usize].next = cur;
        match prev {
            Some(p) => self.pool[p as usize].next = Some(idx),
            None => self.queued = Some(idx),
        }
    }

    fn dequeue(&mut self) -> Option<u8> {
        let idx = self.queued?;
        self.queued = self.pool[idx as usize].next;
        self.pool[idx as usize].next = None;
        Some(idx)
    }

    fn tasklet(&self, id: TaskletId) -> Option<TaskletFn> {
        self.tasklets.get(id as usize).copied().flatten()
    }
}

// ============ Global Instances ============

/// Event core state
static CORE: CsCell<EventCore> = CsCell::new(EventCore::new());

/// Wakes the event task when events are queued
static SIGNAL: SignalSem = SignalSem::new(0);

/// Held around every handler call; created unlocked
static SCHEDULER_MUTEX: OwnedMutex<SignalSem> = OwnedMutex::new(SignalSem::new(1));

// ============ Public API ============

/// Initialize (or re-initialize) the event core
///
/// Clears all tasklets and queued events. Must be called before any
/// other event operation.
pub fn init() {
    critical_section(|cs| CORE.with(cs, |core| core.reset()));
    while SIGNAL.try_wait() {}
    timer::reset();
    crate::info!("event core initialized");
}

/// Register a tasklet
///
/// The new tasklet receives an [`EventType::Init`] event carrying
/// `init_event_id` before any other event. The init event is queued at
/// critical priority so nothing sent after registration can overtake it.
///
/// # Errors
/// * `IsrContext` - registration from ISR is not allowed
/// * `NotInit` - [`init`] has not been called
/// * `TaskletLimit` - all tasklet slots are in use
/// * `QueueFull` - no room to queue the init event
pub fn tasklet_create(handler: TaskletFn, init_event_id: EventId) -> PortResult<TaskletId> {
    if is_isr_context() {
        return Err(PortError::IsrContext);
    }

    let id = critical_section(|cs| {
        CORE.with(cs, |core| {
            if !core.initialized {
                return Err(PortError::NotInit);
            }

            let slot = core
                .tasklets
                .iter()
                .position(|t| t.is_none())
                .ok_or(PortError::TaskletLimit)?;
            let id = slot as TaskletId;

            // Queue the init event before publishing the tasklet
            let idx = core.alloc().ok_or(PortError::QueueFull)?;
            core.pool[idx as usize].event = Event {
                receiver: id,
                sender: id,
                event_type: EventType::Init,
                event_id: init_event_id,
                data: 0,
                priority: EventPriority::Critical,
            };
            core.enqueue(idx);
            core.tasklets[slot] = Some(handler);

            Ok(id)
        })
    })?;

    SIGNAL.post();
    crate::debug!("tasklet {} registered", id);
    Ok(id)
}

/// Post an event to a tasklet
///
/// Callable from task or ISR context.
///
/// # Errors
/// * `NotInit` - [`init`] has not been called
/// * `TaskletInvalid` - `event.receiver` is not a registered tasklet
/// * `QueueFull` - event pool exhausted
pub fn send(event: Event) -> PortResult<()> {
    critical_section(|cs| {
        CORE.with(cs, |core| {
            if !core.initialized {
                return Err(PortError::NotInit);
            }
            if core.tasklet(event.receiver).is_none() {
                return Err(PortError::TaskletInvalid);
            }

            let idx = core.alloc().ok_or(PortError::QueueFull)?;
            core.pool[idx as usize].event = event;
            core.enqueue(idx);
            Ok(())
        })
    })?;

    SIGNAL.post();
    Ok(())
}

/// Dispatch the highest-priority queued event
///
/// Runs the receiver's handler with the scheduler mutex held. Returns
/// `false` when the queue is empty or when called from ISR context.
pub fn dispatch_one() -> bool {
    if is_isr_context() {
        return false;
    }

    let dispatched = critical_section(|cs| {
        CORE.with(cs, |core| {
            let idx = core.dequeue()?;
            let event = core.pool[idx as usize].event;
            core.free_slot(idx);
            Some((event, core.tasklet(event.receiver)))
        })
    });

    let Some((event, handler)) = dispatched else {
        return false;
    };

    match SCHEDULER_MUTEX.lock() {
        Ok(guard) => {
            if let Some(handler) = handler {
                handler(&event);
            } else {
                crate::error!("event for unregistered tasklet {}", event.receiver);
            }
            guard.unlock();
            true
        }
        Err(_) => {
            crate::error!("scheduler mutex unavailable, event dropped");
            true
        }
    }
}

/// Event task body: dispatch forever
///
/// Drains the queue, then blocks on the signal semaphore until more
/// events arrive. The wait is indefinite; there is no shutdown path.
pub fn run() -> ! {
    loop {
        while dispatch_one() {}
        SIGNAL.wait();
    }
}

/// Check whether the caller is running under the event dispatcher
///
/// True while the calling task holds the scheduler mutex, which includes
/// every tasklet handler invocation.
pub fn in_dispatch() -> bool {
    SCHEDULER_MUTEX.is_owner()
}

/// Block event dispatch while the returned guard is held
///
/// Lets stack code outside the event task keep the dispatcher from
/// running handlers. Recursive acquisition by the same task is allowed.
pub fn scheduler_lock() -> PortResult<MutexGuard<'static, SignalSem>> {
    SCHEDULER_MUTEX.lock()
}

/// Number of events waiting to dispatch
pub fn queued_count() -> usize {
    critical_section(|cs| {
        CORE.with(cs, |core| {
            let mut n = 0;
            let mut cur = core.queued;
            while let Some(c) = cur {
                n += 1;
                cur = core.pool[c as usize].next;
            }
            n
        })
    })
}

pub(crate) fn tasklet_exists(id: TaskletId) -> bool {
    critical_section(|cs| CORE.with(cs, |core| core.tasklet(id).is_some()))
}
