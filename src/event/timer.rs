//! Timed events
//!
//! One-shot and periodic events scheduled in system ticks. The RTOS tick
//! hook calls [`tick_handler`]; expired timers post an
//! [`EventType::Timer`](crate::types::EventType::Timer) event to their
//! receiver through the normal queue.

use portable_atomic::{AtomicU32, Ordering};

use crate::config::CFG_TIMER_MAX;
use crate::critical::{critical_section, CsCell};
use crate::error::{PortError, PortResult};
use crate::types::{EventData, EventId, EventPriority, EventType, TaskletId, Tick, TimerHandle};

use super::Event;

#[derive(Clone, Copy)]
struct TimerSlot {
    receiver: TaskletId,
    event_id: EventId,
    data: EventData,
    remaining: Tick,
    /// Reload value; 0 for one-shot
    period: Tick,
    active: bool,
}

impl TimerSlot {
    const EMPTY: TimerSlot = TimerSlot {
        receiver: 0,
        event_id: 0,
        data: 0,
        remaining: 0,
        period: 0,
        active: false,
    };
}

struct TimerTable {
    slots: [TimerSlot; CFG_TIMER_MAX],
}

impl TimerTable {
    const fn new() -> Self {
        TimerTable {
            slots: [TimerSlot::EMPTY; CFG_TIMER_MAX],
        }
    }

    fn schedule(
        &mut self,
        receiver: TaskletId,
        event_id: EventId,
        data: EventData,
        ticks: Tick,
        period: Tick,
    ) -> PortResult<TimerHandle> {
        let slot = self
            .slots
            .iter()
            .position(|s| !s.active)
            .ok_or(PortError::TimerLimit)?;

        self.slots[slot] = TimerSlot {
            receiver,
            event_id,
            data,
            // A zero request still waits for the next tick edge
            remaining: if ticks == 0 { 1 } else { ticks },
            period,
            active: true,
        };

        Ok(TimerHandle(slot as u8))
    }
}

/// Timer table state
static TIMERS: CsCell<TimerTable> = CsCell::new(TimerTable::new());

/// Ticks elapsed since start
static TICKS: AtomicU32 = AtomicU32::new(0);

/// Schedule a one-shot event after `ticks` system ticks
///
/// # Errors
/// * `TaskletInvalid` - `receiver` is not a registered tasklet
/// * `TimerLimit` - all timer slots are in use
pub fn request(
    receiver: TaskletId,
    event_id: EventId,
    data: EventData,
    ticks: Tick,
) -> PortResult<TimerHandle> {
    if !super::tasklet_exists(receiver) {
        return Err(PortError::TaskletInvalid);
    }

    critical_section(|cs| TIMERS.with(cs, |t| t.schedule(receiver, event_id, data, ticks, 0)))
}

/// Schedule a periodic event every `period` system ticks
///
/// # Errors
/// * `TimerZeroPeriod` - `period` is 0
/// * `TaskletInvalid`, `TimerLimit` - as for [`request`]
pub fn request_periodic(
    receiver: TaskletId,
    event_id: EventId,
    data: EventData,
    period: Tick,
) -> PortResult<TimerHandle> {
    if period == 0 {
        return Err(PortError::TimerZeroPeriod);
    }
    if !super::tasklet_exists(receiver) {
        return Err(PortError::TaskletInvalid);
    }

    critical_section(|cs| {
        TIMERS.with(cs, |t| t.schedule(receiver, event_id, data, period, period))
    })
}

/// Cancel a scheduled timed event
///
/// # Errors
/// * `TimerInvalid` - the handle does not name an active timer
pub fn cancel(handle: TimerHandle) -> PortResult<()> {
    critical_section(|cs| {
        TIMERS.with(cs, |t| {
            let slot = t
                .slots
                .get_mut(handle.0 as usize)
                .ok_or(PortError::TimerInvalid)?;
            if !slot.active {
                return Err(PortError::TimerInvalid);
            }
            slot.active = false;
            Ok(())
        })
    })
}

/// Advance timers by one tick
///
/// Call from the RTOS tick hook, ISR context included. Expired timers
/// post their event; a full event pool drops the event but keeps
/// periodic timers running.
pub fn tick_handler() {
    TICKS.fetch_add(1, Ordering::Relaxed);

    critical_section(|cs| {
        TIMERS.with(cs, |t| {
            for slot in t.slots.iter_mut().filter(|s| s.active) {
                slot.remaining -= 1;
                if slot.remaining > 0 {
                    continue;
                }

                let event = Event {
                    receiver: slot.receiver,
                    sender: slot.receiver,
                    event_type: EventType::Timer,
                    event_id: slot.event_id,
                    data: slot.data,
                    priority: EventPriority::High,
                };
                if super::send(event).is_err() {
                    crate::error!("timer event dropped");
                }

                if slot.period > 0 {
                    slot.remaining = slot.period;
                } else {
                    slot.active = false;
                }
            }
        })
    });
}

/// Ticks elapsed since start
#[inline]
pub fn tick_count() -> Tick {
    TICKS.load(Ordering::Relaxed)
}

pub(crate) fn reset() {
    critical_section(|cs| {
        TIMERS.with(cs, |t| {
            t.slots = [TimerSlot::EMPTY; CFG_TIMER_MAX];
        })
    });
    TICKS.store(0, Ordering::Relaxed);
}
