//! Unit tests for the event-loop port layer
//!
//! These run on the host against the stub port. Tests that touch the
//! simulated task identity or the global event core serialize through
//! `serial()` since cargo runs tests on multiple threads.

use std::sync::{Mutex, MutexGuard};

use eventos::port;
use eventos::types::TaskId;

fn serial() -> MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    let guard = LOCK.lock().unwrap_or_else(|e| e.into_inner());
    port::set_current_task(TaskId::from_raw(1));
    guard
}

#[cfg(test)]
mod critical_tests {
    use eventos::critical::{critical_section, CriticalSection, CsCell};

    #[test]
    fn test_nesting_depth() {
        let base = CriticalSection::depth();

        let outer = CriticalSection::enter();
        assert_eq!(CriticalSection::depth(), base + 1);

        let inner = CriticalSection::enter();
        assert_eq!(CriticalSection::depth(), base + 2);

        drop(inner);
        assert_eq!(CriticalSection::depth(), base + 1);

        drop(outer);
        assert_eq!(CriticalSection::depth(), base);
    }

    #[test]
    fn test_closure_returns_value() {
        let doubled = critical_section(|_cs| 21 * 2);
        assert_eq!(doubled, 42);
    }

    #[test]
    fn test_cs_cell_access() {
        let cell: CsCell<u32> = CsCell::new(5);

        critical_section(|cs| {
            cell.with(cs, |v| *v += 1);
        });

        let value = critical_section(|cs| cell.with(cs, |v| *v));
        assert_eq!(value, 6);
    }
}

#[cfg(test)]
mod mutex_tests {
    use eventos::error::PortError;
    use eventos::port;
    use eventos::sync::mutex::OwnedMutex;
    use eventos::sync::sem::SignalSem;
    use eventos::types::TaskId;

    fn fresh() -> OwnedMutex<SignalSem> {
        OwnedMutex::new(SignalSem::new(1))
    }

    #[test]
    fn test_lock_records_owner() {
        let _serial = super::serial();
        let m = fresh();

        assert!(!m.is_owner());
        assert_eq!(m.owner(), None);
        assert_eq!(m.lock_depth(), 0);

        let guard = m.lock().unwrap();
        assert!(m.is_owner());
        assert_eq!(m.owner(), Some(TaskId::from_raw(1)));
        assert_eq!(m.lock_depth(), 1);

        drop(guard);
        assert!(!m.is_owner());
        assert_eq!(m.owner(), None);
        assert_eq!(m.lock_depth(), 0);
    }

    #[test]
    fn test_recursive_lock_does_not_block() {
        let _serial = super::serial();
        let m = fresh();

        // A second lock by the owner must increment the count instead of
        // pending on the semaphore again.
        let outer = m.lock().unwrap();
        let inner = m.lock().unwrap();
        assert_eq!(m.lock_depth(), 2);

        drop(inner);
        assert!(m.is_owner());
        assert_eq!(m.lock_depth(), 1);

        drop(outer);
        assert_eq!(m.lock_depth(), 0);

        // Fully released, can be taken again
        let again = m.try_lock().unwrap();
        again.unlock();
    }

    #[test]
    fn test_other_task_cannot_take_held_lock() {
        let _serial = super::serial();
        let m = fresh();

        let guard = m.lock().unwrap();

        port::set_current_task(TaskId::from_raw(2));
        assert_eq!(m.try_lock().unwrap_err(), PortError::WouldBlock);
        assert!(!m.is_owner());
        assert_eq!(m.owner(), Some(TaskId::from_raw(1)));

        // The guard belongs to task 1; restore identity before dropping
        port::set_current_task(TaskId::from_raw(1));
        drop(guard);

        port::set_current_task(TaskId::from_raw(2));
        let stolen = m.try_lock().unwrap();
        assert_eq!(m.owner(), Some(TaskId::from_raw(2)));
        drop(stolen);
    }

    #[test]
    fn test_semaphore_signalled_only_at_last_release() {
        let _serial = super::serial();
        let m = fresh();

        let outer = m.lock().unwrap();
        let inner = m.lock().unwrap();
        drop(inner);

        // Still nested once; another task must not get in
        port::set_current_task(TaskId::from_raw(2));
        assert_eq!(m.try_lock().unwrap_err(), PortError::WouldBlock);

        port::set_current_task(TaskId::from_raw(1));
        drop(outer);

        port::set_current_task(TaskId::from_raw(2));
        assert!(m.try_lock().is_ok());
    }

    #[test]
    fn test_guard_debug() {
        let _serial = super::serial();
        let m = fresh();

        // Guards can be formatted for diagnostics without S: Debug
        let guard = m.lock().unwrap();
        let text = format!("{:?}", guard);
        assert!(text.contains("MutexGuard"));
    }

    #[test]
    fn test_nesting_overflow() {
        let _serial = super::serial();
        let m = fresh();

        let _outer = m.lock().unwrap();
        let mut guards = Vec::new();
        for _ in 0..254 {
            guards.push(m.lock().unwrap());
        }
        assert_eq!(m.lock_depth(), u8::MAX);

        assert_eq!(m.lock().unwrap_err(), PortError::NestingOverflow);
        assert_eq!(m.try_lock().unwrap_err(), PortError::NestingOverflow);

        // Depth unchanged by the failed attempts
        assert_eq!(m.lock_depth(), u8::MAX);
    }
}

#[cfg(test)]
mod sem_tests {
    use eventos::sync::sem::{RawSem, SignalSem};

    #[test]
    fn test_counting() {
        let sem = SignalSem::new(0);
        assert!(!sem.try_wait());

        sem.post();
        sem.post();
        assert_eq!(sem.count(), 2);

        assert!(sem.try_wait());
        assert!(sem.try_wait());
        assert!(!sem.try_wait());
    }

    #[test]
    fn test_wait_consumes_available_token() {
        let sem = SignalSem::new(1);
        sem.wait();
        assert_eq!(sem.count(), 0);
    }

    #[test]
    fn test_count_saturates() {
        let sem = SignalSem::new(u32::MAX);
        sem.post();
        assert_eq!(sem.count(), u32::MAX);
    }
}

#[cfg(test)]
mod event_tests {
    use std::sync::Mutex;

    use eventos::error::PortError;
    use eventos::event;
    use eventos::types::{EventPriority, EventType};
    use eventos::Event;

    /// (event_type, event_id, data) per dispatched event
    static RECEIVED: Mutex<Vec<(EventType, u8, u32)>> = Mutex::new(Vec::new());

    fn recorder(ev: &Event) {
        RECEIVED
            .lock()
            .unwrap()
            .push((ev.event_type, ev.event_id, ev.data));
    }

    fn ctx_probe(ev: &Event) {
        assert!(event::in_dispatch());
        recorder(ev);
    }

    fn setup(handler: event::TaskletFn, init_id: u8) -> u8 {
        event::init();
        RECEIVED.lock().unwrap().clear();
        event::tasklet_create(handler, init_id).unwrap()
    }

    #[test]
    fn test_init_event_delivered_first() {
        let _serial = super::serial();
        let _id = setup(recorder, 7);

        // Registration queues exactly the init event
        assert_eq!(event::queued_count(), 1);
        assert!(event::dispatch_one());
        assert!(!event::dispatch_one());

        let received = RECEIVED.lock().unwrap();
        assert_eq!(received.as_slice(), &[(EventType::Init, 7, 0)]);
    }

    #[test]
    fn test_priority_ordering() {
        let _serial = super::serial();
        let id = setup(recorder, 0);
        while event::dispatch_one() {}
        RECEIVED.lock().unwrap().clear();

        let mut low = Event::new(id, 1);
        low.priority = EventPriority::Low;
        let std1 = Event::new(id, 2);
        let mut crit = Event::new(id, 3);
        crit.priority = EventPriority::Critical;
        let std2 = Event::new(id, 4);

        event::send(low).unwrap();
        event::send(std1).unwrap();
        event::send(crit).unwrap();
        event::send(std2).unwrap();

        while event::dispatch_one() {}

        let ids: Vec<u8> = RECEIVED.lock().unwrap().iter().map(|r| r.1).collect();
        // Critical first, standard in send order, low last
        assert_eq!(ids, vec![3, 2, 4, 1]);
    }

    #[test]
    fn test_init_precedes_critical_sends() {
        let _serial = super::serial();
        let id = setup(recorder, 9);

        // A critical event posted right after registration must still
        // dispatch behind the init event
        let mut crit = Event::new(id, 1);
        crit.priority = EventPriority::Critical;
        event::send(crit).unwrap();

        while event::dispatch_one() {}

        let received = RECEIVED.lock().unwrap();
        assert_eq!(received[0], (EventType::Init, 9, 0));
        assert_eq!(received[1], (EventType::User, 1, 0));
    }

    #[test]
    fn test_send_to_unregistered_tasklet() {
        let _serial = super::serial();
        let _id = setup(recorder, 0);

        let err = event::send(Event::new(99, 1)).unwrap_err();
        assert_eq!(err, PortError::TaskletInvalid);
    }

    #[test]
    fn test_pool_exhaustion() {
        let _serial = super::serial();
        let id = setup(recorder, 0);
        while event::dispatch_one() {}

        for i in 0..eventos::CFG_EVENT_POOL_SIZE {
            event::send(Event::new(id, i as u8)).unwrap();
        }
        assert_eq!(event::queued_count(), eventos::CFG_EVENT_POOL_SIZE);

        let err = event::send(Event::new(id, 0)).unwrap_err();
        assert_eq!(err, PortError::QueueFull);

        // Dispatching frees pool slots again
        assert!(event::dispatch_one());
        event::send(Event::new(id, 0)).unwrap();
    }

    #[test]
    fn test_tasklet_limit() {
        let _serial = super::serial();
        event::init();

        for _ in 0..eventos::CFG_TASKLET_MAX {
            event::tasklet_create(recorder, 0).unwrap();
        }
        let err = event::tasklet_create(recorder, 0).unwrap_err();
        assert_eq!(err, PortError::TaskletLimit);
    }

    #[test]
    fn test_in_dispatch_context() {
        let _serial = super::serial();
        let id = setup(ctx_probe, 0);
        while event::dispatch_one() {}
        RECEIVED.lock().unwrap().clear();

        assert!(!event::in_dispatch());
        event::send(Event::new(id, 1)).unwrap();
        assert!(event::dispatch_one());
        assert!(!event::in_dispatch());

        assert_eq!(RECEIVED.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_dispatch_under_scheduler_lock() {
        let _serial = super::serial();
        let id = setup(recorder, 0);
        while event::dispatch_one() {}
        RECEIVED.lock().unwrap().clear();

        // Holding the scheduler lock on the dispatching task must not
        // deadlock dispatch; the mutex is recursive for its owner.
        let guard = event::scheduler_lock().unwrap();
        assert!(event::in_dispatch());

        event::send(Event::new(id, 5)).unwrap();
        assert!(event::dispatch_one());
        assert_eq!(RECEIVED.lock().unwrap().len(), 1);

        drop(guard);
        assert!(!event::in_dispatch());
    }
}

#[cfg(test)]
mod timer_tests {
    use std::sync::Mutex;

    use eventos::error::PortError;
    use eventos::event;
    use eventos::event::timer;
    use eventos::types::EventType;
    use eventos::Event;

    static RECEIVED: Mutex<Vec<(EventType, u8, u32)>> = Mutex::new(Vec::new());

    fn recorder(ev: &Event) {
        RECEIVED
            .lock()
            .unwrap()
            .push((ev.event_type, ev.event_id, ev.data));
    }

    fn setup() -> u8 {
        event::init();
        RECEIVED.lock().unwrap().clear();
        let id = event::tasklet_create(recorder, 0).unwrap();
        while event::dispatch_one() {}
        RECEIVED.lock().unwrap().clear();
        id
    }

    #[test]
    fn test_one_shot_fires_once() {
        let _serial = super::serial();
        let id = setup();

        timer::request(id, 42, 99, 3).unwrap();

        timer::tick_handler();
        timer::tick_handler();
        assert_eq!(event::queued_count(), 0);

        timer::tick_handler();
        assert_eq!(event::queued_count(), 1);
        assert!(event::dispatch_one());
        assert_eq!(
            RECEIVED.lock().unwrap().as_slice(),
            &[(EventType::Timer, 42, 99)]
        );

        // No rearm
        timer::tick_handler();
        assert_eq!(event::queued_count(), 0);
    }

    #[test]
    fn test_zero_ticks_fires_on_next_tick() {
        let _serial = super::serial();
        let id = setup();

        timer::request(id, 1, 0, 0).unwrap();
        timer::tick_handler();
        assert_eq!(event::queued_count(), 1);
    }

    #[test]
    fn test_periodic_reloads_until_cancelled() {
        let _serial = super::serial();
        let id = setup();

        let handle = timer::request_periodic(id, 5, 0, 2).unwrap();

        for _ in 0..4 {
            timer::tick_handler();
        }
        assert_eq!(event::queued_count(), 2);

        timer::cancel(handle).unwrap();
        for _ in 0..4 {
            timer::tick_handler();
        }
        assert_eq!(event::queued_count(), 2);
    }

    #[test]
    fn test_cancel_invalid_handle() {
        let _serial = super::serial();
        let id = setup();

        let handle = timer::request(id, 1, 0, 5).unwrap();
        timer::cancel(handle).unwrap();
        assert_eq!(timer::cancel(handle).unwrap_err(), PortError::TimerInvalid);
    }

    #[test]
    fn test_fired_one_shot_frees_its_slot() {
        let _serial = super::serial();
        let id = setup();

        let handle = timer::request(id, 1, 0, 1).unwrap();
        timer::tick_handler();
        assert_eq!(timer::cancel(handle).unwrap_err(), PortError::TimerInvalid);

        // Slot can be reused
        timer::request(id, 2, 0, 1).unwrap();
    }

    #[test]
    fn test_zero_period_rejected() {
        let _serial = super::serial();
        let id = setup();

        let err = timer::request_periodic(id, 1, 0, 0).unwrap_err();
        assert_eq!(err, PortError::TimerZeroPeriod);
    }

    #[test]
    fn test_unregistered_receiver_rejected() {
        let _serial = super::serial();
        let _id = setup();

        let err = timer::request(99, 1, 0, 5).unwrap_err();
        assert_eq!(err, PortError::TaskletInvalid);
    }

    #[test]
    fn test_timer_limit() {
        let _serial = super::serial();
        let id = setup();

        for _ in 0..eventos::CFG_TIMER_MAX {
            timer::request(id, 1, 0, 100).unwrap();
        }
        assert_eq!(timer::request(id, 1, 0, 100).unwrap_err(), PortError::TimerLimit);
    }

    #[test]
    fn test_tick_count_advances() {
        let _serial = super::serial();
        let _id = setup();

        let before = timer::tick_count();
        timer::tick_handler();
        timer::tick_handler();
        assert_eq!(timer::tick_count(), before + 2);
    }
}

#[cfg(test)]
mod error_tests {
    use eventos::error::PortError;

    #[test]
    fn test_error_variants_distinct() {
        assert_eq!(PortError::WouldBlock, PortError::WouldBlock);
        assert_ne!(PortError::WouldBlock, PortError::QueueFull);
        assert_ne!(PortError::NestingOverflow, PortError::IsrContext);
    }

    #[test]
    fn test_error_debug() {
        // Ensure errors can be formatted for diagnostics
        let err = PortError::TaskletInvalid;
        let _ = format!("{:?}", err);
    }
}

#[cfg(test)]
mod types_tests {
    use eventos::types::{EventPriority, TaskId};

    #[test]
    fn test_task_id_roundtrip() {
        let id = TaskId::from_raw(0xdead);
        assert_eq!(id.as_raw(), 0xdead);
        assert_eq!(id, TaskId::from_raw(0xdead));
        assert_ne!(id, TaskId::from_raw(0xbeef));
    }

    #[test]
    fn test_priority_ordering() {
        assert!(EventPriority::Critical < EventPriority::High);
        assert!(EventPriority::High < EventPriority::Standard);
        assert!(EventPriority::Standard < EventPriority::Low);
    }
}

#[cfg(test)]
mod config_tests {
    use eventos::config::*;

    #[test]
    fn test_config_values() {
        // Pool and table indices are stored as u8
        assert!(CFG_EVENT_POOL_SIZE >= 8, "Event pool too small");
        assert!(CFG_EVENT_POOL_SIZE <= 256, "Event pool exceeds index range");
        assert!(CFG_TASKLET_MAX <= 256, "Tasklet table exceeds index range");
        assert!(CFG_TIMER_MAX <= 256, "Timer table exceeds index range");

        assert!(CFG_TICK_RATE_HZ >= 10, "Tick rate too slow");
        assert!(CFG_TICK_RATE_HZ <= 10000, "Tick rate too fast");
    }
}
