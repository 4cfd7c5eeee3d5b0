//! End-to-end scheduling scenarios on the hosted simulator port.

use core::ptr;

use crate::arch::host;
use crate::sched;
use crate::tests::helpers::{resume_target_hook, TestEnvironment, RESUME_TARGET};
use crate::thread::{registry, suspend_caller_until, yield_now, Signaler};
use crate::time::{self, END_OF_TIME, MICROSECONDS, MILLISECONDS};

fn current_is(thread: &'static crate::thread::Thread) -> bool {
    sched::current_thread().map(|t| ptr::eq(t, thread)).unwrap_or(false)
}

#[test]
fn schedule_counter_advances_once_per_pass() {
    let env = TestEnvironment::new();
    let _a = env.spawn("a", 10);

    let before = sched::schedule_counter();
    unsafe { sched::schedule() };
    assert_eq!(sched::schedule_counter(), before + 1);
}

#[test]
fn equal_priorities_round_robin_by_last_activation() {
    let env = TestEnvironment::new();
    let a = env.spawn("A", 10);
    let b = env.spawn("B", 10);

    // Both runnable, both never activated: registry order breaks the tie.
    unsafe { sched::schedule() };
    assert!(current_is(a));

    // A now carries the younger activation stamp, so B takes over.
    host::advance_time(MILLISECONDS);
    unsafe { sched::schedule() };
    assert!(current_is(b));

    host::advance_time(MILLISECONDS);
    unsafe { sched::schedule() };
    assert!(current_is(a));
}

#[test]
fn timer_interrupt_preempts_to_the_waking_higher_priority_thread() {
    let env = TestEnvironment::new();
    let a = env.spawn("A", 10);
    let b = env.spawn("B", 20);

    let wake = host::current_time() + MILLISECONDS;
    b.suspended_until.store(wake);

    unsafe { sched::schedule() };
    assert!(current_is(a));
    // The one-shot was programmed exactly to B's wakeup.
    assert_eq!(host::last_timer_interval_us(), MILLISECONDS / MICROSECONDS);

    // A tick before the wakeup instant skips the full pass.
    let counter = sched::schedule_counter();
    sched::on_system_tick();
    assert_eq!(sched::schedule_counter(), counter);
    assert!(current_is(a));

    host::advance_time(MILLISECONDS + 100 * MICROSECONDS);
    sched::on_system_tick();
    assert!(current_is(b));
}

#[test]
fn resume_during_suspension_reports_a_resumed_wakeup() {
    let env = TestEnvironment::new();
    let a = env.spawn("A", 10);
    env.make_current(a);

    // Another context resumes A while it is switched out.
    RESUME_TARGET.store(a as *const _ as *mut _, portable_atomic::Ordering::Release);
    host::set_schedule_hook(resume_target_hook);

    let semaphore = 0u32;
    let resumed =
        suspend_caller_until(time::now() + 5 * MILLISECONDS, Some(Signaler::of(&semaphore)));

    assert!(resumed);
    assert_eq!(a.suspended_until.load(), 0);
    assert_eq!(a.waiting_for_token(), 0);
}

#[test]
fn suspension_with_a_past_deadline_times_out_without_a_switch() {
    let env = TestEnvironment::new();
    let a = env.spawn("A", 10);
    env.make_current(a);

    let semaphore = 0u32;
    let counter = sched::schedule_counter();
    let resumed = suspend_caller_until(time::now() - 1, Some(Signaler::of(&semaphore)));

    assert!(!resumed);
    assert!(current_is(a));
    assert_eq!(sched::schedule_counter(), counter);
    assert_eq!(a.waiting_for_token(), 0);
}

#[test]
fn end_of_time_parks_until_an_explicit_resume() {
    let env = TestEnvironment::new();
    let parked = env.spawn("parked", 20);
    let background = env.spawn("background", 5);

    parked.suspended_until.store(END_OF_TIME);
    unsafe { sched::schedule() };
    assert!(current_is(background));

    // Deadlines never cancel an END_OF_TIME suspension.
    host::advance_time(1_000 * MILLISECONDS);
    unsafe { sched::schedule() };
    assert!(current_is(background));

    parked.resume();
    assert_eq!(sched::time_to_try_again_to_schedule(), 0);
    unsafe { sched::schedule() };
    assert!(current_is(parked));
}

#[test]
fn yield_is_free_when_nobody_else_wants_the_cpu() {
    let env = TestEnvironment::new();
    let a = env.spawn("A", 10);
    env.make_current(a);

    let counter = sched::schedule_counter();
    yield_now();
    yield_now();

    assert!(current_is(a));
    assert_eq!(sched::schedule_counter(), counter);
}

#[test]
fn yield_to_a_waiting_thread_schedules_exactly_once() {
    let env = TestEnvironment::new();
    let a = env.spawn("A", 10);
    let b = env.spawn("B", 20);
    env.make_current(a);

    let counter = sched::schedule_counter();
    yield_now();

    assert!(current_is(b));
    assert_eq!(sched::schedule_counter(), counter + 1);
    assert!(host::timer_running());
}

#[test]
fn corrupted_canary_removes_the_thread_from_the_runnable_set() {
    let env = TestEnvironment::new();
    let t = env.spawn("deep-recursor", 10);
    env.make_current(t);

    unsafe { (t.stack().begin() as *mut u32).write(0x1234_5678) };

    unsafe { sched::schedule() };

    assert_eq!(t.suspended_until.load(), END_OF_TIME);
    assert!(current_is(registry::idle_thread()));
}

#[test]
fn startup_freezes_the_registry_and_runs_the_top_thread() {
    let env = TestEnvironment::new();
    let a = env.spawn("A", 10);
    let _lower = env.spawn("lower", 5);

    sched::start();

    assert!(registry::is_frozen());
    assert!(current_is(a));
    assert!(host::timer_running());

    let late = crate::thread::ThreadBuilder::new().spawn(crate::tests::helpers::noop_entry);
    assert_eq!(
        late.err(),
        Some(crate::errors::RegistryError::AlreadyStarted.into())
    );
}

#[cfg(feature = "timeevents")]
mod timeevent_scenarios {
    use portable_atomic::{AtomicI64, Ordering};

    use super::*;
    use crate::config::MIN_SYS_TICK_SPACING;
    use crate::time::events::{self, TimeEventSource};
    use crate::time::Timer;

    struct MockTimeEvents {
        next_trigger: AtomicI64,
        last_propagated: AtomicI64,
    }

    impl TimeEventSource for MockTimeEvents {
        fn next_trigger_time(&self) -> i64 {
            self.next_trigger.load(Ordering::Acquire)
        }

        fn propagate(&self, now: i64) {
            self.last_propagated.store(now, Ordering::Release);
        }
    }

    static MOCK_EVENTS: MockTimeEvents = MockTimeEvents {
        next_trigger: AtomicI64::new(i64::MAX),
        last_propagated: AtomicI64::new(0),
    };

    #[test]
    fn late_time_events_are_propagated_before_reprogramming() {
        let _env = TestEnvironment::new();

        MOCK_EVENTS
            .next_trigger
            .store(host::current_time() - MICROSECONDS, Ordering::Release);
        MOCK_EVENTS.last_propagated.store(0, Ordering::Release);
        events::set_time_event_source(&MOCK_EVENTS);

        sched::set_time_to_try_again_for_testing(END_OF_TIME);
        Timer::update_trigger_to_next_timing_event();

        // The elapsed event was pushed to "now" instead of being dropped,
        // and the interval still respects the spacing floor.
        assert_eq!(MOCK_EVENTS.last_propagated.load(Ordering::Acquire), host::current_time());
        assert_eq!(host::last_timer_interval_us(), MIN_SYS_TICK_SPACING / MICROSECONDS);
    }

    #[cfg(feature = "sleep-when-idle")]
    #[test]
    fn sleep_policy_wakes_ahead_of_the_deadline_and_reprograms_the_rest() {
        let _env = TestEnvironment::new();

        let deadline = host::current_time() + 10 * MILLISECONDS;
        MOCK_EVENTS.next_trigger.store(deadline, Ordering::Release);
        events::set_time_event_source(&MOCK_EVENTS);
        sched::set_time_to_try_again_for_testing(END_OF_TIME);

        crate::sched::idle::sleep_until_next_deadline();

        // Slept once, woken 150 µs early, remainder programmed.
        assert_eq!(host::sleep_count(), 1);
        assert_eq!(host::current_time(), deadline - 150 * MICROSECONDS);
        assert_eq!(host::last_timer_interval_us(), 150);
        assert!(host::timer_running());
    }

    #[cfg(feature = "sleep-when-idle")]
    #[test]
    fn sleep_is_skipped_when_the_gap_is_narrower_than_the_wake_latency() {
        let _env = TestEnvironment::new();

        MOCK_EVENTS.next_trigger.store(i64::MAX, Ordering::Release);
        events::set_time_event_source(&MOCK_EVENTS);
        sched::set_time_to_try_again_for_testing(host::current_time() + 200 * MICROSECONDS);

        crate::sched::idle::sleep_until_next_deadline();

        assert_eq!(host::sleep_count(), 0);
    }
}
