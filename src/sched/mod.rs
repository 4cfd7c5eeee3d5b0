//! The scheduler: selection commit, context-switch driver and startup.
//!
//! One schedule pass selects the highest-priority runnable thread, stamps
//! its activation, republishes the next instant the scheduler must look
//! again, reprograms the timer and switches context. The pass runs from
//! the tick ISR and from the slow path of a yield; the pre-selection
//! slots carry a yield's already-computed result into the pass so it is
//! not repeated.
//!
//! Reentrancy is governed by two pieces of state. `SCHEDULE_COUNTER`
//! advances exactly once per completed pass, letting a yield detect a
//! racing tick by delta. `YIELD_SCHEDULING_LOCK` makes the tick ISR back
//! off while a yield is inside the window where the timer is being
//! stopped; it is released on the next activation.

pub mod idle;

use core::ptr;

use portable_atomic::{AtomicBool, AtomicPtr, AtomicU64, Ordering};

use crate::arch::{Arch, DefaultArch};
use crate::cell::InterruptCell64;
use crate::config::MIN_SYS_TICK_SPACING;
use crate::thread::{registry, Thread};
use crate::time::{self, Timer, END_OF_TIME, MICROSECONDS};

static SCHEDULE_COUNTER: AtomicU64 = AtomicU64::new(0);
static CURRENT_THREAD: AtomicPtr<Thread> = AtomicPtr::new(ptr::null_mut());

/// Hand-off from a yield's pre-pass to the schedule it triggers.
static PRE_SELECTED_NEXT_TO_RUN: AtomicPtr<Thread> = AtomicPtr::new(ptr::null_mut());
static PRE_SELECTED_EARLIEST_SUSPENDED_UNTIL: InterruptCell64 = InterruptCell64::new(END_OF_TIME);

/// Earliest instant at which a full selection pass is worth running
/// again. The tick ISR skips the pass while now() is before this.
static TIME_TO_TRY_AGAIN_TO_SCHEDULE: InterruptCell64 = InterruptCell64::new(0);

/// While set, the tick ISR must abort before reaching the selector: a
/// thread is inside yield's slow path and `Timer::stop` may not be
/// atomic on this port.
static YIELD_SCHEDULING_LOCK: AtomicBool = AtomicBool::new(false);

static STARTED: AtomicBool = AtomicBool::new(false);

/// Number of completed schedule passes.
///
/// Consumers may use the delta between two reads to detect that at least
/// one reschedule happened in between; the exact count carries no meaning.
pub fn schedule_counter() -> u64 {
    SCHEDULE_COUNTER.load(Ordering::Relaxed)
}

/// The currently running thread, once scheduling has begun.
pub fn current_thread() -> Option<&'static Thread> {
    let thread = CURRENT_THREAD.load(Ordering::Acquire);
    if thread.is_null() {
        None
    } else {
        Some(unsafe { &*thread })
    }
}

pub(crate) fn set_current_thread(thread: &'static Thread) {
    CURRENT_THREAD.store(thread as *const Thread as *mut Thread, Ordering::Release);
}

pub(crate) fn reset_time_to_try_again() {
    TIME_TO_TRY_AGAIN_TO_SCHEDULE.store(0);
}

pub(crate) fn time_to_try_again_to_schedule() -> i64 {
    TIME_TO_TRY_AGAIN_TO_SCHEDULE.load()
}

pub(crate) fn lock_yield_scheduling() {
    YIELD_SCHEDULING_LOCK.store(true, Ordering::Release);
}

pub(crate) fn publish_preselection(next: &'static Thread, earliest_suspended_until: i64) {
    PRE_SELECTED_EARLIEST_SUSPENDED_UNTIL.store(earliest_suspended_until);
    PRE_SELECTED_NEXT_TO_RUN.store(next as *const Thread as *mut Thread, Ordering::Release);
}

/// Start scheduling.
///
/// Registers the idle thread, freezes the registry, primes every saved
/// context, programs the first tick and runs the first schedule pass. On
/// hardware ports control never returns here; the hosted port falls
/// through after the first logical switch.
pub fn start() {
    if STARTED.swap(true, Ordering::AcqRel) {
        log::error!("scheduler started twice; ignoring");
        return;
    }

    if let Err(error) = registry::register(registry::idle_thread()) {
        log::error!("cannot register the idle thread: {}", error);
        return;
    }
    registry::freeze();

    log::info!("threads in system:");
    for thread in registry::iter() {
        log::info!(
            "  prio = {:7} stack = {:6} {}",
            thread.priority(),
            thread.stack_size(),
            thread.name(),
        );
        thread.prime_context();
        thread.suspended_until.store(0);
    }

    Timer::set_interval_us(MIN_SYS_TICK_SPACING / MICROSECONDS);
    unsafe { schedule() };
}

/// Entry point for the port's timer interrupt handler.
///
/// Decides whether this tick needs a full schedule pass: not while a
/// yield holds the scheduling lock, and not before the published
/// try-again instant. Otherwise the port saves the interrupted context
/// and enters [`schedule`].
pub fn on_system_tick() {
    if YIELD_SCHEDULING_LOCK.load(Ordering::Acquire) {
        return;
    }
    if time::now() < TIME_TO_TRY_AGAIN_TO_SCHEDULE.load_from_isr() {
        return;
    }
    unsafe { DefaultArch::save_context_and_call_scheduler() };
}

/// One schedule pass: select, commit, reprogram, switch.
///
/// # Safety
///
/// The interrupted thread's context must already be saved (by the tick
/// ISR's prologue or by the yield slow path); this function hands the CPU
/// to whichever thread it selects.
pub unsafe fn schedule() {
    SCHEDULE_COUNTER.fetch_add(1, Ordering::Relaxed);

    if let Some(current) = current_thread() {
        current.check_stack_violations();
    }

    // Reuse a yield's pre-pass when one was published; it is only
    // published when no tick invalidated it.
    let preselected = PRE_SELECTED_NEXT_TO_RUN.swap(ptr::null_mut(), Ordering::AcqRel);
    let (next_to_run, earliest_suspended_until) = if preselected.is_null() {
        registry::find_next_to_run_from_isr()
    } else {
        let earliest = PRE_SELECTED_EARLIEST_SUSPENDED_UNTIL.load_from_isr();
        PRE_SELECTED_EARLIEST_SUSPENDED_UNTIL.store_from_isr(END_OF_TIME);
        (unsafe { &*preselected }, earliest)
    };

    TIME_TO_TRY_AGAIN_TO_SCHEDULE.store_from_isr(earliest_suspended_until);
    next_to_run.last_activation.store_from_isr(time::now());

    Timer::update_trigger_to_next_timing_event();

    unsafe { activate(next_to_run) };
}

/// Commit `next` as the running thread and resume it.
///
/// The yield scheduling lock is released only here, just before the timer
/// restarts, because some ports cannot stop the timer at all.
unsafe fn activate(next: &'static Thread) {
    set_current_thread(next);
    YIELD_SCHEDULING_LOCK.store(false, Ordering::Release);
    Timer::start();
    unsafe { DefaultArch::switch_to_context(next.context_ptr()) };
}

#[cfg(test)]
pub(crate) fn set_time_to_try_again_for_testing(instant: i64) {
    TIME_TO_TRY_AGAIN_TO_SCHEDULE.store(instant);
}

#[cfg(test)]
pub(crate) fn reset_for_testing() {
    SCHEDULE_COUNTER.store(0, Ordering::Relaxed);
    CURRENT_THREAD.store(ptr::null_mut(), Ordering::Release);
    PRE_SELECTED_NEXT_TO_RUN.store(ptr::null_mut(), Ordering::Release);
    PRE_SELECTED_EARLIEST_SUSPENDED_UNTIL.store(END_OF_TIME);
    TIME_TO_TRY_AGAIN_TO_SCHEDULE.store(0);
    YIELD_SCHEDULING_LOCK.store(false, Ordering::Release);
    STARTED.store(false, Ordering::Release);
}
