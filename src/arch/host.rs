//! Hosted simulator port.
//!
//! Runs the scheduling core as ordinary host code: the clock is a mock
//! that tests (or a simulator driver) advance explicitly, the one-shot
//! timer is a recorded register pair, and context switches are logical
//! only: the current-thread commit happens, execution simply continues in
//! the caller. That is enough to exercise every selection, suspension and
//! timer-reprogramming path deterministically.

use portable_atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use spin::Mutex;

use super::Arch;
use crate::thread::Thread;
use crate::time::MILLISECONDS;

static MOCK_NOW: AtomicI64 = AtomicI64::new(MILLISECONDS);
static TIMER_RUNNING: AtomicBool = AtomicBool::new(false);
static TIMER_INTERVAL_US: AtomicI64 = AtomicI64::new(0);
static INTERRUPTS_ENABLED: AtomicBool = AtomicBool::new(true);
static SLEEP_COUNT: AtomicU64 = AtomicU64::new(0);

/// One-shot hook run when the core would save context and schedule.
///
/// Simulates work other threads do while the caller is switched out, e.g.
/// a resume racing a suspension. Consumed on first use.
static SCHEDULE_HOOK: Mutex<Option<fn()>> = Mutex::new(None);

/// The hosted simulator port.
pub struct HostArch;

impl Arch for HostArch {
    type SavedContext = ();

    unsafe fn init_context(_stack_top: *mut u8, _thread: *const Thread) -> Self::SavedContext {}

    unsafe fn save_context_and_call_scheduler() {
        let hook = SCHEDULE_HOOK.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        unsafe { crate::sched::schedule() };
    }

    unsafe fn switch_to_context(_context: *const Self::SavedContext) {
        // Logical switch only: the current-thread commit already happened.
    }

    fn current_stack_addr() -> usize {
        // The host stack is unrelated to the painted thread stacks, so the
        // margin check must always pass here; the canary check stays real.
        usize::MAX
    }

    fn enable_interrupts() {
        INTERRUPTS_ENABLED.store(true, Ordering::Release);
    }

    fn disable_interrupts() {
        INTERRUPTS_ENABLED.store(false, Ordering::Release);
    }

    fn interrupts_enabled() -> bool {
        INTERRUPTS_ENABLED.load(Ordering::Acquire)
    }

    fn timer_start() {
        TIMER_RUNNING.store(true, Ordering::Release);
    }

    fn timer_stop() {
        TIMER_RUNNING.store(false, Ordering::Release);
    }

    fn timer_set_interval_us(microseconds: i64) {
        TIMER_INTERVAL_US.store(microseconds, Ordering::Release);
    }

    fn now_nanos() -> i64 {
        MOCK_NOW.load(Ordering::Acquire)
    }

    fn enter_sleep_mode() {
        SLEEP_COUNT.fetch_add(1, Ordering::AcqRel);
        // The simulated sleep lasts until the programmed timer wake.
        let interval_us = TIMER_INTERVAL_US.load(Ordering::Acquire);
        MOCK_NOW.fetch_add(interval_us * 1_000, Ordering::AcqRel);
    }

    #[cfg(feature = "std-shim")]
    fn partition_yield() {
        std::thread::yield_now();
    }
}

/// Set the mock clock to an absolute instant, in nanoseconds.
pub fn set_time(nanos: i64) {
    MOCK_NOW.store(nanos, Ordering::Release);
}

/// Advance the mock clock.
pub fn advance_time(nanos: i64) {
    MOCK_NOW.fetch_add(nanos, Ordering::AcqRel);
}

/// Current mock time, in nanoseconds.
pub fn current_time() -> i64 {
    MOCK_NOW.load(Ordering::Acquire)
}

/// Last interval programmed into the recorded one-shot, in microseconds.
pub fn last_timer_interval_us() -> i64 {
    TIMER_INTERVAL_US.load(Ordering::Acquire)
}

/// Whether the recorded one-shot is running.
pub fn timer_running() -> bool {
    TIMER_RUNNING.load(Ordering::Acquire)
}

/// How many times the deepest sleep mode was entered.
pub fn sleep_count() -> u64 {
    SLEEP_COUNT.load(Ordering::Acquire)
}

/// Install a one-shot hook run at the next save-context-and-schedule.
pub fn set_schedule_hook(hook: fn()) {
    *SCHEDULE_HOOK.lock() = Some(hook);
}

/// Reset every recorded device to its power-on state. Test support.
pub fn reset() {
    MOCK_NOW.store(MILLISECONDS, Ordering::Release);
    TIMER_RUNNING.store(false, Ordering::Release);
    TIMER_INTERVAL_US.store(0, Ordering::Release);
    INTERRUPTS_ENABLED.store(true, Ordering::Release);
    SLEEP_COUNT.store(0, Ordering::Release);
    *SCHEDULE_HOOK.lock() = None;
}
