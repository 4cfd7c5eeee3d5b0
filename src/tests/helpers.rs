//! Shared fixtures for tests that touch kernel globals.

use core::ptr;

use std::sync::{Mutex, MutexGuard};

use portable_atomic::{AtomicPtr, Ordering};

use crate::thread::{registry, Thread, ThreadBuilder};

/// The kernel is one set of globals per process, so tests that use it
/// cannot run concurrently.
static KERNEL_TEST_LOCK: Mutex<()> = Mutex::new(());

/// Serialized, freshly reset kernel world for one test.
///
/// Construct it first in every test that schedules, registers threads or
/// programs the recorded timer; the world is reset on entry and the lock
/// is held until the value drops.
pub(crate) struct TestEnvironment {
    _guard: MutexGuard<'static, ()>,
}

impl TestEnvironment {
    pub(crate) fn new() -> Self {
        let guard = KERNEL_TEST_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        crate::arch::host::reset();
        crate::sched::reset_for_testing();
        registry::reset_for_testing();
        #[cfg(feature = "timeevents")]
        crate::time::events::clear_time_event_source();
        RESUME_TARGET.store(ptr::null_mut(), Ordering::Release);

        Self { _guard: guard }
    }

    /// Spawn and register a no-op thread.
    pub(crate) fn spawn(&self, name: &'static str, priority: i32) -> &'static Thread {
        ThreadBuilder::new()
            .name(name)
            .priority(priority)
            .stack_size(2048)
            .spawn(noop_entry)
            .expect("test thread registration failed")
    }

    /// Commit `thread` as the running thread, as a schedule pass would.
    pub(crate) fn make_current(&self, thread: &'static Thread) {
        crate::sched::set_current_thread(thread);
    }
}

pub(crate) fn noop_entry() {}

/// Thread resumed by [`resume_target_hook`]. Schedule hooks are plain
/// function pointers, so the target travels through a static.
pub(crate) static RESUME_TARGET: AtomicPtr<Thread> = AtomicPtr::new(ptr::null_mut());

/// Schedule hook that resumes [`RESUME_TARGET`], simulating another
/// thread (or an ISR) signalling while the caller is switched out.
pub(crate) fn resume_target_hook() {
    let thread = RESUME_TARGET.load(Ordering::Acquire);
    if !thread.is_null() {
        unsafe { &*thread }.resume();
    }
}
