//! The process-wide thread registry and the selection passes.
//!
//! All declared threads live in one flat, fixed-capacity array with
//! stable indices; iteration is lock-free so both thread context and the
//! tick ISR can scan it. The registry is frozen when the scheduler
//! starts. The idle thread is a member like any other, and it is also the
//! selection default when nobody else is runnable.

use core::ptr;

use portable_atomic::{AtomicBool, AtomicPtr, AtomicUsize, Ordering};
use spin::Lazy;

use super::Thread;
use crate::config::{IDLE_PRIORITY, IDLE_STACK_SIZE, MAX_THREADS};
use crate::errors::RegistryError;
use crate::time::{self, END_OF_TIME};

static THREADS: [AtomicPtr<Thread>; MAX_THREADS] =
    [const { AtomicPtr::new(ptr::null_mut()) }; MAX_THREADS];
static LEN: AtomicUsize = AtomicUsize::new(0);
static FROZEN: AtomicBool = AtomicBool::new(false);

static IDLE_THREAD: Lazy<Thread> = Lazy::new(|| {
    Thread::new("idle", IDLE_PRIORITY, IDLE_STACK_SIZE, crate::sched::idle::idle_main)
        .expect("idle thread stack allocation failed at startup")
});

/// The designated idle thread.
pub fn idle_thread() -> &'static Thread {
    &IDLE_THREAD
}

/// Add a thread to the registry.
///
/// Only legal before the scheduler starts; the set of threads is fixed
/// from then on.
pub fn register(thread: &'static Thread) -> Result<(), RegistryError> {
    if FROZEN.load(Ordering::Acquire) {
        return Err(RegistryError::AlreadyStarted);
    }
    let index = LEN.fetch_add(1, Ordering::AcqRel);
    if index >= MAX_THREADS {
        LEN.fetch_sub(1, Ordering::AcqRel);
        return Err(RegistryError::Full);
    }
    THREADS[index].store(thread as *const Thread as *mut Thread, Ordering::Release);
    Ok(())
}

pub(crate) fn freeze() {
    FROZEN.store(true, Ordering::Release);
}

/// Whether the registry has been frozen by `start()`.
pub fn is_frozen() -> bool {
    FROZEN.load(Ordering::Acquire)
}

/// Number of registered threads.
pub fn len() -> usize {
    LEN.load(Ordering::Acquire).min(MAX_THREADS)
}

/// Iterate over all registered threads. Lock-free; safe from ISRs.
pub fn iter() -> impl Iterator<Item = &'static Thread> {
    (0..len()).filter_map(|index| {
        let thread = THREADS[index].load(Ordering::Acquire);
        // A slot may be claimed but not yet published during registration.
        if thread.is_null() {
            None
        } else {
            Some(unsafe { &*thread })
        }
    })
}

/// Thread-context selection pass.
///
/// Returns the highest-priority runnable thread (the idle thread when no
/// one else wants the CPU) together with the earliest future instant at
/// which a thread of equal or higher priority becomes runnable, i.e. the
/// next moment the scheduler must look again.
pub(crate) fn find_next_to_run() -> (&'static Thread, i64) {
    select::<false>()
}

/// ISR-context selection pass. Identical to [`find_next_to_run`] except
/// every 64-bit field is read through the ISR-safe accessors.
pub(crate) fn find_next_to_run_from_isr() -> (&'static Thread, i64) {
    select::<true>()
}

fn select<const FROM_ISR: bool>() -> (&'static Thread, i64) {
    let mut next_to_run = idle_thread();
    let mut earliest_suspended_until = END_OF_TIME;
    let time_now = time::now();

    for thread in iter() {
        // Snapshot once: an interrupt may store a new value mid-pass, and
        // the pass must see one consistent value per thread.
        let suspended_until = if FROM_ISR {
            thread.suspended_until.load_from_isr()
        } else {
            thread.suspended_until.load()
        };
        let priority = thread.priority();
        let best_priority = next_to_run.priority();

        if suspended_until < time_now {
            // Runnable. Higher priority wins; among equals the least
            // recently activated thread wins, which round-robins without
            // any queue.
            if priority > best_priority {
                next_to_run = thread;
            } else if priority == best_priority {
                let (candidate, best) = if FROM_ISR {
                    (thread.last_activation.load_from_isr(), next_to_run.last_activation.load_from_isr())
                } else {
                    (thread.last_activation.load(), next_to_run.last_activation.load())
                };
                if candidate < best {
                    next_to_run = thread;
                }
            }
        } else if priority >= best_priority {
            // Suspended into the future. Only equal-or-higher priorities
            // matter for the wakeup: anything lower would not preempt the
            // selected thread anyway.
            earliest_suspended_until = time::earlier(earliest_suspended_until, suspended_until);
        }
    }

    (next_to_run, earliest_suspended_until)
}

/// Reset the registry and the idle thread's bookkeeping. Test support.
#[cfg(test)]
pub(crate) fn reset_for_testing() {
    for slot in THREADS.iter() {
        slot.store(ptr::null_mut(), Ordering::Release);
    }
    LEN.store(0, Ordering::Release);
    FROZEN.store(false, Ordering::Release);

    let idle = idle_thread();
    idle.suspended_until.store(0);
    idle.last_activation.store(0);
    idle.waiting_for.store(0, Ordering::Relaxed);
    idle.set_priority(IDLE_PRIORITY);
}
