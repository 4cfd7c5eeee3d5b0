//! Threads: the control block, the suspension protocol and yield.
//!
//! Threads are declared before the scheduler starts and never destroyed.
//! Each owns a painted stack and a saved machine context; eligibility is
//! carried entirely by `suspended_until` (a thread is runnable once that
//! instant lies in the past). The suspension protocol and the optimized
//! yield live here; the selection pass itself is in [`registry`] and the
//! commit in [`crate::sched`].

pub mod builder;
pub mod registry;
pub mod stack;

pub use builder::ThreadBuilder;
pub use stack::Stack;

use portable_atomic::{AtomicI32, AtomicUsize, Ordering};
use spin::Mutex;

use crate::arch::{Arch, DefaultArch};
use crate::cell::InterruptCell64;
use crate::config::STACK_MARGIN;
use crate::errors::KernelResult;
use crate::sched;
use crate::time::{Timer, END_OF_TIME};

type SavedContext = <DefaultArch as Arch>::SavedContext;

const NO_SIGNALER: usize = 0;

/// Opaque identity of a synchronization object.
///
/// The scheduler never looks inside a signaler; it is only an equality key
/// that rendezvouses suspended threads with directed wakeups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signaler(usize);

impl Signaler {
    /// Signaler identifying `object` by its address.
    pub fn of<T>(object: &T) -> Self {
        Self(object as *const T as usize)
    }

    pub(crate) fn token(self) -> usize {
        self.0
    }
}

/// A schedulable thread: its control block.
pub struct Thread {
    name: &'static str,
    priority: AtomicI32,
    stack: Stack,
    context: Mutex<SavedContext>,
    entry: fn(),
    /// Instant until which the thread is ineligible; `0` means runnable,
    /// `END_OF_TIME` means parked until an explicit resume.
    pub(crate) suspended_until: InterruptCell64,
    /// Instant the scheduler last activated this thread. Tie-breaker among
    /// equal priorities: least recently run wins.
    pub(crate) last_activation: InterruptCell64,
    /// Signaler token the thread is suspended on, or `NO_SIGNALER`.
    pub(crate) waiting_for: AtomicUsize,
}

impl Thread {
    /// Create a thread with a freshly painted stack.
    ///
    /// The thread is not yet known to the scheduler; register it with
    /// [`registry::register`] (or use [`ThreadBuilder`], which does both).
    pub fn new(
        name: &'static str,
        priority: i32,
        stack_size: usize,
        entry: fn(),
    ) -> KernelResult<Self> {
        let stack = Stack::with_size(stack_size)?;
        Ok(Self {
            name,
            priority: AtomicI32::new(priority),
            stack,
            context: Mutex::new(SavedContext::default()),
            entry,
            suspended_until: InterruptCell64::new(0),
            last_activation: InterruptCell64::new(0),
            waiting_for: AtomicUsize::new(NO_SIGNALER),
        })
    }

    /// The thread's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current priority. Higher values are more eligible.
    pub fn priority(&self) -> i32 {
        self.priority.load(Ordering::Relaxed)
    }

    /// Change the thread's priority.
    ///
    /// Legal from thread context only; ISRs never mutate priorities.
    pub fn set_priority(&self, priority: i32) {
        self.priority.store(priority, Ordering::Relaxed);
    }

    /// Stack size in bytes.
    pub fn stack_size(&self) -> usize {
        self.stack.size()
    }

    /// Deepest stack usage observed so far, in bytes.
    pub fn max_stack_usage(&self) -> usize {
        self.stack.max_usage()
    }

    /// Make the thread immediately eligible again.
    ///
    /// Clears `waiting_for`, zeroes `suspended_until` and forces the next
    /// timer interrupt to re-run selection. Safe from thread and interrupt
    /// context; deliberately does not call the scheduler itself, so an ISR
    /// may use it freely.
    pub fn resume(&self) {
        sched::reset_time_to_try_again();
        self.waiting_for.store(NO_SIGNALER, Ordering::Relaxed);
        self.suspended_until.store(0);
    }

    #[cfg(test)]
    pub(crate) fn stack(&self) -> &Stack {
        &self.stack
    }

    pub(crate) fn waiting_for_token(&self) -> usize {
        self.waiting_for.load(Ordering::Relaxed)
    }

    /// Pointer to the saved context, for the port's switch primitives.
    ///
    /// The control block is `'static` once registered, so the pointer
    /// stays valid; the port only dereferences it while the thread is not
    /// running.
    pub(crate) fn context_ptr(&self) -> *mut SavedContext {
        let guard = self.context.lock();
        &*guard as *const SavedContext as *mut SavedContext
    }

    /// Prime the saved context so the first switch lands in the startup
    /// trampoline. Called once per thread, before scheduling starts.
    pub(crate) fn prime_context(&'static self) {
        let context =
            unsafe { DefaultArch::init_context(self.stack.top(), self as *const Thread) };
        *self.context.lock() = context;
    }

    /// Stack-guard checks run at every schedule boundary.
    ///
    /// A violated thread is reported and parked at `END_OF_TIME`;
    /// scheduling continues with the remaining threads.
    pub(crate) fn check_stack_violations(&self) -> bool {
        let stack_addr = DefaultArch::current_stack_addr();
        let minimum = self.stack.begin() as usize + STACK_MARGIN;
        if stack_addr < minimum {
            log::error!(
                "stack overflow in {}: {} bytes free, thread deactivated",
                self.name,
                stack_addr.saturating_sub(self.stack.begin() as usize),
            );
            self.suspended_until.store(END_OF_TIME);
            return true;
        }
        if !self.stack.canary_intact() {
            log::error!("{} ran beyond its stack, thread deactivated", self.name);
            self.suspended_until.store(END_OF_TIME);
            return true;
        }
        false
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        // The thread set is fixed for the life of the system; reaching a
        // destructor at runtime means something tore down a live TCB.
        log::error!("thread {} destroyed at runtime; thread removal is not supported", self.name);
    }
}

impl core::fmt::Debug for Thread {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Thread")
            .field("name", &self.name)
            .field("priority", &self.priority())
            .field("suspended_until", &self.suspended_until.load())
            .finish()
    }
}

unsafe impl Send for Thread {}
unsafe impl Sync for Thread {}

/// Voluntarily relinquish the CPU.
///
/// The fast paths avoid the context switch entirely: if a timer-driven
/// schedule raced the pre-pass the yield already happened, and if the
/// selector would pick the caller again nobody else wants the CPU. Only
/// when another thread is waiting does the slow path stop the timer,
/// publish the pre-computed selection for reuse and enter the scheduler.
pub fn yield_now() {
    let current = match sched::current_thread() {
        Some(thread) => thread,
        None => return,
    };

    // An unplanned schedule is wanted: drop the precalculated instant so
    // any tick that sneaks in runs the full pass.
    sched::reset_time_to_try_again();
    let start_counter = sched::schedule_counter();

    let (preselection, earliest_suspended_until) = registry::find_next_to_run();

    // A tick fired during the pre-pass: the selection is stale, but the
    // schedule it ran already covered this yield.
    if sched::schedule_counter() != start_counter {
        return;
    }

    // No other thread wants to take over: skip the context switch.
    if core::ptr::eq(preselection, current) {
        return;
    }

    // Timer::stop is not atomic on every port, so ticks arriving inside
    // the window must abort before reaching the selector. The lock is held
    // until the next activation because some ports cannot stop at all.
    sched::lock_yield_scheduling();
    Timer::stop();

    // Unchanged counter: the pre-pass is consistent with the schedule that
    // is about to commit and can be reused wholesale.
    if sched::schedule_counter() == start_counter {
        sched::publish_preselection(preselection, earliest_suspended_until);
    }

    unsafe { DefaultArch::save_context_and_call_scheduler() };
}

/// Suspend the calling thread until `reactivation_time`, optionally
/// waiting on `signaler`.
///
/// Returns `true` when the wakeup came from an explicit [`Thread::resume`]
/// and `false` when the deadline elapsed. Callable from thread context
/// only.
///
/// The two-field update is done under a priority-ceiling scope so that no
/// competing thread can observe `waiting_for` without `suspended_until`,
/// without masking interrupts.
pub fn suspend_caller_until(reactivation_time: i64, signaler: Option<Signaler>) -> bool {
    let caller = match sched::current_thread() {
        Some(thread) => thread,
        None => return false,
    };

    {
        let _ceiling = crate::sync::PriorityCeilingGuard::enter();
        caller.waiting_for.store(
            signaler.map(Signaler::token).unwrap_or(NO_SIGNALER),
            Ordering::Relaxed,
        );
        caller.suspended_until.store(reactivation_time);
    }
    yield_now();

    caller.waiting_for.store(NO_SIGNALER, Ordering::Relaxed);
    // Resumed (suspended_until reset to 0) or deadline reached?
    caller.suspended_until.load() == 0
}

/// Deepest stack usage of the calling thread, in bytes.
pub fn max_stack_usage() -> usize {
    sched::current_thread().map(Thread::max_stack_usage).unwrap_or(0)
}

/// First code every thread runs.
///
/// Ports prime fresh contexts so the first switch lands here with the
/// owning control block as argument. When the entry function returns the
/// thread retires: parked at `END_OF_TIME`, yielding forever.
///
/// # Safety
///
/// Only reachable through a context primed by [`Arch::init_context`];
/// `thread` must be the registered control block that context belongs to.
pub unsafe extern "C" fn thread_startup(thread: *const Thread) {
    let thread = unsafe { &*thread };
    sched::set_current_thread(thread);
    thread.suspended_until.store(0);

    (thread.entry)();

    loop {
        thread.suspended_until.store(END_OF_TIME);
        yield_now();
    }
}

/// Highest-priority thread suspended on `signaler`, ties broken by oldest
/// activation. `None` when nothing waits on it.
///
/// This is the rendezvous primitive semaphores and mailboxes build on.
pub fn find_next_waiting_for(signaler: Signaler) -> Option<&'static Thread> {
    let mut next_waiter: Option<&'static Thread> = None;
    for thread in registry::iter() {
        if thread.waiting_for_token() != signaler.token() {
            continue;
        }
        next_waiter = match next_waiter {
            None => Some(thread),
            Some(best) if thread.priority() > best.priority() => Some(thread),
            Some(best)
                if thread.priority() == best.priority()
                    && thread.last_activation.load() < best.last_activation.load() =>
            {
                Some(thread)
            }
            keep => keep,
        };
    }
    next_waiter
}
