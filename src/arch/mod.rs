//! Port abstraction for context switching, the system timer and sleep.
//!
//! Everything the scheduling core needs from the hardware goes through
//! this trait: priming and switching saved contexts, the one-shot timer,
//! interrupt masking, the monotonic clock, and the sleep hooks. A port is
//! selected at compile time as `DefaultArch`; the hosted simulator port in
//! [`host`] is what `cargo test` and the `std-shim` feature use.

use crate::thread::Thread;

/// Port abstraction trait.
///
/// # Safety
///
/// Implementations manipulate raw machine state. The unsafe methods have
/// preconditions the scheduling core upholds: contexts are primed before
/// they are switched to, and the save-and-schedule entry point is only
/// reached from thread context or from the tick ISR's prologue.
pub trait Arch {
    /// Saved machine context of one thread. Must contain everything needed
    /// to resume the thread where it left off.
    type SavedContext: Send + Sync + Default;

    /// Prime a fresh context so that the first switch to it lands in
    /// [`crate::thread::thread_startup`] with `thread` as its argument.
    ///
    /// # Safety
    ///
    /// `stack_top` must be the aligned top of a live stack owned by
    /// `thread`, and `thread` must stay valid for the life of the system.
    unsafe fn init_context(stack_top: *mut u8, thread: *const Thread) -> Self::SavedContext;

    /// Save the live context into the current thread's slot and enter the
    /// scheduler. On hardware this never returns directly; the thread
    /// continues, later, via [`Arch::switch_to_context`].
    ///
    /// # Safety
    ///
    /// A current thread must be committed, and its context slot must be
    /// writable (not concurrently switched to).
    unsafe fn save_context_and_call_scheduler();

    /// Restore `context` and resume the thread it belongs to. On hardware
    /// this does not return; the hosted port treats the switch as purely
    /// logical and falls through.
    ///
    /// # Safety
    ///
    /// `context` must point to a primed or previously saved context whose
    /// thread is alive.
    unsafe fn switch_to_context(context: *const Self::SavedContext);

    /// Current stack pointer, for the stack-margin check.
    fn current_stack_addr() -> usize;

    /// Enable interrupt delivery on the execution engine.
    fn enable_interrupts();

    /// Disable interrupt delivery on the execution engine.
    fn disable_interrupts();

    /// Whether interrupts are currently deliverable.
    fn interrupts_enabled() -> bool;

    /// Start (or restart) the one-shot system timer.
    fn timer_start();

    /// Stop the one-shot system timer. May be non-atomic; the core guards
    /// the racy window with the yield scheduling lock.
    fn timer_stop();

    /// Program the one-shot interval in microseconds.
    fn timer_set_interval_us(microseconds: i64);

    /// Monotonic nanoseconds since an implementation-defined epoch.
    fn now_nanos() -> i64;

    /// Enter the deepest sleep mode compatible with the programmed timer
    /// wake source. Returns when the core is woken.
    fn enter_sleep_mode();

    /// Yield the whole partition to an outer scheduler: the host process
    /// scheduler on the simulator, a partition scheduler on partitioned
    /// targets. Bare metal keeps the default no-op.
    fn partition_yield() {}
}

#[cfg(any(test, feature = "std-shim"))]
pub mod host;

#[cfg(any(test, feature = "std-shim"))]
pub use host::HostArch as DefaultArch;

#[cfg(not(any(test, feature = "std-shim")))]
compile_error!("no port selected for this target: implement `arch::Arch` for your hardware or enable the std-shim feature for hosted builds");
