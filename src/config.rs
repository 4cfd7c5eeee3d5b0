//! Compile-time configuration for the scheduling core.
//!
//! All limits are fixed at compile time. Ports with different timer or
//! wakeup characteristics adjust the constants here; nothing is read from
//! the environment at runtime.

/// Shortest interval, in nanoseconds, the system timer may be programmed
/// to. Reprogramming always clamps up to this value so a burst of
/// near-simultaneous deadlines cannot degenerate into an interrupt storm.
pub const MIN_SYS_TICK_SPACING: i64 = 50_000;

/// Cold-start latency, in nanoseconds, of a wakeup from the deepest sleep
/// mode. The idle thread programs its wake this much (plus
/// `MIN_SYS_TICK_SPACING`) before the next deadline so the deadline is not
/// missed while the core is still powering back up.
pub const TIME_WAKEUP_FROM_SLEEP: i64 = 100_000;

/// Maximum number of threads the registry can hold, idle thread included.
/// This bounds the flat TCB array. Each thread also owns its stack, so
/// raising this raises the startup memory footprint.
pub const MAX_THREADS: usize = 32;

/// Bytes of headroom required between the current stack pointer and the
/// low end of the stack. A thread observed inside this margin at a
/// schedule boundary is treated as overflowed and permanently suspended.
pub const STACK_MARGIN: usize = 300;

/// Default stack size for threads spawned without an explicit size.
pub const DEFAULT_STACK_SIZE: usize = 16 * 1024;

/// Default priority for threads spawned without an explicit one.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Stack size of the idle thread. The idle loop has a shallow call chain;
/// it only needs room for the sleep-policy arithmetic and the port hooks.
pub const IDLE_STACK_SIZE: usize = 2 * 1024;

/// Priority of the idle thread. The idle thread re-clamps itself to this
/// value on every iteration; no user thread may permanently hold it.
pub const IDLE_PRIORITY: i32 = 0;

/// Priority a thread is raised to inside a priority-ceiling scope. Must be
/// at least as high as the highest-priority thread that can enter the same
/// scope; the maximum satisfies that for every scope in the system.
pub const PRIORITY_CEILING: i32 = i32::MAX;

/// Word value painted over every thread stack at construction. The word at
/// the low end of the stack doubles as the overflow canary.
pub const STACK_CANARY: u32 = 0xDEAD_BEEF;
