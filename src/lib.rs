#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![forbid(unreachable_pub)]

//! Priority-preemptive scheduling core for small real-time systems.
//!
//! This crate is the thread scheduler of a small RTOS: a fixed set of
//! statically declared threads, a single execution engine, a monotonic
//! nanosecond time base and a tickless one-shot timer that is always
//! programmed to the next instant anything can happen. Drivers,
//! middleware and board support live outside; the core talks to the
//! platform only through the [`arch::Arch`] port trait and to the
//! time-event registry through [`time::events::TimeEventSource`].
//!
//! # Scheduling model
//!
//! - Highest priority runnable thread wins; among equals the least
//!   recently activated thread runs, which round-robins without a queue.
//! - A thread is runnable while `suspended_until` lies in the past.
//!   [`suspend_caller_until`] parks the caller until a deadline or an
//!   explicit [`Thread::resume`]; [`time::END_OF_TIME`] parks forever.
//! - [`yield_now`] skips the context switch entirely when no other
//!   thread wants the CPU, detecting racing timer ticks by schedule
//!   counter instead of masking interrupts.
//! - The unique idle thread runs at priority 0 and, when allowed, puts
//!   the device into the deepest sleep compatible with the next wakeup.
//!
//! # Features
//!
//! - `std-shim` (default): hosted simulator port used by `cargo test`
//! - `timeevents` (default): consult the time-event registry when
//!   reprogramming the timer
//! - `sleep-when-idle` (default): sleep policy in the idle thread
//!
//! # Quick start
//!
//! ```ignore
//! use nanokern::ThreadBuilder;
//!
//! fn blink() {
//!     loop {
//!         // toggle a pin, then give the CPU away
//!         nanokern::yield_now();
//!     }
//! }
//!
//! fn main() {
//!     ThreadBuilder::new()
//!         .name("blink")
//!         .priority(100)
//!         .spawn(blink)
//!         .expect("thread registration failed");
//!
//!     nanokern::start(); // does not return on hardware ports
//! }
//! ```

pub mod arch;
pub mod cell;
pub mod config;
pub mod errors;
pub mod sched;
pub mod sync;
pub mod thread;
pub mod time;

#[cfg(test)]
mod tests;

extern crate alloc;

#[cfg(any(test, feature = "std-shim"))]
extern crate std;

// Panic handler for bare-metal builds; hosted builds use std's.
#[cfg(all(not(test), not(feature = "std-shim")))]
use core::panic::PanicInfo;

#[cfg(all(not(test), not(feature = "std-shim")))]
#[panic_handler]
fn panic(_info: &PanicInfo) -> ! {
    <arch::DefaultArch as arch::Arch>::disable_interrupts();
    loop {
        core::hint::spin_loop();
    }
}

// ============================================================================
// Public API
// ============================================================================

// Port abstraction
pub use arch::{Arch, DefaultArch};

// Scheduler
pub use sched::{current_thread, idle::idle_count, on_system_tick, schedule_counter, start};

// Threads and the suspension protocol
pub use thread::{
    find_next_waiting_for, max_stack_usage, suspend_caller_until, yield_now, Signaler, Thread,
    ThreadBuilder,
};

// Priority-ceiling scopes
pub use sync::PriorityCeilingGuard;

// Time base and timer
pub use time::{now, Timer, END_OF_TIME};

// Interrupt-safe storage
pub use cell::InterruptCell64;

// Errors
pub use errors::{KernelError, KernelResult, RegistryError, StackError};
