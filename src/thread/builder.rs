//! Builder-style thread declaration.

use alloc::boxed::Box;

use super::{registry, Thread};
use crate::config::{DEFAULT_PRIORITY, DEFAULT_STACK_SIZE};
use crate::errors::{KernelResult, RegistryError};

/// Configure and register a thread before the scheduler starts.
///
/// ```ignore
/// use nanokern::ThreadBuilder;
///
/// let worker = ThreadBuilder::new()
///     .name("telemetry")
///     .priority(50)
///     .stack_size(8 * 1024)
///     .spawn(telemetry_main)?;
/// ```
#[derive(Debug, Clone)]
pub struct ThreadBuilder {
    name: &'static str,
    priority: i32,
    stack_size: usize,
}

impl ThreadBuilder {
    pub fn new() -> Self {
        Self {
            name: "thread",
            priority: DEFAULT_PRIORITY,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }

    /// Name used in diagnostics and the startup table.
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Scheduling priority; higher values are more eligible.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Stack size in bytes.
    pub fn stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    /// Create the thread, pin its control block for the life of the
    /// system and register it with the scheduler.
    pub fn spawn(self, entry: fn()) -> KernelResult<&'static Thread> {
        if registry::is_frozen() {
            return Err(RegistryError::AlreadyStarted.into());
        }
        let thread = Thread::new(self.name, self.priority, self.stack_size, entry)?;
        let thread: &'static Thread = Box::leak(Box::new(thread));
        registry::register(thread)?;
        Ok(thread)
    }
}

impl Default for ThreadBuilder {
    fn default() -> Self {
        Self::new()
    }
}
