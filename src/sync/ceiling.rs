//! Scoped priority-ceiling sections.
//!
//! Instead of priority-inheritance mutexes, short critical sections raise
//! the caller's own priority to the system ceiling: no thread that could
//! compete on the same resource can preempt it inside the scope, and
//! interrupts stay enabled throughout. The previous priority is restored
//! on every exit path by `Drop`.

use crate::config::PRIORITY_CEILING;
use crate::sched;
use crate::thread::Thread;

/// RAII scope that raises the calling thread to the priority ceiling.
///
/// ```ignore
/// {
///     let _ceiling = PriorityCeilingGuard::enter();
///     // update fields that must appear atomic to other threads
/// } // previous priority restored here
/// ```
#[must_use = "the ceiling only holds while the guard is alive"]
pub struct PriorityCeilingGuard {
    thread: Option<&'static Thread>,
    previous_priority: i32,
}

impl PriorityCeilingGuard {
    /// Raise the calling thread to `PRIORITY_CEILING`.
    ///
    /// A no-op before scheduling starts (there is no caller to raise).
    pub fn enter() -> Self {
        match sched::current_thread() {
            Some(thread) => {
                let previous_priority = thread.priority();
                thread.set_priority(previous_priority.max(PRIORITY_CEILING));
                Self { thread: Some(thread), previous_priority }
            }
            None => Self { thread: None, previous_priority: 0 },
        }
    }
}

impl Drop for PriorityCeilingGuard {
    fn drop(&mut self) {
        if let Some(thread) = self.thread {
            thread.set_priority(self.previous_priority);
        }
    }
}
