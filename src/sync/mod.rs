//! Synchronization support used inside the core.

pub mod ceiling;

pub use ceiling::PriorityCeilingGuard;
