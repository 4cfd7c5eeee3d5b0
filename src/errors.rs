//! Error types for the scheduling core.
//!
//! The kernel never unwinds: everything that can fail does so before
//! scheduling starts (registration, stack allocation, startup ordering)
//! and reports through these types. Runtime faults such as stack overflow
//! are diagnosed and contained instead of propagated (see
//! `Thread::check_stack_violations`).

use core::fmt;

/// Result type for kernel setup operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Top-level error for kernel setup operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Thread registration errors
    Registry(RegistryError),
    /// Stack allocation errors
    Stack(StackError),
}

/// Errors that can occur while registering threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// The fixed TCB array is full (`config::MAX_THREADS` reached)
    Full,
    /// Registration attempted after `start()` froze the registry
    AlreadyStarted,
}

/// Errors that can occur while setting up a thread stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// The allocator could not provide the stack buffer
    OutOfMemory,
    /// Requested size cannot hold the overflow margin plus a call frame
    TooSmall(usize),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Registry(e) => write!(f, "thread registry error: {}", e),
            KernelError::Stack(e) => write!(f, "stack error: {}", e),
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Full => write!(f, "thread registry is full"),
            RegistryError::AlreadyStarted => {
                write!(f, "threads cannot be registered after the scheduler started")
            }
        }
    }
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackError::OutOfMemory => write!(f, "out of memory for stack allocation"),
            StackError::TooSmall(size) => write!(f, "stack size too small: {} bytes", size),
        }
    }
}

impl From<RegistryError> for KernelError {
    fn from(error: RegistryError) -> Self {
        KernelError::Registry(error)
    }
}

impl From<StackError> for KernelError {
    fn from(error: StackError) -> Self {
        KernelError::Stack(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn display_is_readable() {
        let e: KernelError = RegistryError::Full.into();
        assert_eq!(format!("{}", e), "thread registry error: thread registry is full");

        let e: KernelError = StackError::TooSmall(64).into();
        assert_eq!(format!("{}", e), "stack error: stack size too small: 64 bytes");
    }
}
