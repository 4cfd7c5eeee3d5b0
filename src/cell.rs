//! Interrupt-safe 64-bit storage cells.
//!
//! Scheduler bookkeeping (`suspended_until`, `last_activation`, the next
//! try-again instant) is 64-bit and is read and written from both thread
//! and interrupt context. On targets with native 64-bit atomics the four
//! accessors below compile to plain relaxed loads and stores; on targets
//! without, `portable-atomic`'s fallback wraps each access in a brief
//! interrupt-masked critical section, which is exactly the behavior an ISR
//! is allowed to re-enter.

use portable_atomic::{AtomicI64, Ordering};

/// A 64-bit cell that is safe to access from threads and from ISRs.
///
/// The `_from_isr` accessors exist so call sites document which context
/// they run in; on native-64-bit targets they are the same operation as
/// the thread-context ones.
#[derive(Debug)]
pub struct InterruptCell64 {
    value: AtomicI64,
}

impl InterruptCell64 {
    /// Create a cell holding `value`.
    pub const fn new(value: i64) -> Self {
        Self { value: AtomicI64::new(value) }
    }

    /// Load from thread context.
    #[inline]
    pub fn load(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Store from thread context.
    #[inline]
    pub fn store(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Load from interrupt context.
    #[inline]
    pub fn load_from_isr(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Store from interrupt context.
    #[inline]
    pub fn store_from_isr(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }
}

impl Default for InterruptCell64 {
    fn default() -> Self {
        Self::new(0)
    }
}
