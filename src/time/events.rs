//! Hook for the external time-event registry.
//!
//! The core does not own time events; it only needs to know when the next
//! one fires so the timer can be programmed to the earlier of "next
//! scheduling instant" and "next event trigger". The registry plugs in
//! here once during init.

use spin::RwLock;

use crate::time::END_OF_TIME;

/// The face the external time-event registry shows to the core.
pub trait TimeEventSource: Sync {
    /// Monotonic instant of the next pending trigger, or `END_OF_TIME`
    /// if nothing is scheduled.
    fn next_trigger_time(&self) -> i64;

    /// Fire every event whose trigger is at or before `now`. Called by the
    /// timer-reprogramming path when a trigger was found already in the
    /// past, so events that elapsed while interrupts were masked are not
    /// silently dropped.
    fn propagate(&self, now: i64);
}

static SOURCE: RwLock<Option<&'static dyn TimeEventSource>> = RwLock::new(None);

/// Register the time-event source. Expected once during system init,
/// before the scheduler starts; the last registration wins.
pub fn set_time_event_source(source: &'static dyn TimeEventSource) {
    *SOURCE.write() = Some(source);
}

/// Next pending trigger, or `END_OF_TIME` when no source is registered.
pub fn next_trigger_time() -> i64 {
    match *SOURCE.read() {
        Some(source) => source.next_trigger_time(),
        None => END_OF_TIME,
    }
}

/// Propagate elapsed events up to `now`. No-op without a source.
pub(crate) fn propagate(now: i64) {
    if let Some(source) = *SOURCE.read() {
        source.propagate(now);
    }
}

#[cfg(test)]
pub(crate) fn clear_time_event_source() {
    *SOURCE.write() = None;
}
