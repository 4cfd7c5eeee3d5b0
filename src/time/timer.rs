//! The logical system timer.
//!
//! One hardware one-shot drives all preemption. The scheduler never
//! programs the device directly; it goes through this facade, and the
//! interval is always clamped up to `MIN_SYS_TICK_SPACING` so that a
//! cluster of imminent deadlines cannot turn into an interrupt storm.

use crate::arch::{Arch, DefaultArch};
use crate::config::MIN_SYS_TICK_SPACING;
use crate::time::{self, MICROSECONDS};

#[cfg(feature = "timeevents")]
use crate::time::events;

/// Facade over the port's one-shot timer.
pub struct Timer;

impl Timer {
    /// Start (or restart) the timer with the last programmed interval.
    #[inline]
    pub fn start() {
        DefaultArch::timer_start();
    }

    /// Stop the timer. Not atomic on every port; callers that must not
    /// race the tick ISR hold the yield scheduling lock across this.
    #[inline]
    pub fn stop() {
        DefaultArch::timer_stop();
    }

    /// Program the one-shot interval, in microseconds.
    #[inline]
    pub fn set_interval_us(microseconds: i64) {
        DefaultArch::timer_set_interval_us(microseconds);
    }

    /// Reprogram the timer to the next instant that needs the scheduler.
    ///
    /// Takes the earlier of the next scheduling instant (published by the
    /// last selection pass) and the next time-event trigger. A trigger
    /// already in the past is propagated to "now" first, then the interval
    /// is floored to `MIN_SYS_TICK_SPACING` and converted to microseconds
    /// for the hardware counter.
    pub fn update_trigger_to_next_timing_event() {
        #[cfg(feature = "timeevents")]
        let reactivation_time = {
            let next_trigger_time = events::next_trigger_time();
            let time_now = time::now();
            if next_trigger_time < time_now {
                events::propagate(time_now);
            }
            time::earlier(crate::sched::time_to_try_again_to_schedule(), next_trigger_time)
        };

        #[cfg(not(feature = "timeevents"))]
        let reactivation_time = crate::sched::time_to_try_again_to_schedule();

        let interval_nanos = (reactivation_time - time::now()).max(MIN_SYS_TICK_SPACING);
        Self::set_interval_us(interval_nanos / MICROSECONDS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::host;
    use crate::tests::helpers::TestEnvironment;
    use crate::time::{END_OF_TIME, MILLISECONDS};

    #[test]
    fn interval_is_floored_to_the_tick_spacing() {
        let _env = TestEnvironment::new();

        // Next scheduling instant already passed: still no interrupt storm.
        crate::sched::set_time_to_try_again_for_testing(host::current_time() - MILLISECONDS);
        Timer::update_trigger_to_next_timing_event();
        assert_eq!(host::last_timer_interval_us(), MIN_SYS_TICK_SPACING / MICROSECONDS);
    }

    #[test]
    fn interval_tracks_the_next_scheduling_instant() {
        let _env = TestEnvironment::new();

        crate::sched::set_time_to_try_again_for_testing(host::current_time() + 4 * MILLISECONDS);
        Timer::update_trigger_to_next_timing_event();
        assert_eq!(host::last_timer_interval_us(), 4 * MILLISECONDS / MICROSECONDS);
    }

    #[test]
    fn idle_system_programs_the_longest_interval() {
        let _env = TestEnvironment::new();

        crate::sched::set_time_to_try_again_for_testing(END_OF_TIME);
        Timer::update_trigger_to_next_timing_event();
        let expected = (END_OF_TIME - host::current_time()) / MICROSECONDS;
        assert_eq!(host::last_timer_interval_us(), expected);
    }
}
