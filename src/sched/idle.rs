//! The idle thread and the sleep-on-idle policy.

use portable_atomic::{AtomicU64, Ordering};

use crate::arch::{Arch, DefaultArch};
use crate::config::IDLE_PRIORITY;
use crate::thread;

#[cfg(feature = "sleep-when-idle")]
use crate::config::{MIN_SYS_TICK_SPACING, TIME_WAKEUP_FROM_SLEEP};
#[cfg(feature = "sleep-when-idle")]
use crate::time::{self, Timer, MICROSECONDS};

static IDLE_COUNT: AtomicU64 = AtomicU64::new(0);

/// How many iterations the idle loop has completed.
pub fn idle_count() -> u64 {
    IDLE_COUNT.load(Ordering::Relaxed)
}

/// Entry function of the idle thread: runs when nobody else wants to.
pub(crate) fn idle_main() {
    loop {
        IDLE_COUNT.fetch_add(1, Ordering::Relaxed);
        if let Some(current) = crate::sched::current_thread() {
            // Reclamp: a misused ceiling scope once left idle at the
            // highest priority in the system.
            current.set_priority(IDLE_PRIORITY);
        }
        DefaultArch::partition_yield();
        thread::yield_now();

        #[cfg(feature = "sleep-when-idle")]
        sleep_until_next_deadline();
    }
}

/// Program a timer wake and enter the deepest sleep mode, if the gap to
/// the next deadline is wide enough to be worth it.
///
/// The wake is programmed `TIME_WAKEUP_FROM_SLEEP + MIN_SYS_TICK_SPACING`
/// ahead of the deadline to absorb the cold-start latency; sleeping
/// across a narrower gap would risk missing the deadline by up to two
/// tick spacings. After the wake the timer is reprogrammed to the
/// remaining interval, floored to the tick spacing.
#[cfg(feature = "sleep-when-idle")]
pub(crate) fn sleep_until_next_deadline() {
    #[cfg(feature = "timeevents")]
    let reactivation_time = time::earlier(
        crate::sched::time_to_try_again_to_schedule(),
        crate::time::events::next_trigger_time(),
    );
    #[cfg(not(feature = "timeevents"))]
    let reactivation_time = crate::sched::time_to_try_again_to_schedule();

    let duration_to_next_timing_event = reactivation_time - time::now();
    let timer_interval =
        duration_to_next_timing_event - TIME_WAKEUP_FROM_SLEEP - MIN_SYS_TICK_SPACING;
    if timer_interval > TIME_WAKEUP_FROM_SLEEP && timer_interval > MIN_SYS_TICK_SPACING {
        Timer::stop();
        Timer::set_interval_us(timer_interval / MICROSECONDS);
        Timer::start();

        DefaultArch::enter_sleep_mode();

        Timer::stop();
        let remaining_time = (reactivation_time - time::now()).max(MIN_SYS_TICK_SPACING);
        Timer::set_interval_us(remaining_time / MICROSECONDS);
        Timer::start();
    }
}
