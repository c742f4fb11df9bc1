use embedded_hal::delay::DelayNs;

use crate::config::PollPolicy;

/// Countdown for a bounded busy-wait.
///
/// ```ignore
/// let mut poller = Poller::new(policy);
/// while poller.tick(&mut delay) {
///     if ready()? { break; }
/// }
/// ```
#[derive(Debug)]
pub struct Poller {
    interval_us: u32,
    remaining: u16,
}

impl Poller {
    pub fn new(policy: PollPolicy) -> Self {
        Poller {
            interval_us: policy.interval_us,
            remaining: policy.attempts,
        }
    }

    /// Sleeps one interval and consumes an attempt. Returns `false` once the
    /// budget is spent, without sleeping.
    pub fn tick<D: DelayNs>(&mut self, delay: &mut D) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        if self.interval_us > 0 {
            delay.delay_us(self.interval_us);
        }
        true
    }

    pub fn remaining(&self) -> u16 {
        self.remaining
    }
}
