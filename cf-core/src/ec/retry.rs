//! Bounded spin-wait
//!
//! Every handshake step polls the EC status port a fixed number of times with
//! a fixed delay in between. The policy lives here once instead of in each step.

use std::time::Duration;

use crate::constants::protocol;

/// Fixed attempt budget with a fixed pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self { max_attempts, interval }
    }

    /// The EC handshake budget: 100 polls, ~1µs apart
    pub const fn ec_handshake() -> Self {
        Self::new(protocol::MAX_POLLS, Duration::from_micros(protocol::POLL_INTERVAL_MICROS))
    }

    /// Run `attempt` until it returns `Ok` or the budget is spent
    ///
    /// Returns the last `Err` on exhaustion. There is no pause after the final
    /// attempt. A zero budget still runs the attempt once.
    pub fn run<T, E>(&self, mut attempt: impl FnMut() -> Result<T, E>) -> Result<T, E> {
        let attempts = self.max_attempts.max(1);
        let mut tried = 0;
        loop {
            match attempt() {
                Ok(v) => return Ok(v),
                Err(e) => {
                    tried += 1;
                    if tried >= attempts {
                        return Err(e);
                    }
                }
            }
            if !self.interval.is_zero() {
                std::thread::sleep(self.interval);
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::ec_handshake()
    }
}
