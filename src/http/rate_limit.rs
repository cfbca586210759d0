use std::thread;
use std::time::{Duration, Instant};

/// Keeps successive requests of one scan at least `1 / rate` seconds apart.
pub struct RateLimiter {
    interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    /// rate = requests per second; zero or negative disables the delay
    pub fn new(rate: f64) -> Self {
        let interval = if rate > 0.0 && rate.is_finite() {
            Duration::from_secs_f64(1.0 / rate)
        } else {
            Duration::ZERO
        };

        Self {
            interval,
            last_request: None,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(0.0)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn wait(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                thread::sleep(self.interval - elapsed);
            }
        }

        self.last_request = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(1.0)
    }
}
