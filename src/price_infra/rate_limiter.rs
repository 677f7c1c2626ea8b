use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Sliding-window request limiter for providers with hard per-minute quotas.
pub struct RateLimiter {
    max_per_interval: usize,
    interval: Duration,
    timestamps: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_per_interval: usize, interval: Duration) -> Self {
        RateLimiter {
            max_per_interval,
            interval,
            timestamps: VecDeque::with_capacity(max_per_interval),
        }
    }

    /// Records a call if the window has room. A limit of zero disables limiting.
    pub fn check_and_record(&mut self) -> bool {
        if self.max_per_interval == 0 {
            return true;
        }

        let now = Instant::now();

        while let Some(&front) = self.timestamps.front() {
            if now.duration_since(front) >= self.interval {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }

        if self.timestamps.len() >= self.max_per_interval {
            return false;
        }

        self.timestamps.push_back(now);
        true
    }
}
