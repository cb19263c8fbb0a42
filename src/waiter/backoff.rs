use std::time::Duration;

/// Fibonacci backoff between status reads, capped at `max`.
///
/// With the defaults the delays are `1, 1, 2, 3, 5, 8, 13, 21, 30, 30, ...` seconds, without
/// jitter. This is configuration only; the poller does the sleeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FibonacciBackoff {
    initial: Duration,
    max: Duration,
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }
}

impl FibonacciBackoff {
    /// `max` is raised to `initial` if it is smaller.
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
        }
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Endless sequence of delays.
    pub fn delays(&self) -> FibonacciDelays {
        FibonacciDelays {
            previous: Duration::ZERO,
            current: self.initial,
            max: self.max,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FibonacciDelays {
    previous: Duration,
    current: Duration,
    max: Duration,
}

impl Iterator for FibonacciDelays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let delay = self.current.min(self.max);
        if self.current < self.max {
            let next = self.previous.saturating_add(self.current);
            self.previous = self.current;
            self.current = next;
        }
        Some(delay)
    }
}
