use std::{sync::Arc, time::Duration};

use tokio::time::Instant;
use tracing::trace;

use crate::utils::clock::Clock;

/// Cancellable periodic schedule. While armed [Ticker::tick] resolves once per period, while
/// disarmed it never resolves, so it can sit in a `select!` next to user input.
pub struct Ticker {
    period: Duration,
    next: Option<Instant>,
    clock: Arc<dyn Clock>,
}

impl Ticker {
    pub fn new(period: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            period,
            next: None,
            clock,
        }
    }

    /// Schedules the first tick one period after `now`.
    pub fn arm(&mut self, now: Instant) {
        trace!("Arming ticker");
        self.next = Some(now + self.period);
    }

    /// Disarms the schedule. Takes effect immediately, even for a pending [Ticker::tick].
    pub fn cancel(&mut self) {
        trace!("Cancelling ticker");
        self.next = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next.is_some()
    }

    /// Waits for the next tick and returns its deadline. Cancel safe: dropping the future before
    /// it resolves leaves the schedule untouched.
    pub async fn tick(&mut self) -> Instant {
        let Some(deadline) = self.next else {
            return std::future::pending().await;
        };
        self.clock.sleep_until(deadline).await;
        self.next = Some(self.following(deadline, self.clock.instant()));
        deadline
    }

    /// First deadline on the `deadline + k * period` grid that is still ahead of `now`. Ticks
    /// missed during a stall are skipped instead of firing back to back.
    fn following(&self, deadline: Instant, now: Instant) -> Instant {
        let next = deadline + self.period;
        if next > now || self.period.is_zero() {
            return next;
        }
        let missed = now.duration_since(next).as_nanos() / self.period.as_nanos() + 1;
        trace!("Skipping {missed} missed ticks");
        next + self.period * missed as u32
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::time::{advance, timeout, Instant};

    use crate::utils::clock::DefaultClock;

    use super::Ticker;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_period() {
        let mut ticker = Ticker::new(Duration::from_secs(1), Arc::new(DefaultClock));
        let start = Instant::now();
        ticker.arm(start);

        assert_eq!(ticker.tick().await, start + Duration::from_secs(1));
        assert_eq!(ticker.tick().await, start + Duration::from_secs(2));
        assert_eq!(ticker.tick().await, start + Duration::from_secs(3));
        assert_eq!(Instant::now(), start + Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_never_ticks() {
        let mut ticker = Ticker::new(Duration::from_secs(1), Arc::new(DefaultClock));
        assert!(timeout(Duration::from_secs(10), ticker.tick()).await.is_err());

        ticker.arm(Instant::now());
        ticker.cancel();
        assert!(!ticker.is_armed());
        assert!(timeout(Duration::from_secs(10), ticker.tick()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_tick_keeps_schedule() {
        let mut ticker = Ticker::new(Duration::from_secs(1), Arc::new(DefaultClock));
        let start = Instant::now();
        ticker.arm(start);

        assert!(timeout(Duration::from_millis(500), ticker.tick()).await.is_err());

        assert_eq!(ticker.tick().await, start + Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_skips_missed_ticks() {
        let mut ticker = Ticker::new(Duration::from_secs(1), Arc::new(DefaultClock));
        let start = Instant::now();
        ticker.arm(start);

        advance(Duration::from_millis(3500)).await;
        assert_eq!(ticker.tick().await, start + Duration::from_secs(1));
        assert_eq!(ticker.tick().await, start + Duration::from_secs(4));
        assert_eq!(Instant::now(), start + Duration::from_secs(4));
        assert_eq!(ticker.tick().await, start + Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_on_exact_deadline() {
        let mut ticker = Ticker::new(Duration::from_secs(1), Arc::new(DefaultClock));
        let start = Instant::now();
        ticker.arm(start);

        advance(Duration::from_secs(3)).await;
        assert_eq!(ticker.tick().await, start + Duration::from_secs(1));
        assert_eq!(ticker.tick().await, start + Duration::from_secs(4));
    }
}
