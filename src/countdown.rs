//! Resettable round countdown.
//!
//! The countdown stores an absolute deadline while it runs and recomputes the
//! remaining time from it on every poll, so slow ticks or a suspended process
//! never make it drift. Polling is driven by [`Countdown::tick`], a cancel-safe
//! future meant to sit in a `tokio::select!` branch.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// How often a running countdown recomputes its remaining time.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Result of one poll of a running countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStatus {
    /// Still running with this much time left.
    Running(Duration),
    /// Reached zero; the countdown has stopped itself.
    Expired,
}

/// Published view of the countdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountdownSnapshot {
    pub remaining: Duration,
    pub running: bool,
}

impl CountdownSnapshot {
    /// Whole seconds left, rounded up the way a clock face shows them.
    pub fn remaining_seconds(&self) -> u64 {
        ceil_seconds(self.remaining)
    }
}

fn ceil_seconds(d: Duration) -> u64 {
    let millis = d.as_millis();
    u64::try_from(millis.div_ceil(1000)).unwrap_or(u64::MAX)
}

#[derive(Debug)]
pub struct Countdown {
    /// Duration restored by [`reset`](Self::reset).
    configured: Duration,
    /// Last computed remaining time.
    remaining: Duration,
    /// Where the next argument-less [`start`](Self::start) resumes from.
    baseline: Duration,
    deadline: Option<Instant>,
    tick_every: Duration,
    /// Created on the first poll so the countdown can be driven outside a runtime.
    ticker: Option<Interval>,
}

impl Countdown {
    pub fn new(configured: Duration) -> Self {
        Self {
            configured,
            remaining: configured,
            baseline: configured,
            deadline: None,
            tick_every: DEFAULT_TICK_INTERVAL,
            ticker: None,
        }
    }

    #[must_use]
    pub fn with_tick_interval(mut self, every: Duration) -> Self {
        self.tick_every = every.max(Duration::from_millis(1));
        self
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    /// Remaining time, recomputed from the deadline if running.
    pub fn remaining(&self) -> Duration {
        match self.deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => self.remaining,
        }
    }

    pub fn remaining_seconds(&self) -> u64 {
        ceil_seconds(self.remaining())
    }

    pub fn snapshot(&self) -> CountdownSnapshot {
        CountdownSnapshot {
            remaining: self.remaining(),
            running: self.is_running(),
        }
    }

    /// Start or resume.
    ///
    /// Without a duration this resumes from the captured baseline and is a
    /// no-op while already running. With a duration it (re)starts from that
    /// value even if running.
    ///
    /// Starting with nothing left expires on the spot and returns
    /// [`CountdownStatus::Expired`]; no later tick reports it.
    pub fn start(&mut self, seconds: Option<u32>) -> CountdownStatus {
        match seconds {
            Some(seconds) => {
                let duration = Duration::from_secs(u64::from(seconds));
                self.remaining = duration;
                self.baseline = duration;
                self.ticker = None;
            }
            None if self.is_running() => return CountdownStatus::Running(self.remaining()),
            None => {}
        }
        let now = Instant::now();
        self.deadline = Some(now + self.baseline);
        self.refresh(now)
    }

    /// Stop and capture the remaining time for a later resume.
    pub fn stop(&mut self) {
        self.ticker = None;
        if let Some(deadline) = self.deadline.take() {
            self.baseline = deadline.saturating_duration_since(Instant::now());
            self.remaining = self.baseline;
        }
    }

    /// Stop and restore the configured duration.
    pub fn reset(&mut self) {
        self.stop();
        self.remaining = self.configured;
        self.baseline = self.configured;
    }

    /// Overwrite the remaining time and the resume baseline with an
    /// authoritative value. A running countdown keeps running from it.
    pub fn adjust(&mut self, seconds: u32) {
        let duration = Duration::from_secs(u64::from(seconds));
        self.remaining = duration;
        self.baseline = duration;
        if self.deadline.is_some() {
            self.deadline = Some(Instant::now() + duration);
        }
    }

    /// Wait for the next poll interval and recompute.
    ///
    /// Pending forever while stopped. Cancel-safe.
    pub async fn tick(&mut self) -> CountdownStatus {
        if self.deadline.is_none() {
            return std::future::pending().await;
        }
        let every = self.tick_every;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut interval = tokio::time::interval_at(Instant::now() + every, every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        ticker.tick().await;
        self.refresh(Instant::now())
    }

    fn refresh(&mut self, now: Instant) -> CountdownStatus {
        let Some(deadline) = self.deadline else {
            return CountdownStatus::Running(self.remaining);
        };
        self.remaining = deadline.saturating_duration_since(now);
        if self.remaining.is_zero() {
            self.deadline = None;
            self.ticker = None;
            self.baseline = Duration::ZERO;
            CountdownStatus::Expired
        } else {
            CountdownStatus::Running(self.remaining)
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use tokio_test::assert_pending;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[tokio::test(start_paused = true)]
    async fn stop_then_resume_keeps_remaining_time() {
        let mut countdown = Countdown::new(secs(60));
        countdown.start(Some(30));
        tokio::time::advance(secs(10)).await;
        countdown.stop();
        assert_eq!(countdown.remaining(), secs(20));

        tokio::time::advance(secs(5)).await;
        countdown.start(None);
        assert!(countdown.is_running());
        assert_eq!(countdown.remaining_seconds(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn start_without_duration_is_idempotent_while_running() {
        let mut countdown = Countdown::new(secs(60));
        countdown.start(Some(30));
        tokio::time::advance(secs(4)).await;
        countdown.start(None);
        assert_eq!(countdown.remaining(), secs(26));
    }

    #[tokio::test(start_paused = true)]
    async fn start_with_duration_restarts_while_running() {
        let mut countdown = Countdown::new(secs(60));
        countdown.start(Some(30));
        tokio::time::advance(secs(4)).await;
        countdown.start(Some(45));
        assert_eq!(countdown.remaining(), secs(45));
    }

    #[tokio::test(start_paused = true)]
    async fn reaching_zero_auto_stops() {
        let mut countdown = Countdown::new(secs(60));
        countdown.start(Some(1));

        let mut polls = 0;
        loop {
            polls += 1;
            if countdown.tick().await == CountdownStatus::Expired {
                break;
            }
        }
        assert_eq!(polls, 4);
        assert!(!countdown.is_running());
        assert_eq!(countdown.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn starting_with_nothing_left_expires_immediately() {
        let mut countdown = Countdown::new(secs(60));
        assert_eq!(countdown.start(Some(0)), CountdownStatus::Expired);
        assert!(!countdown.is_running());
        assert_eq!(countdown.remaining(), Duration::ZERO);

        assert_eq!(countdown.start(Some(5)), CountdownStatus::Running(secs(5)));
        assert_eq!(countdown.start(None), CountdownStatus::Running(secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn tick_recomputes_from_deadline_after_a_stall() {
        let mut countdown = Countdown::new(secs(60));
        countdown.start(Some(10));
        let _ = countdown.tick().await;
        // Simulate the process being suspended well past several intervals.
        tokio::time::advance(secs(3)).await;
        match countdown.tick().await {
            CountdownStatus::Running(left) => assert!(left <= secs(7)),
            CountdownStatus::Expired => panic!("expired too early"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reset_restores_configured_duration() {
        let mut countdown = Countdown::new(secs(60));
        countdown.start(Some(30));
        tokio::time::advance(secs(10)).await;
        countdown.reset();
        assert!(!countdown.is_running());
        assert_eq!(countdown.remaining(), secs(60));
        countdown.start(None);
        assert_eq!(countdown.remaining(), secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn adjust_overwrites_display_and_baseline() {
        let mut countdown = Countdown::new(secs(60));
        countdown.adjust(12);
        assert_eq!(countdown.snapshot().remaining_seconds(), 12);
        countdown.start(None);
        assert_eq!(countdown.remaining(), secs(12));

        tokio::time::advance(secs(2)).await;
        countdown.adjust(40);
        assert!(countdown.is_running());
        assert_eq!(countdown.remaining(), secs(40));
    }

    #[test]
    fn stopped_countdown_never_ticks() {
        let mut countdown = Countdown::new(secs(60));
        let mut tick = tokio_test::task::spawn(countdown.tick());
        assert_pending!(tick.poll());
    }

    #[test]
    fn remaining_seconds_rounds_up() {
        let snapshot = CountdownSnapshot {
            remaining: Duration::from_millis(19_001),
            running: true,
        };
        assert_eq!(snapshot.remaining_seconds(), 20);
    }
}
