//! Fixed-window admission rate limiting.
//!
//! One global window plus one window per actor, all of the same width.
//! A window is a plain counter that resets wholesale when its width has
//! elapsed; bursts straddling a window boundary are an accepted
//! approximation of a true sliding window.

use compact_str::CompactString;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use tiprush_sdk::objects::RateWindowStatus;

use crate::config::RateLimiterConfig;

/// A single fixed counting window.
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    window_start: Instant,
    count: u32,
}

impl RateWindow {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            count: 0,
        }
    }

    /// Reset the counter when the window width has elapsed.
    fn roll(&mut self, now: Instant, width: Duration) {
        if now.saturating_duration_since(self.window_start) >= width {
            self.window_start = now;
            self.count = 0;
        }
    }

    /// Time until this window resets.
    fn retry_after(&self, now: Instant, width: Duration) -> Duration {
        (self.window_start + width).saturating_duration_since(now)
    }
}

/// Sliding-window-approximating admission control, global and per actor.
pub struct RateLimiter {
    config: RateLimiterConfig,
    global: RateWindow,
    per_actor: HashMap<CompactString, RateWindow>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig, now: Instant) -> Self {
        Self {
            config,
            global: RateWindow::new(now),
            per_actor: HashMap::new(),
        }
    }

    /// Check whether one more admission fits both windows.
    ///
    /// Does not count the admission; call [`record`](Self::record) once the
    /// rest of the gate has passed. When both windows are full the larger
    /// of the two retry hints is returned.
    pub fn admit(&mut self, actor_id: &str, now: Instant) -> Result<(), Duration> {
        let width = self.config.window;

        self.global.roll(now, width);
        let actor = self
            .per_actor
            .entry(CompactString::from(actor_id))
            .or_insert_with(|| RateWindow::new(now));
        actor.roll(now, width);

        let global_full = self.global.count >= self.config.global_max;
        let actor_full = actor.count >= self.config.per_actor_max;

        match (global_full, actor_full) {
            (false, false) => Ok(()),
            (true, false) => Err(self.global.retry_after(now, width)),
            (false, true) => Err(actor.retry_after(now, width)),
            (true, true) => Err(self
                .global
                .retry_after(now, width)
                .max(actor.retry_after(now, width))),
        }
    }

    /// Count a successful admission against both windows.
    pub fn record(&mut self, actor_id: &str, now: Instant) {
        let width = self.config.window;

        self.global.roll(now, width);
        self.global.count += 1;

        let actor = self
            .per_actor
            .entry(CompactString::from(actor_id))
            .or_insert_with(|| RateWindow::new(now));
        actor.roll(now, width);
        actor.count += 1;
    }

    /// Drop per-actor windows idle for at least twice the window width.
    ///
    /// Runs on a periodic tick, never in the admission path. Returns the
    /// number of windows purged.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let horizon = self.config.window * 2;
        let before = self.per_actor.len();
        self.per_actor
            .retain(|_, w| now.saturating_duration_since(w.window_start) < horizon);
        before - self.per_actor.len()
    }

    /// Swap the limit configuration. Live windows keep their counts.
    pub fn reconfigure(&mut self, config: RateLimiterConfig) {
        self.config = config;
    }

    pub fn status(&self, now: Instant) -> RateWindowStatus {
        let mut global = self.global;
        global.roll(now, self.config.window);
        RateWindowStatus {
            window_ms: self.config.window.as_millis() as u64,
            global_count: global.count,
            global_limit: self.config.global_max,
            per_actor_limit: self.config.per_actor_max,
            tracked_actors: self.per_actor.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(global_max: u32, per_actor_max: u32, window: Duration) -> (RateLimiter, Instant) {
        let now = Instant::now();
        let config = RateLimiterConfig {
            window,
            global_max,
            per_actor_max,
        };
        (RateLimiter::new(config, now), now)
    }

    #[test]
    fn per_actor_limit_rejects_the_overflowing_admission() {
        let (mut limiter, now) = limiter(100, 3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(limiter.admit("alice", now).is_ok());
            limiter.record("alice", now);
        }
        assert!(limiter.admit("alice", now).is_err());
        // A different actor is unaffected.
        assert!(limiter.admit("bob", now).is_ok());
    }

    #[test]
    fn global_limit_spans_actors() {
        let (mut limiter, now) = limiter(2, 10, Duration::from_secs(60));
        limiter.record("a", now);
        limiter.record("b", now);
        assert!(limiter.admit("c", now).is_err());
    }

    #[test]
    fn window_rollover_resets_counters() {
        let window = Duration::from_secs(60);
        let (mut limiter, now) = limiter(100, 1, window);
        limiter.record("alice", now);
        assert!(limiter.admit("alice", now).is_err());

        let later = now + window;
        assert!(limiter.admit("alice", later).is_ok());
    }

    #[test]
    fn double_failure_reports_the_larger_retry() {
        let window = Duration::from_secs(60);
        let (mut limiter, now) = limiter(1, 1, window);
        limiter.record("alice", now);

        // Roll the global window late so its reset lies further out.
        let later = now + Duration::from_secs(30);
        limiter.global = RateWindow {
            window_start: later,
            count: 1,
        };

        let retry = match limiter.admit("alice", later) {
            Err(d) => d,
            Ok(()) => Duration::ZERO,
        };
        assert_eq!(retry, window);
    }

    #[test]
    fn sweep_purges_idle_actors_only() {
        let window = Duration::from_secs(60);
        let (mut limiter, now) = limiter(100, 5, window);
        limiter.record("idle", now);

        let later = now + window * 2;
        limiter.record("fresh", later);

        assert_eq!(limiter.sweep(later), 1);
        assert_eq!(limiter.status(later).tracked_actors, 1);
    }
}
