//! Pipeline configuration types.
//!
//! All bounds are validated once at startup; an out-of-range value is the
//! only fatal condition in the system. The server crate maps its TOML file
//! onto these structs and calls `validate()` before anything is spawned.

use std::time::Duration;
use thiserror::Error;

use tiprush_sdk::objects::DonationKind;

/// A configuration value that fails validation. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("rate window must be positive")]
    ZeroRateWindow,

    #[error("rate limit for {scope} must be positive")]
    ZeroRateLimit { scope: &'static str },

    #[error("cooldown for {kind} is out of range: {actual:?} (max {max:?})")]
    CooldownOutOfRange {
        kind: DonationKind,
        actual: Duration,
        max: Duration,
    },

    #[error("interval {name} must be positive")]
    ZeroInterval { name: &'static str },

    #[error("spawn backlog cap must be positive")]
    ZeroSpawnCap,

    #[error(
        "subscriber idle timeout ({timeout:?}) must exceed the liveness sweep interval ({sweep:?})"
    )]
    TimeoutBelowSweep { timeout: Duration, sweep: Duration },
}

/// Longest cooldown any kind may be configured with.
const MAX_COOLDOWN: Duration = Duration::from_secs(60 * 60);

/// Fixed-window admission limits, one global window plus one per actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Width of both windows.
    pub window: Duration,
    /// Admissions allowed per window across all actors.
    pub global_max: u32,
    /// Admissions allowed per window for a single actor.
    pub per_actor_max: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            global_max: 30,
            per_actor_max: 5,
        }
    }
}

impl RateLimiterConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.window.is_zero() {
            return Err(ConfigValidationError::ZeroRateWindow);
        }
        if self.global_max == 0 {
            return Err(ConfigValidationError::ZeroRateLimit { scope: "global" });
        }
        if self.per_actor_max == 0 {
            return Err(ConfigValidationError::ZeroRateLimit { scope: "per-actor" });
        }
        Ok(())
    }
}

/// Per-kind minimum inter-arrival times.
///
/// Boost and heal are short, enemy spawns medium, dragon spawns long; the
/// long ones intentionally serialize high-impact effects no matter how many
/// donations request them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownConfig {
    pub boost: Duration,
    pub heal: Duration,
    pub spawn_enemy: Duration,
    pub spawn_dragon: Duration,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            boost: Duration::from_secs(30),
            heal: Duration::from_secs(30),
            spawn_enemy: Duration::from_secs(120),
            spawn_dragon: Duration::from_secs(600),
        }
    }
}

impl CooldownConfig {
    /// The configured cooldown for a kind.
    pub fn duration(&self, kind: DonationKind) -> Duration {
        match kind {
            DonationKind::Boost => self.boost,
            DonationKind::Heal => self.heal,
            DonationKind::SpawnEnemy => self.spawn_enemy,
            DonationKind::SpawnDragon => self.spawn_dragon,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for kind in [
            DonationKind::Boost,
            DonationKind::Heal,
            DonationKind::SpawnEnemy,
            DonationKind::SpawnDragon,
        ] {
            let actual = self.duration(kind);
            if actual.is_zero() || actual > MAX_COOLDOWN {
                return Err(ConfigValidationError::CooldownOutOfRange {
                    kind,
                    actual,
                    max: MAX_COOLDOWN,
                });
            }
        }
        Ok(())
    }
}

/// Timer periods for the pipeline task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Period of the event-processing tick. One event per tick at most.
    pub process_interval: Duration,
    /// Period of the overlay refresh push, independent of event flow.
    pub overlay_interval: Duration,
    /// Period of the per-actor rate-window sweep.
    pub sweep_interval: Duration,
    /// Upper bound on `pending_spawns`.
    pub spawn_backlog_cap: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            process_interval: Duration::from_secs(1),
            overlay_interval: Duration::from_secs(2),
            sweep_interval: Duration::from_secs(120),
            spawn_backlog_cap: 64,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (name, interval) in [
            ("process_interval", self.process_interval),
            ("overlay_interval", self.overlay_interval),
            ("sweep_interval", self.sweep_interval),
        ] {
            if interval.is_zero() {
                return Err(ConfigValidationError::ZeroInterval { name });
            }
        }
        if self.spawn_backlog_cap == 0 {
            return Err(ConfigValidationError::ZeroSpawnCap);
        }
        Ok(())
    }
}

/// Timer periods for the broadcast hub's liveness sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Period of the ping sweep.
    pub sweep_interval: Duration,
    /// A subscriber silent for this long is evicted.
    pub idle_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

impl HubConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.sweep_interval.is_zero() {
            return Err(ConfigValidationError::ZeroInterval {
                name: "hub sweep_interval",
            });
        }
        if self.idle_timeout <= self.sweep_interval {
            return Err(ConfigValidationError::TimeoutBelowSweep {
                timeout: self.idle_timeout,
                sweep: self.sweep_interval,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configs_validate() {
        assert!(RateLimiterConfig::default().validate().is_ok());
        assert!(CooldownConfig::default().validate().is_ok());
        assert!(PipelineConfig::default().validate().is_ok());
        assert!(HubConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_window_is_rejected() {
        let config = RateLimiterConfig {
            window: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::ZeroRateWindow)
        ));
    }

    #[test]
    fn out_of_range_cooldown_is_rejected() {
        let config = CooldownConfig {
            spawn_dragon: Duration::from_secs(2 * 60 * 60),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::CooldownOutOfRange {
                kind: DonationKind::SpawnDragon,
                ..
            })
        ));
    }

    #[test]
    fn idle_timeout_must_exceed_sweep() {
        let config = HubConfig {
            sweep_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(30),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::TimeoutBelowSweep { .. })
        ));
    }
}
