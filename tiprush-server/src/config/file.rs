//! TOML file configuration structures.
//!
//! These structs directly map to the `tiprush-config.toml` file format.
//! Every section except `[admin]` has sensible defaults and may be
//! omitted entirely.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use tiprush_core::config::{CooldownConfig, HubConfig, PipelineConfig, RateLimiterConfig};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    pub admin: AdminSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub cooldowns: CooldownsSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub hub: HubSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Admin configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSection {
    /// Static shared secret for the admin API, compared by exact match.
    pub secret: String,
}

/// Rate limit section. Window width is shared by the global and the
/// per-actor counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsSection {
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    #[serde(default = "default_global_max")]
    pub global_max: u32,
    #[serde(default = "default_per_actor_max")]
    pub per_actor_max: u32,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            global_max: default_global_max(),
            per_actor_max: default_per_actor_max(),
        }
    }
}

fn default_window_ms() -> u64 {
    60_000
}
fn default_global_max() -> u32 {
    30
}
fn default_per_actor_max() -> u32 {
    5
}

impl LimitsSection {
    pub fn to_config(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            window: Duration::from_millis(self.window_ms),
            global_max: self.global_max,
            per_actor_max: self.per_actor_max,
        }
    }
}

/// Per-kind cooldown section, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownsSection {
    #[serde(default = "default_boost_ms")]
    pub boost_ms: u64,
    #[serde(default = "default_heal_ms")]
    pub heal_ms: u64,
    #[serde(default = "default_spawn_enemy_ms")]
    pub spawn_enemy_ms: u64,
    #[serde(default = "default_spawn_dragon_ms")]
    pub spawn_dragon_ms: u64,
}

impl Default for CooldownsSection {
    fn default() -> Self {
        Self {
            boost_ms: default_boost_ms(),
            heal_ms: default_heal_ms(),
            spawn_enemy_ms: default_spawn_enemy_ms(),
            spawn_dragon_ms: default_spawn_dragon_ms(),
        }
    }
}

fn default_boost_ms() -> u64 {
    30_000
}
fn default_heal_ms() -> u64 {
    30_000
}
fn default_spawn_enemy_ms() -> u64 {
    120_000
}
fn default_spawn_dragon_ms() -> u64 {
    600_000
}

impl CooldownsSection {
    pub fn to_config(&self) -> CooldownConfig {
        CooldownConfig {
            boost: Duration::from_millis(self.boost_ms),
            heal: Duration::from_millis(self.heal_ms),
            spawn_enemy: Duration::from_millis(self.spawn_enemy_ms),
            spawn_dragon: Duration::from_millis(self.spawn_dragon_ms),
        }
    }
}

/// Pipeline timer section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    #[serde(default = "default_process_interval_ms")]
    pub process_interval_ms: u64,
    #[serde(default = "default_overlay_interval_ms")]
    pub overlay_interval_ms: u64,
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    #[serde(default = "default_spawn_backlog_cap")]
    pub spawn_backlog_cap: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            process_interval_ms: default_process_interval_ms(),
            overlay_interval_ms: default_overlay_interval_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            spawn_backlog_cap: default_spawn_backlog_cap(),
        }
    }
}

fn default_process_interval_ms() -> u64 {
    1_000
}
fn default_overlay_interval_ms() -> u64 {
    2_000
}
fn default_sweep_interval_ms() -> u64 {
    120_000
}
fn default_spawn_backlog_cap() -> usize {
    64
}

impl PipelineSection {
    pub fn to_config(&self) -> PipelineConfig {
        PipelineConfig {
            process_interval: Duration::from_millis(self.process_interval_ms),
            overlay_interval: Duration::from_millis(self.overlay_interval_ms),
            sweep_interval: Duration::from_millis(self.sweep_interval_ms),
            spawn_backlog_cap: self.spawn_backlog_cap,
        }
    }
}

/// Broadcast hub liveness section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSection {
    #[serde(default = "default_hub_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

impl Default for HubSection {
    fn default() -> Self {
        Self {
            sweep_interval_ms: default_hub_sweep_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

fn default_hub_sweep_interval_ms() -> u64 {
    30_000
}
fn default_idle_timeout_ms() -> u64 {
    60_000
}

impl HubSection {
    pub fn to_config(&self) -> HubConfig {
        HubConfig {
            sweep_interval: Duration::from_millis(self.sweep_interval_ms),
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let toml_str = r#"
[admin]
secret = "test-secret"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 8080);
        assert_eq!(config.limits.per_actor_max, 5);
        assert_eq!(config.cooldowns.spawn_dragon_ms, 600_000);
        assert_eq!(config.pipeline.process_interval_ms, 1_000);
        assert_eq!(config.hub.idle_timeout_ms, 60_000);
    }

    #[test]
    fn full_config_overrides_defaults() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[admin]
secret = "hunter2"

[limits]
window_ms = 30000
global_max = 10
per_actor_max = 2

[cooldowns]
boost_ms = 5000
heal_ms = 5000
spawn_enemy_ms = 60000
spawn_dragon_ms = 300000

[pipeline]
process_interval_ms = 500
overlay_interval_ms = 1000
sweep_interval_ms = 60000
spawn_backlog_cap = 16

[hub]
sweep_interval_ms = 15000
idle_timeout_ms = 45000
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.limits.to_config().global_max, 10);
        assert_eq!(
            config.cooldowns.to_config().spawn_dragon,
            Duration::from_secs(300)
        );
        assert_eq!(config.pipeline.to_config().spawn_backlog_cap, 16);
        assert_eq!(
            config.hub.to_config().sweep_interval,
            Duration::from_secs(15)
        );
    }

    #[test]
    fn missing_admin_section_fails_to_parse() {
        let result: Result<FileConfig, _> = toml::from_str("[server]\n");
        assert!(result.is_err());
    }
}
