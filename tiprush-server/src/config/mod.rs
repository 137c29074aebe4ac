//! Configuration module for tiprush-server.
//!
//! Handles loading configuration from the TOML file and CLI arguments.
//! Validation failures here are the only fatal errors in the system: a
//! server with out-of-range limits refuses to start rather than run with
//! them.

pub mod file;

use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use tiprush_core::config::{
    ConfigValidationError, CooldownConfig, HubConfig, PipelineConfig, RateLimiterConfig,
};

use crate::config::file::FileConfig;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(#[from] ConfigValidationError),

    #[error("admin secret must not be empty")]
    EmptyAdminSecret,
}

/// Loaded and validated configuration, ready for the composition root.
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub admin_secret: String,
    pub rate: RateLimiterConfig,
    pub cooldowns: CooldownConfig,
    pub pipeline: PipelineConfig,
    pub hub: HubConfig,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and validate the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Convert each section into its core config type
    /// 4. Validate every bound
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        Self::build(file_config)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn build(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
        if file_config.admin.secret.is_empty() {
            return Err(ConfigError::EmptyAdminSecret);
        }

        let rate = file_config.limits.to_config();
        let cooldowns = file_config.cooldowns.to_config();
        let pipeline = file_config.pipeline.to_config();
        let hub = file_config.hub.to_config();

        rate.validate()?;
        cooldowns.validate()?;
        pipeline.validate()?;
        hub.validate()?;

        Ok(LoadedConfig {
            listen: file_config.server.listen,
            admin_secret: file_config.admin.secret,
            rate,
            cooldowns,
            pipeline,
            hub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::file::{
        AdminSection, CooldownsSection, FileConfig, HubSection, LimitsSection, PipelineSection,
        ServerSection,
    };

    fn base_config() -> FileConfig {
        FileConfig {
            server: ServerSection::default(),
            admin: AdminSection {
                secret: "secret".to_string(),
            },
            limits: LimitsSection::default(),
            cooldowns: CooldownsSection::default(),
            pipeline: PipelineSection::default(),
            hub: HubSection::default(),
        }
    }

    #[test]
    fn defaults_build_and_validate() {
        assert!(ConfigLoader::build(base_config()).is_ok());
    }

    #[test]
    fn empty_secret_is_fatal() {
        let mut config = base_config();
        config.admin.secret.clear();
        assert!(matches!(
            ConfigLoader::build(config),
            Err(ConfigError::EmptyAdminSecret)
        ));
    }

    #[test]
    fn out_of_range_cooldown_is_fatal() {
        let mut config = base_config();
        config.cooldowns.spawn_dragon_ms = 24 * 60 * 60 * 1000;
        assert!(matches!(
            ConfigLoader::build(config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn zero_rate_window_is_fatal() {
        let mut config = base_config();
        config.limits.window_ms = 0;
        assert!(matches!(
            ConfigLoader::build(config),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
