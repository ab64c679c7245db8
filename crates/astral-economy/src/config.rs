//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `astral-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use uuid::Uuid;

use astral_types::ZodiacSign;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration for the resource core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AstralConfig {
    /// Economy tunables (tick period, seed stats).
    #[serde(default)]
    pub economy: EconomyConfig,

    /// Persistence behavior (flush timeout).
    #[serde(default)]
    pub sync: SyncConfig,

    /// Infrastructure connection strings.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Kingdoms the engine loads and drives at startup.
    #[serde(default)]
    pub kingdoms: Vec<KingdomSeedConfig>,
}

impl AstralConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for infrastructure URLs:
    /// - `DRAGONFLY_URL` overrides `infrastructure.dragonfly_url`
    /// - `NATS_URL` overrides `infrastructure.nats_url`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }
}

/// Economy tunables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EconomyConfig {
    /// Seconds between passive-accrual ticks. A tunable, not a
    /// correctness requirement.
    #[serde(default = "default_tick_period_secs")]
    pub tick_period_secs: u64,

    /// Starting capacity and base rate per resource, used when a kingdom
    /// has no stored record yet. Keyed by the resource's snake_case name.
    #[serde(default = "default_starting_stats")]
    pub starting_stats: BTreeMap<String, StartingResourceConfig>,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            tick_period_secs: default_tick_period_secs(),
            starting_stats: default_starting_stats(),
        }
    }
}

/// Seed stats for one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StartingResourceConfig {
    /// Storage capacity.
    pub max: u64,
    /// Units produced per second before bonuses.
    pub generation_rate: u64,
}

/// Persistence behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Milliseconds before an in-flight flush is treated as failed.
    /// Local state is retained either way.
    #[serde(default = "default_flush_timeout_ms")]
    pub flush_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            flush_timeout_ms: default_flush_timeout_ms(),
        }
    }
}

/// Infrastructure connection strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// Dragonfly (Redis-compatible) URL.
    #[serde(default = "default_dragonfly_url")]
    pub dragonfly_url: String,

    /// NATS messaging URL (remote-change feed).
    #[serde(default = "default_nats_url")]
    pub nats_url: String,
}

impl InfrastructureConfig {
    /// Override infrastructure URLs with environment variables when set.
    ///
    /// This allows Docker Compose (or any deployment) to set connection
    /// strings via env vars without modifying the YAML config file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DRAGONFLY_URL") {
            self.dragonfly_url = val;
        }
        if let Ok(val) = std::env::var("NATS_URL") {
            self.nats_url = val;
        }
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            dragonfly_url: default_dragonfly_url(),
            nats_url: default_nats_url(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// One kingdom the engine loads at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KingdomSeedConfig {
    /// The kingdom's stable identifier.
    pub kingdom_id: Uuid,

    /// The owning player account.
    pub user_id: String,

    /// The kingdom's zodiac sign.
    pub zodiac_sign: ZodiacSign,

    /// The allied kingdom's zodiac sign, if an alliance exists.
    #[serde(default)]
    pub ally_sign: Option<ZodiacSign>,
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_tick_period_secs() -> u64 {
    5
}

fn default_starting_stats() -> BTreeMap<String, StartingResourceConfig> {
    let mut m = BTreeMap::new();
    m.insert(
        String::from("stardust"),
        StartingResourceConfig {
            max: 5_000,
            generation_rate: 10,
        },
    );
    m.insert(
        String::from("celestial_ore"),
        StartingResourceConfig {
            max: 2_000,
            generation_rate: 4,
        },
    );
    m.insert(
        String::from("ether"),
        StartingResourceConfig {
            max: 1_000,
            generation_rate: 1,
        },
    );
    m
}

const fn default_flush_timeout_ms() -> u64 {
    5_000
}

fn default_dragonfly_url() -> String {
    String::from("redis://localhost:6379")
}

fn default_nats_url() -> String {
    String::from("nats://localhost:4222")
}

fn default_log_level() -> String {
    String::from("info")
}
