//! Configuration loading.
//!
//! Hierarchy, later sources win:
//! 1. defaults in code (the published scoring and alert constants)
//! 2. `config/{FARMLINK_ENVIRONMENT}.toml` (optional, environment defaults to `development`)
//! 3. `FARMLINK__SECTION__KEY` environment variables

use anyhow::Context;
use config::{Environment, File};
use serde::Deserialize;

use farmlink_inventory::AlertThresholds;
use farmlink_warehouse::ScoringPolicy;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FarmlinkConfig {
    pub environment: String,
    pub scoring: ScoringPolicy,
    pub alerts: AlertThresholds,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Default for FarmlinkConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            scoring: ScoringPolicy::default(),
            alerts: AlertThresholds::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: true,
        }
    }
}

impl FarmlinkConfig {
    /// Load configuration from `config/{FARMLINK_ENVIRONMENT}` and the environment.
    pub fn load() -> anyhow::Result<Self> {
        let environment =
            std::env::var("FARMLINK_ENVIRONMENT").unwrap_or_else(|_| "development".into());
        Self::load_from(&format!("config/{environment}"), &environment)
    }

    /// Load configuration from an explicit file (extension optional, file optional).
    pub fn load_from(path: &str, environment: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .set_default("environment", environment)?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("FARMLINK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read configuration from '{path}'"))?;

        settings
            .try_deserialize()
            .context("configuration does not match the expected shape")
    }
}
