//! Configuration Loader
//!
//! Environment-aware configuration loading. Layers built-in defaults, a base
//! configuration file, an environment-specific overlay file and
//! `RELAYCAST__*` environment variables, then validates the result.

use super::PipelineConfig;
use crate::error::Result;
use config::{Config, Environment, File};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CONFIG_BASENAME: &str = "relaycast";
const ENV_PREFIX: &str = "RELAYCAST";

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: PipelineConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> Result<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> Result<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Process environment variables still apply.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> Result<Arc<ConfigManager>> {
        Self::load_with_env_source(config_dir, environment, None)
    }

    /// Same as [`Self::load_from_directory_with_env`] but reads overrides from
    /// `env_source` instead of the process environment
    pub fn load_with_env_source(
        config_dir: Option<PathBuf>,
        environment: &str,
        env_source: Option<HashMap<String, String>>,
    ) -> Result<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::build(&config_directory, environment, env_source)?;
        config.validate()?;

        info!(
            environment = %environment,
            relay_count = config.relays.default_relays.len(),
            max_queue_size = config.queue.max_queue_size,
            max_concurrent_processing = config.queue.max_concurrent_processing,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Load a single configuration file on top of the defaults
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<PipelineConfig> {
        let config: PipelineConfig = Config::builder()
            .add_source(Config::try_from(&PipelineConfig::default())?)
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    fn build(
        config_directory: &Path,
        environment: &str,
        env_source: Option<HashMap<String, String>>,
    ) -> Result<PipelineConfig> {
        let base = config_directory.join(CONFIG_BASENAME);
        let overlay = config_directory.join(format!("{CONFIG_BASENAME}.{environment}"));

        let environment_source = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("relays.default_relays")
            .source(env_source);

        let config = Config::builder()
            .add_source(Config::try_from(&PipelineConfig::default())?)
            .add_source(File::with_name(&base.to_string_lossy()).required(false))
            .add_source(File::with_name(&overlay.to_string_lossy()).required(false))
            .add_source(environment_source)
            .build()?;

        Ok(config.try_deserialize()?)
    }

    fn detect_environment() -> String {
        env::var("RELAYCAST_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }
}
