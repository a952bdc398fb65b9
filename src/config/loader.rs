//! Configuration Loader
//!
//! Environment-aware configuration loading. Finds the base file, layers the
//! environment overlay and `RESILIENCE__*` variables on top with the `config`
//! crate, then validates the result.

use super::error::{ConfigResult, ConfigurationError};
use super::ResilienceSettings;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const BASE_NAME: &str = "resilience";
const EXTENSIONS: &[&str] = &["yaml", "yml", "toml"];
const ENV_PREFIX: &str = "RESILIENCE";
const ENV_SEPARATOR: &str = "__";

/// Loaded, validated configuration together with where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    settings: ResilienceSettings,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = environment,
            directory = %config_directory.display(),
            "Loading resilience configuration"
        );

        let settings = Self::load_and_merge_config(&config_directory, environment)?;
        settings.validate()?;

        info!(
            environment = environment,
            state_store = %settings.state_store.backend,
            circuit_breakers = settings.circuit_breakers.len(),
            retry_policies = settings.retry_policies.len(),
            "Resilience configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            settings,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Get the loaded configuration
    pub fn settings(&self) -> &ResilienceSettings {
        &self.settings
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// `RESILIENCE_ENV`, then `APP_ENV`, then `development`
    pub fn detect_environment() -> String {
        env::var("RESILIENCE_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    /// `RESILIENCE_CONFIG_DIR`, then `./config`
    pub fn default_config_directory() -> PathBuf {
        env::var("RESILIENCE_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }

    fn candidate_paths(directory: &Path, stem: &str) -> Vec<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|extension| directory.join(format!("{stem}.{extension}")))
            .collect()
    }

    fn find_file(directory: &Path, stem: &str) -> Option<PathBuf> {
        Self::candidate_paths(directory, stem)
            .into_iter()
            .find(|path| path.is_file())
    }

    fn load_and_merge_config(directory: &Path, environment: &str) -> ConfigResult<ResilienceSettings> {
        let base = Self::find_file(directory, BASE_NAME).ok_or_else(|| {
            ConfigurationError::config_file_not_found(Self::candidate_paths(directory, BASE_NAME))
        })?;

        let mut builder = Config::builder().add_source(File::from(base.as_path()));
        let mut description = base.display().to_string();

        let overlay_stem = format!("{BASE_NAME}.{environment}");
        if let Some(overlay) = Self::find_file(directory, &overlay_stem) {
            debug!(path = %overlay.display(), "Applying environment configuration overlay");
            description = format!("{description} + {}", overlay.display());
            builder = builder.add_source(File::from(overlay.as_path()));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::parse_error(&description, e))?;

        config
            .try_deserialize::<ResilienceSettings>()
            .map_err(|e| ConfigurationError::parse_error(&description, e))
    }
}
