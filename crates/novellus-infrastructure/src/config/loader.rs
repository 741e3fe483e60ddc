//! Configuration loader — YAML-based
//!
//! Loads `AppConfig` from YAML configuration files. Application settings
//! live under the `settings:` key in `config/{env}.yaml`.
//!
//! Environment is resolved from `NOVELLUS_ENV` (default: `development`).

use std::env;
use std::path::{Path, PathBuf};

use novellus_domain::error::{Error, Result};

use super::types::AppConfig;
use super::validation::validate_app_config;

/// Configuration loader service
///
/// Reads YAML config files and extracts the `settings:` section as
/// `AppConfig`, validating it before handing it out.
#[derive(Clone, Default)]
pub struct ConfigLoader {
    /// Optional explicit config file path (overrides environment resolution)
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader with default settings
    #[must_use]
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set an explicit configuration file path (overrides env-based resolution)
    #[must_use]
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration from YAML
    ///
    /// Resolution order:
    /// 1. Explicit path (via `with_config_path`)
    /// 2. `config/{env}.local.yaml` (highest priority override)
    /// 3. `config/{env}.yaml` (standard config)
    ///
    /// Environment is resolved from `NOVELLUS_ENV`, defaulting to
    /// `development`.
    ///
    /// # Errors
    ///
    /// Returns an error if no config file is found, parsing fails, or
    /// validation detects invalid values.
    pub fn load(&self) -> Result<AppConfig> {
        let yaml_path = self.find_yaml_config_path()?;
        novellus_domain::info!(
            "config",
            "Configuration loaded",
            &yaml_path.display().to_string()
        );

        let content = std::fs::read_to_string(&yaml_path)?;
        Self::parse(&content)
    }

    /// Parse and validate a YAML document with a `settings:` root key.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed YAML, a missing `settings:` key, or
    /// invalid values.
    pub fn parse(content: &str) -> Result<AppConfig> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| Error::configuration_with_source("Failed to parse YAML config", e))?;

        let settings = yaml.get("settings").ok_or_else(|| {
            Error::ConfigMissing("No 'settings' key found in YAML configuration file".to_owned())
        })?;

        let config: AppConfig = serde_yaml::from_value(settings.clone()).map_err(|e| {
            Error::configuration_with_source("Failed to deserialize settings into AppConfig", e)
        })?;

        validate_app_config(&config)?;
        Ok(config)
    }

    /// Reload configuration (re-reads from disk)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading fails.
    pub fn reload(&self) -> Result<AppConfig> {
        self.load()
    }

    /// Get the current configuration file path
    #[must_use]
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Find the YAML config file.
    ///
    /// Resolution:
    /// 1. Explicit `config_path` (if set)
    /// 2. Search `config/{env}.local.yaml` then `config/{env}.yaml`
    ///    from current directory upward
    /// 3. Search from `CARGO_MANIFEST_DIR` upward (workspace root)
    fn find_yaml_config_path(&self) -> Result<PathBuf> {
        // 1. Explicit path takes precedence
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(Error::ConfigMissing(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let env_name = env::var("NOVELLUS_ENV").unwrap_or_else(|_| "development".to_owned());
        let filenames = [format!("{env_name}.local.yaml"), format!("{env_name}.yaml")];

        // 2. Search from current directory upward
        if let Ok(current_dir) = env::current_dir() {
            for dir in current_dir.ancestors() {
                for filename in &filenames {
                    let candidate = dir.join("config").join(filename);
                    if candidate.exists() {
                        return Ok(candidate);
                    }
                }
            }
        }

        // 3. Search from CARGO_MANIFEST_DIR upward (for tests run from crate dirs)
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        for dir in manifest_dir.ancestors() {
            for filename in &filenames {
                let candidate = dir.join("config").join(filename);
                if candidate.exists() {
                    return Ok(candidate);
                }
            }
        }

        Err(Error::ConfigMissing(format!(
            "No YAML configuration file found for environment '{env_name}'. \
             Expected config/{env_name}.yaml"
        )))
    }
}
