//! Application configuration.
//!
//! Controls how commands are presented and how flattened parameters are
//! named. Every setting has a default, so a config file is optional.
//!
//! # Example YAML
//!
//! ```yaml
//! name: inventory
//! about: Manage the inventory
//! field_separator: "."
//! synthetic_prefix: "_model_"
//! show_defaults: true
//! no_args_is_help: false
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use model_cli_core::{FIELD_SEPARATOR, SYNTHETIC_PREFIX};

/// Settings for an [`App`](crate::App).
///
/// # Examples
///
/// ```
/// use model_cli::AppConfig;
///
/// let config = AppConfig::default();
/// assert_eq!(config.field_separator, ".");
/// assert_eq!(config.synthetic_prefix, "_model_");
/// assert!(config.show_defaults);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Program name shown in usage lines; defaults to the command name.
    pub name: Option<String>,
    /// Top-level description.
    pub about: Option<String>,
    /// Version reported by `--version`; no version flag when unset.
    pub version: Option<String>,
    /// Joins qualifier paths into generated option names (`--user.id`).
    pub field_separator: String,
    /// Prefix of synthetic parameter names.
    pub synthetic_prefix: String,
    /// Append `[default: ...]` to help text.
    pub show_defaults: bool,
    /// Print help instead of an error when invoked without arguments.
    pub no_args_is_help: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: None,
            about: None,
            version: None,
            field_separator: FIELD_SEPARATOR.to_string(),
            synthetic_prefix: SYNTHETIC_PREFIX.to_string(),
            show_defaults: true,
            no_args_is_help: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](ConfigError::IoError) if the file cannot be
    /// read, [`YamlError`](ConfigError::YamlError) if parsing fails, or
    /// [`Invalid`](ConfigError::Invalid) for unusable settings.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.check()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](ConfigError::IoError) if the file cannot be
    /// written, or [`YamlError`](ConfigError::YamlError) if serialization
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Rejects settings that would produce unusable option names.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.field_separator.is_empty() || self.field_separator.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "field_separator must be non-empty and contain no whitespace, got {:?}",
                self.field_separator
            )));
        }
        if self.synthetic_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "synthetic_prefix cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
