// Configuration module for the surety ledger
// Every numeric constant of the ledger lives here so deployments can tune it

pub mod presets;
pub mod validation;

pub use presets::{
    AirlineParams, EntropyParams, InsuranceParams, LedgerConfig, OracleParams, Profile,
};
pub use validation::{
    ConfigValidationError, ConfigValidator, RuleFailure, ValidationResult, ValidationRule,
};

use log::{info, warn};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Error type for loading configuration files
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration:\n{0}")]
    Invalid(String),
}

impl LedgerConfig {
    /// Parse a TOML document without validating it
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Run the default validator over this configuration
    pub fn validate(&self) -> ValidationResult {
        ConfigValidator::new().validate(self)
    }

    /// Read, parse and validate a configuration file.
    ///
    /// Warnings are logged; errors reject the file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&raw)?;
        if config.profile == Profile::Standard {
            config.profile = Profile::Custom;
        }

        let result = config.validate();
        if !result.is_valid() {
            return Err(ConfigError::Invalid(result.get_summary()));
        }
        for warning in &result.warnings {
            warn!("{}: {}", path.display(), warning);
        }

        info!("Loaded ledger configuration from {}", path.display());
        Ok(config)
    }
}
