use log::{debug, error};
use thiserror::Error;

use crate::config::presets::LedgerConfig;

/// Error type for configuration validation issues
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Incompatible settings: {0}")]
    IncompatibleSettings(String),

    #[error("Value out of range: {0}")]
    ValueOutOfRange(String),
}

/// A rule that rejected the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFailure {
    pub rule: String,
    pub error: ConfigValidationError,
    /// What to change, when the rule knows
    pub hint: Option<String>,
}

/// Outcome of running every rule against a configuration
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub failures: Vec<RuleFailure>,
    /// Legal but likely unintended settings
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    /// One line per failure, then one per warning
    pub fn get_summary(&self) -> String {
        let mut lines: Vec<String> = self
            .failures
            .iter()
            .map(|f| match &f.hint {
                Some(hint) => format!("error [{}]: {} ({})", f.rule, f.error, hint),
                None => format!("error [{}]: {}", f.rule, f.error),
            })
            .collect();
        lines.extend(self.warnings.iter().map(|w| format!("warning: {}", w)));

        if lines.is_empty() {
            "no errors, no warnings".to_string()
        } else {
            lines.join("\n")
        }
    }
}

/// A single configuration check
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &str;

    fn validate(&self, config: &LedgerConfig) -> Result<(), ConfigValidationError>;

    /// Settings that are legal but likely unintended
    fn warnings(&self, _config: &LedgerConfig) -> Vec<String> {
        Vec::new()
    }

    fn hint(&self, _config: &LedgerConfig) -> Option<String> {
        None
    }
}

/// Applies a set of rules to a ledger configuration
pub struct ConfigValidator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl ConfigValidator {
    /// Validator with the default rule set
    pub fn new() -> Self {
        let mut validator = Self { rules: Vec::new() };

        validator.add_rule(Box::new(OracleQuorumRule));
        validator.add_rule(Box::new(IndexAssignmentRule));
        validator.add_rule(Box::new(PayoutRatioRule));
        validator.add_rule(Box::new(PremiumCapRule));
        validator.add_rule(Box::new(AirlineFundingRule));

        validator
    }

    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn validate(&self, config: &LedgerConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        for rule in &self.rules {
            match rule.validate(config) {
                Ok(()) => {
                    debug!("Validation rule '{}' passed", rule.name());
                }
                Err(err) => {
                    error!("Validation rule '{}' failed: {}", rule.name(), err);
                    result.failures.push(RuleFailure {
                        rule: rule.name().to_string(),
                        error: err,
                        hint: rule.hint(config),
                    });
                }
            }
            result.warnings.extend(rule.warnings(config));
        }

        if config.entropy.seed.is_some() && config.profile != crate::config::Profile::Testing {
            result.warnings.push(
                "A fixed entropy seed makes oracle index assignment predictable.".to_string(),
            );
        }

        result
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Quorum must be reachable
struct OracleQuorumRule;

impl ValidationRule for OracleQuorumRule {
    fn name(&self) -> &str {
        "OracleQuorum"
    }

    fn validate(&self, config: &LedgerConfig) -> Result<(), ConfigValidationError> {
        if config.oracles.quorum == 0 {
            return Err(ConfigValidationError::ValueOutOfRange(
                "oracles.quorum must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn warnings(&self, config: &LedgerConfig) -> Vec<String> {
        if config.oracles.quorum == 1 {
            vec!["oracles.quorum = 1 trusts the first responder.".to_string()]
        } else {
            Vec::new()
        }
    }

    fn hint(&self, _config: &LedgerConfig) -> Option<String> {
        Some("set oracles.quorum = 3".to_string())
    }
}

/// Oracles need enough distinct indexes to draw from
struct IndexAssignmentRule;

impl ValidationRule for IndexAssignmentRule {
    fn name(&self) -> &str {
        "IndexAssignment"
    }

    fn validate(&self, config: &LedgerConfig) -> Result<(), ConfigValidationError> {
        let oracles = &config.oracles;
        if oracles.index_space == 0 {
            return Err(ConfigValidationError::ValueOutOfRange(
                "oracles.index_space must be at least 1".to_string(),
            ));
        }
        if oracles.indexes_per_oracle == 0 {
            return Err(ConfigValidationError::ValueOutOfRange(
                "oracles.indexes_per_oracle must be at least 1".to_string(),
            ));
        }
        if oracles.indexes_per_oracle > oracles.index_space as usize {
            return Err(ConfigValidationError::IncompatibleSettings(format!(
                "cannot assign {} distinct indexes from a space of {}",
                oracles.indexes_per_oracle, oracles.index_space
            )));
        }
        Ok(())
    }

    fn hint(&self, config: &LedgerConfig) -> Option<String> {
        Some(format!(
            "set oracles.indexes_per_oracle to at most {}",
            config.oracles.index_space.max(1)
        ))
    }
}

/// Payout ratio must be computable
struct PayoutRatioRule;

impl ValidationRule for PayoutRatioRule {
    fn name(&self) -> &str {
        "PayoutRatio"
    }

    fn validate(&self, config: &LedgerConfig) -> Result<(), ConfigValidationError> {
        if config.insurance.payout_denominator == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "insurance.payout_denominator must not be zero".to_string(),
            ));
        }
        Ok(())
    }

    fn warnings(&self, config: &LedgerConfig) -> Vec<String> {
        let insurance = &config.insurance;
        if insurance.payout_denominator != 0
            && insurance.payout_numerator < insurance.payout_denominator
        {
            vec!["Payout multiplier below 1x pays passengers less than their premium.".to_string()]
        } else {
            Vec::new()
        }
    }

    fn hint(&self, _config: &LedgerConfig) -> Option<String> {
        Some("use payout_numerator = 3, payout_denominator = 2".to_string())
    }
}

/// Premium cap must allow some purchase
struct PremiumCapRule;

impl ValidationRule for PremiumCapRule {
    fn name(&self) -> &str {
        "PremiumCap"
    }

    fn validate(&self, config: &LedgerConfig) -> Result<(), ConfigValidationError> {
        if config.insurance.premium_cap == 0 {
            return Err(ConfigValidationError::ValueOutOfRange(
                "insurance.premium_cap must be positive".to_string(),
            ));
        }
        Ok(())
    }

}

/// Airline admission must be able to start
struct AirlineFundingRule;

impl ValidationRule for AirlineFundingRule {
    fn name(&self) -> &str {
        "AirlineFunding"
    }

    fn validate(&self, config: &LedgerConfig) -> Result<(), ConfigValidationError> {
        let airlines = &config.airlines;
        if airlines.bootstrap_threshold == 0 {
            return Err(ConfigValidationError::ValueOutOfRange(
                "airlines.bootstrap_threshold must be at least 1".to_string(),
            ));
        }
        if airlines.funding_threshold == 0 {
            return Err(ConfigValidationError::ValueOutOfRange(
                "airlines.funding_threshold must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn warnings(&self, config: &LedgerConfig) -> Vec<String> {
        let airlines = &config.airlines;
        if airlines.min_contribution > airlines.funding_threshold {
            vec![
                "airlines.min_contribution exceeds funding_threshold; every accepted contribution funds immediately"
                    .to_string(),
            ]
        } else {
            Vec::new()
        }
    }
}
