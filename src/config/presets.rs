use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Wei;
use crate::units::{serde_units, units};

// Default ledger constants
pub const DEFAULT_BOOTSTRAP_THRESHOLD: usize = 4; // airlines admitted without a vote
pub const DEFAULT_MIN_CONTRIBUTION: Wei = units(10);
pub const DEFAULT_FUNDING_THRESHOLD: Wei = units(10);
pub const DEFAULT_PREMIUM_CAP: Wei = units(1);
pub const DEFAULT_PAYOUT_NUMERATOR: u32 = 3; // 1.5x payout
pub const DEFAULT_PAYOUT_DENOMINATOR: u32 = 2;
pub const DEFAULT_REGISTRATION_FEE: Wei = units(1);
pub const DEFAULT_INDEX_SPACE: u8 = 10; // indexes 0..=9
pub const DEFAULT_INDEXES_PER_ORACLE: usize = 3;
pub const DEFAULT_ORACLE_QUORUM: usize = 3;

/// Named configuration profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Profile {
    /// Production constants with platform-sourced entropy
    Standard,
    /// Production constants with a fixed entropy seed
    Testing,
    /// Anything loaded from a file
    Custom,
}

impl Default for Profile {
    fn default() -> Self {
        Profile::Standard
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Standard => write!(f, "Standard"),
            Profile::Testing => write!(f, "Testing"),
            Profile::Custom => write!(f, "Custom"),
        }
    }
}

/// Airline admission and funding parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirlineParams {
    /// Registered-airline count below which a single funded proposer suffices
    pub bootstrap_threshold: usize,
    /// Smallest accepted single funding contribution
    #[serde(with = "serde_units")]
    pub min_contribution: Wei,
    /// Cumulative funding at which an airline becomes funded
    #[serde(with = "serde_units")]
    pub funding_threshold: Wei,
}

impl Default for AirlineParams {
    fn default() -> Self {
        Self {
            bootstrap_threshold: DEFAULT_BOOTSTRAP_THRESHOLD,
            min_contribution: DEFAULT_MIN_CONTRIBUTION,
            funding_threshold: DEFAULT_FUNDING_THRESHOLD,
        }
    }
}

/// Policy pricing and payout parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsuranceParams {
    /// Largest premium a single policy may escrow
    #[serde(with = "serde_units")]
    pub premium_cap: Wei,
    pub payout_numerator: u32,
    pub payout_denominator: u32,
}

impl InsuranceParams {
    /// Credit owed for a claimed premium, truncating
    pub fn payout_for(&self, premium: Wei) -> Wei {
        premium * self.payout_numerator as Wei / self.payout_denominator as Wei
    }
}

impl Default for InsuranceParams {
    fn default() -> Self {
        Self {
            premium_cap: DEFAULT_PREMIUM_CAP,
            payout_numerator: DEFAULT_PAYOUT_NUMERATOR,
            payout_denominator: DEFAULT_PAYOUT_DENOMINATOR,
        }
    }
}

/// Oracle registration and consensus parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleParams {
    #[serde(with = "serde_units")]
    pub registration_fee: Wei,
    /// Indexes are drawn from `0..index_space`
    pub index_space: u8,
    pub indexes_per_oracle: usize,
    /// Matching responses required to resolve a request
    pub quorum: usize,
}

impl Default for OracleParams {
    fn default() -> Self {
        Self {
            registration_fee: DEFAULT_REGISTRATION_FEE,
            index_space: DEFAULT_INDEX_SPACE,
            indexes_per_oracle: DEFAULT_INDEXES_PER_ORACLE,
            quorum: DEFAULT_ORACLE_QUORUM,
        }
    }
}

/// Entropy source for oracle index assignment
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntropyParams {
    /// Fixed seed; `None` draws one from the OS at ledger construction
    pub seed: Option<u64>,
}

/// Complete ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub profile: Profile,
    pub airlines: AirlineParams,
    pub insurance: InsuranceParams,
    pub oracles: OracleParams,
    pub entropy: EntropyParams,
}

impl LedgerConfig {
    /// Production constants, OS-seeded entropy
    pub fn standard() -> Self {
        Self::default()
    }

    /// Production constants with a deterministic entropy seed
    pub fn testing(seed: u64) -> Self {
        Self {
            profile: Profile::Testing,
            entropy: EntropyParams { seed: Some(seed) },
            ..Self::default()
        }
    }
}
