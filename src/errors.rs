use thiserror::Error;

use crate::flight::FlightStatus;
use crate::types::{AccountId, Wei};

/// Errors raised by ledger operations.
///
/// Every variant aborts the triggering call before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuretyError {
    #[error("Ledger is halted: mutating calls are disabled")]
    Halted,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Oracle {oracle} does not hold index {index}")]
    UnauthorizedOracle { oracle: AccountId, index: u8 },

    #[error("Oracle {0} is not registered")]
    OracleNotRegistered(AccountId),

    #[error("Oracle {0} is already registered")]
    OracleAlreadyRegistered(AccountId),

    #[error("Airline {0} is not registered")]
    AirlineNotRegistered(AccountId),

    #[error("Airline {0} is already registered")]
    AirlineAlreadyRegistered(AccountId),

    #[error("Passenger already holds an active policy on {airline}/{flight_code}")]
    DuplicatePolicy { airline: AccountId, flight_code: String },

    #[error("No active policy on {airline}/{flight_code}")]
    NoPolicy { airline: AccountId, flight_code: String },

    #[error("Flight {flight_code} is not late due to the airline (status: {status})")]
    FlightNotLate { flight_code: String, status: FlightStatus },

    #[error("Oracle request for {flight_code} at {timestamp} is already resolved")]
    AlreadyResolved { flight_code: String, timestamp: u64 },

    #[error("No open oracle request for index {index}, flight {flight_code} at {timestamp}")]
    RequestNotFound { index: u8, flight_code: String, timestamp: u64 },

    #[error("Oracle {oracle} already reported a different status for this request")]
    ConflictingResponse { oracle: AccountId },

    #[error("No credit owed to {passenger} on {flight_code}")]
    NoCredit { passenger: AccountId, flight_code: String },

    #[error("Insufficient value: {reason} (provided {provided} wei)")]
    InsufficientValue { reason: String, provided: Wei },

    #[error("Insufficient reserves: need {needed} wei, have {available} wei")]
    InsufficientReserves { needed: Wei, available: Wei },

    #[error("Invalid flight status code: {0}")]
    InvalidStatusCode(u8),

    #[error("Value overflow: {reason} (provided {provided} wei)")]
    ValueOverflow { reason: String, provided: Wei },
}

pub type Result<T> = std::result::Result<T, SuretyError>;

impl SuretyError {
    /// Shorthand for the common premium/fee/funding bound failures
    pub(crate) fn insufficient(reason: impl Into<String>, provided: Wei) -> Self {
        SuretyError::InsufficientValue {
            reason: reason.into(),
            provided,
        }
    }

    pub(crate) fn unauthorized(reason: impl Into<String>) -> Self {
        SuretyError::Unauthorized(reason.into())
    }
}
