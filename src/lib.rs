//! Flight-delay insurance ledger core.
//!
//! Airlines register and fund themselves under a majority-vote admission
//! rule, passengers escrow premiums against flight outcomes, and a quorum of
//! oracles resolves each flight's status. [`FlightSuretyLedger`] is the single
//! entry point for every operation.

pub mod airline;
pub mod config;
pub mod errors;
pub mod events;
pub mod flight;
pub mod insurance;
pub mod ledger;
pub mod oracle;
pub mod simulation;
pub mod treasury;
pub mod types;
pub mod units;

// Re-export commonly used items
pub use airline::{Airline, AirlineRegistry, AirlineStatus, RegistrationOutcome};
pub use config::{ConfigError, LedgerConfig};
pub use errors::{Result, SuretyError};
pub use events::{EventBus, LedgerEvent, LedgerEventListener, SubscriptionId};
pub use flight::{Flight, FlightKey, FlightRegistry, FlightStatus};
pub use insurance::{InsuranceLedger, InsurancePolicy, PolicyKey, PolicyState};
pub use ledger::{FlightSuretyLedger, LedgerSnapshot};
pub use oracle::{OracleConsensus, ResponseKey, ResponseOutcome};
pub use treasury::{DepositSource, Treasury};
pub use types::{AccountId, CallContext, Wei, WEI_PER_UNIT};
