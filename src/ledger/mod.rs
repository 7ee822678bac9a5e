//! The flight-surety ledger.
//!
//! [`FlightSuretyLedger`] owns every component and is the only mutation
//! surface. Each operation validates all of its preconditions before the first
//! write, so a failed call leaves state and the event journal untouched. Events
//! are handed to subscribers only after the call has committed.

pub mod access;

pub use access::AccessControl;

use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;

use crate::airline::{AirlineRegistry, RegistrationOutcome};
use crate::config::{ConfigError, LedgerConfig};
use crate::errors::{Result, SuretyError};
use crate::events::{EventBus, LedgerEvent, LedgerEventListener, SubscriptionId};
use crate::flight::{FlightKey, FlightRegistry, FlightStatus};
use crate::insurance::{InsuranceLedger, InsurancePolicy, PolicyKey};
use crate::oracle::{IndexGenerator, OracleConsensus, ResponseKey, ResponseOutcome};
use crate::treasury::{DepositSource, Treasury};
use crate::types::{AccountId, CallContext, Wei};
use crate::units::serde_units;

/// Point-in-time summary of ledger state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    pub owner: AccountId,
    pub operational: bool,
    pub height: u64,
    pub registered_airlines: usize,
    pub funded_airlines: usize,
    pub oracles: usize,
    pub flights: usize,
    pub policies: usize,
    pub open_requests: usize,
    #[serde(with = "serde_units")]
    pub treasury_balance: Wei,
    #[serde(with = "serde_units")]
    pub escrowed_premiums: Wei,
    #[serde(with = "serde_units")]
    pub total_paid_out: Wei,
}

/// Flight-delay insurance ledger state machine
#[derive(Debug)]
pub struct FlightSuretyLedger {
    access: AccessControl,
    airlines: AirlineRegistry,
    insurance: InsuranceLedger,
    oracles: OracleConsensus,
    flights: FlightRegistry,
    treasury: Treasury,
    events: EventBus,
    config: LedgerConfig,
    /// Committed mutating calls
    height: u64,
}

impl FlightSuretyLedger {
    /// Create a ledger owned by `owner`, who is also the genesis airline
    pub fn new(owner: AccountId, config: LedgerConfig) -> std::result::Result<Self, ConfigError> {
        let validation = config.validate();
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.get_summary()));
        }

        let generator = IndexGenerator::from_config_seed(config.entropy.seed);
        info!(
            "Ledger created by {} with {} profile",
            owner.short(),
            config.profile
        );
        Ok(Self {
            access: AccessControl::new(owner),
            airlines: AirlineRegistry::new(owner, config.airlines.clone()),
            insurance: InsuranceLedger::new(config.insurance.clone()),
            oracles: OracleConsensus::new(config.oracles.clone(), generator),
            flights: FlightRegistry::new(),
            treasury: Treasury::new(),
            events: EventBus::new(),
            config,
            height: 0,
        })
    }

    // Access control

    pub fn owner(&self) -> AccountId {
        self.access.owner()
    }

    pub fn is_operational(&self) -> bool {
        self.access.is_operational()
    }

    /// Owner-only. Allowed while halted.
    pub fn set_operational(&mut self, ctx: CallContext, operational: bool) -> Result<()> {
        if self.access.set_operational(&ctx.caller, operational)? {
            info!("Operational status set to {}", operational);
            self.commit(vec![LedgerEvent::OperationalStatusChanged { operational }]);
        }
        Ok(())
    }

    // Airlines

    /// Propose (or vote for) `candidate` on behalf of the calling airline
    pub fn register_airline(
        &mut self,
        ctx: CallContext,
        candidate: AccountId,
    ) -> Result<RegistrationOutcome> {
        self.access.ensure_operational()?;
        let height = self.next_height();
        let outcome = self
            .airlines
            .register_airline(candidate, ctx.caller, height)?;

        match outcome {
            RegistrationOutcome::Registered { registered_count } => {
                self.commit(vec![LedgerEvent::AirlineRegistered {
                    airline: candidate,
                    registered_count,
                }]);
            }
            RegistrationOutcome::VoteRecorded { votes, required } => {
                self.commit(vec![LedgerEvent::AirlineVoteRecorded {
                    candidate,
                    voter: ctx.caller,
                    votes,
                    required,
                }]);
            }
            RegistrationOutcome::DuplicateVote { .. } => {}
        }
        Ok(outcome)
    }

    /// Contribute `ctx.value` to the calling airline's funding
    pub fn fund_airline(&mut self, ctx: CallContext) -> Result<()> {
        self.access.ensure_operational()?;
        self.airlines.check_funding(&ctx.caller, ctx.value)?;
        self.treasury.ensure_can_deposit(ctx.value)?;
        let outcome = self.airlines.fund_airline(ctx.caller, ctx.value)?;
        self.treasury
            .deposit(DepositSource::AirlineFunding, &ctx.caller, ctx.value)?;

        let mut events = Vec::new();
        if outcome.newly_funded {
            events.push(LedgerEvent::AirlineFunded {
                airline: ctx.caller,
                total_funding: outcome.total_funding,
            });
        }
        self.commit(events);
        Ok(())
    }

    pub fn is_airline_registered(&self, airline: &AccountId) -> bool {
        self.airlines.is_registered(airline)
    }

    pub fn is_airline_funded(&self, airline: &AccountId) -> bool {
        self.airlines.is_funded(airline)
    }

    // Flights

    /// Catalog a departure of the calling airline. Repeats are no-ops.
    pub fn register_flight(&mut self, ctx: CallContext, code: &str, timestamp: u64) -> Result<FlightKey> {
        self.access.ensure_operational()?;
        if !self.airlines.is_registered(&ctx.caller) {
            return Err(SuretyError::AirlineNotRegistered(ctx.caller));
        }

        let key = FlightKey::new(ctx.caller, code, timestamp);
        if self.flights.insert(key.clone(), ctx.caller) {
            self.commit(vec![LedgerEvent::FlightRegistered {
                airline: ctx.caller,
                flight_code: key.code.clone(),
                timestamp,
            }]);
        }
        Ok(key)
    }

    pub fn flight_status(&self, airline: &AccountId, code: &str, timestamp: u64) -> FlightStatus {
        self.flights
            .status_of(&FlightKey::new(*airline, code, timestamp))
    }

    // Insurance

    /// Escrow `ctx.value` as a premium on `airline`/`code` for the caller
    pub fn buy_insurance(&mut self, ctx: CallContext, airline: AccountId, code: &str) -> Result<()> {
        self.access.ensure_operational()?;
        if !self.airlines.is_registered(&airline) {
            return Err(SuretyError::AirlineNotRegistered(airline));
        }

        let key = PolicyKey::new(ctx.caller, airline, code);
        let height = self.next_height();
        self.insurance.check_purchase(&key, ctx.value)?;
        self.treasury.ensure_can_deposit(ctx.value)?;
        self.insurance.buy(key, ctx.value, height)?;
        self.treasury
            .deposit(DepositSource::Premium, &ctx.caller, ctx.value)?;

        self.commit(vec![LedgerEvent::InsurancePurchased {
            passenger: ctx.caller,
            airline,
            flight_code: code.to_string(),
            premium: ctx.value,
        }]);
        Ok(())
    }

    /// Claim the caller's policy if the flight was delayed by the airline.
    /// Returns the credit now owed.
    pub fn claim_insurance(&mut self, ctx: CallContext, airline: AccountId, code: &str) -> Result<Wei> {
        self.access.ensure_operational()?;
        let (status, resolved_at) = self
            .flights
            .latest_resolution(&airline, code)
            .map_or((FlightStatus::Unknown, 0), |flight| (flight.status, flight.updated_at));
        let key = PolicyKey::new(ctx.caller, airline, code);
        let credit = self.insurance.claim(&key, status, resolved_at)?;

        self.commit(vec![LedgerEvent::InsuranceClaimed {
            passenger: ctx.caller,
            airline,
            flight_code: code.to_string(),
            credit,
        }]);
        Ok(credit)
    }

    /// Owner-only. Pays out all claimed credit on the key to the passenger.
    pub fn refund_insurance(
        &mut self,
        ctx: CallContext,
        passenger: AccountId,
        airline: AccountId,
        code: &str,
    ) -> Result<Wei> {
        self.access.ensure_operational()?;
        self.access.ensure_owner(&ctx.caller, "refund insurance")?;

        let key = PolicyKey::new(passenger, airline, code);
        let owed = self.insurance.check_settlement(&key)?;
        self.treasury.ensure_can_pay(owed)?;

        let height = self.next_height();
        let paid = self.insurance.settle(&key)?;
        self.treasury.pay(&passenger, paid, height)?;
        info!("Paid {} wei to {} for {}", paid, passenger.short(), code);

        self.commit(vec![LedgerEvent::CreditPaid {
            passenger,
            airline,
            flight_code: code.to_string(),
            amount: paid,
        }]);
        Ok(paid)
    }

    /// Most recent policy on the key, whatever its state
    pub fn policy(&self, passenger: &AccountId, airline: &AccountId, code: &str) -> Option<&InsurancePolicy> {
        self.insurance
            .latest_policy(&PolicyKey::new(*passenger, *airline, code))
    }

    pub fn credit_owed(&self, passenger: &AccountId, airline: &AccountId, code: &str) -> Wei {
        self.insurance
            .credit_owed(&PolicyKey::new(*passenger, *airline, code))
    }

    /// Total ever transferred to `passenger`
    pub fn paid_out(&self, passenger: &AccountId) -> Wei {
        self.treasury.paid_to(passenger)
    }

    // Oracles

    /// Register the caller as an oracle, paying `ctx.value` as the fee.
    /// Returns the assigned indexes.
    pub fn register_oracle(&mut self, ctx: CallContext) -> Result<Vec<u8>> {
        self.access.ensure_operational()?;
        let height = self.next_height();
        self.oracles.check_registration(&ctx.caller, ctx.value)?;
        self.treasury.ensure_can_deposit(ctx.value)?;
        let indexes = self
            .oracles
            .register_oracle(ctx.caller, ctx.value, height)?;
        self.treasury
            .deposit(DepositSource::OracleFee, &ctx.caller, ctx.value)?;

        self.commit(vec![LedgerEvent::OracleRegistered {
            oracle: ctx.caller,
            indexes: indexes.clone(),
        }]);
        Ok(indexes)
    }

    pub fn get_my_indexes(&self, oracle: &AccountId) -> Result<Vec<u8>> {
        self.oracles.indexes_of(oracle).map(<[u8]>::to_vec)
    }

    /// Ask the oracles holding a freshly drawn index to report on a flight.
    /// Returns the drawn index.
    pub fn fetch_flight_status(
        &mut self,
        ctx: CallContext,
        airline: AccountId,
        code: &str,
        timestamp: u64,
    ) -> Result<u8> {
        self.access.ensure_operational()?;
        let height = self.next_height();
        let index = self.oracles.draw_request_index(&ctx.caller, height);
        let flight = FlightKey::new(airline, code, timestamp);

        self.flights.insert(flight.clone(), ctx.caller);
        self.oracles
            .open_request(ResponseKey::new(index, flight), ctx.caller, height);

        debug!("Status of {} requested on index {}", code, index);
        self.commit(vec![LedgerEvent::OracleRequest {
            index,
            airline,
            flight_code: code.to_string(),
            timestamp,
        }]);
        Ok(index)
    }

    /// Record the calling oracle's report for an open request
    pub fn submit_oracle_response(
        &mut self,
        ctx: CallContext,
        index: u8,
        airline: AccountId,
        code: &str,
        timestamp: u64,
        status_code: u8,
    ) -> Result<ResponseOutcome> {
        self.access.ensure_operational()?;
        let status = FlightStatus::from_code(status_code)?;
        let key = ResponseKey::new(index, FlightKey::new(airline, code, timestamp));
        let outcome = self.oracles.submit_response(ctx.caller, &key, status)?;

        let report = LedgerEvent::OracleReport {
            oracle: ctx.caller,
            airline,
            flight_code: code.to_string(),
            timestamp,
            status,
        };
        match outcome {
            ResponseOutcome::Duplicate => {}
            ResponseOutcome::Accepted { .. } => self.commit(vec![report]),
            ResponseOutcome::Resolved(resolved) => {
                let height = self.next_height();
                if self.flights.set_status(&key.flight, resolved, height) {
                    self.commit(vec![
                        report,
                        LedgerEvent::FlightStatusInfo {
                            airline,
                            flight_code: code.to_string(),
                            timestamp,
                            status: resolved,
                        },
                    ]);
                } else {
                    // Departure settled by an earlier request; its status stands
                    self.commit(vec![report]);
                }
            }
        }
        Ok(outcome)
    }

    // Events

    pub fn subscribe(&mut self, listener: Arc<dyn LedgerEventListener>) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn journal(&self) -> &[LedgerEvent] {
        self.events.journal()
    }

    // Component reads

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn airlines(&self) -> &AirlineRegistry {
        &self.airlines
    }

    pub fn insurance(&self) -> &InsuranceLedger {
        &self.insurance
    }

    pub fn oracles(&self) -> &OracleConsensus {
        &self.oracles
    }

    pub fn flights(&self) -> &FlightRegistry {
        &self.flights
    }

    pub fn treasury(&self) -> &Treasury {
        &self.treasury
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            owner: self.owner(),
            operational: self.is_operational(),
            height: self.height,
            registered_airlines: self.airlines.registered_count(),
            funded_airlines: self.airlines.funded_count(),
            oracles: self.oracles.oracle_count(),
            flights: self.flights.len(),
            policies: self.insurance.policy_count(),
            open_requests: self.oracles.open_requests().count(),
            treasury_balance: self.treasury.balance(),
            escrowed_premiums: self.insurance.escrowed(),
            total_paid_out: self.treasury.total_paid_out(),
        }
    }

    /// Height the call in progress will commit at
    fn next_height(&self) -> u64 {
        self.height + 1
    }

    fn commit(&mut self, events: Vec<LedgerEvent>) {
        self.height += 1;
        self.events.publish(events);
    }
}

#[cfg(test)]
pub mod tests;
