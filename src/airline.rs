use log::{debug, info};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::config::AirlineParams;
use crate::errors::{Result, SuretyError};
use crate::types::{AccountId, Wei};

/// Lifecycle of an admitted airline. Unregistered airlines have no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AirlineStatus {
    Registered,
    Funded,
}

/// A participating airline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Airline {
    pub id: AccountId,
    pub status: AirlineStatus,
    /// Cumulative funding contributions
    pub funded_amount: Wei,
    /// Ledger height at admission
    pub registered_at: u64,
}

impl Airline {
    pub fn is_funded(&self) -> bool {
        self.status == AirlineStatus::Funded
    }
}

/// Result of a `register_airline` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Candidate admitted; registry now holds `registered_count` airlines
    Registered { registered_count: usize },
    /// Vote counted but the majority is not reached yet
    VoteRecorded { votes: usize, required: usize },
    /// Proposer had already voted for this candidate; nothing changed
    DuplicateVote { votes: usize, required: usize },
}

/// Result of a `fund_airline` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundingOutcome {
    pub total_funding: Wei,
    /// True only on the call that crossed the funding threshold
    pub newly_funded: bool,
}

/// Airline admission and funding state.
///
/// Below `bootstrap_threshold` registered airlines, any funded airline admits
/// a candidate on its own. From then on a candidate needs distinct votes from
/// strictly more than half of the airlines registered at the time of the vote.
#[derive(Debug)]
pub struct AirlineRegistry {
    airlines: HashMap<AccountId, Airline>,
    /// Admission order
    order: Vec<AccountId>,
    /// candidate -> distinct voters
    votes: HashMap<AccountId, BTreeSet<AccountId>>,
    params: AirlineParams,
}

impl AirlineRegistry {
    /// Registry holding only the genesis airline, registered but unfunded
    pub fn new(genesis: AccountId, params: AirlineParams) -> Self {
        let mut registry = Self {
            airlines: HashMap::new(),
            order: Vec::new(),
            votes: HashMap::new(),
            params,
        };
        registry.admit(genesis, 0);
        registry
    }

    pub fn params(&self) -> &AirlineParams {
        &self.params
    }

    pub fn registered_count(&self) -> usize {
        self.order.len()
    }

    pub fn funded_count(&self) -> usize {
        self.airlines.values().filter(|a| a.is_funded()).count()
    }

    /// Distinct votes a pending candidate needs under the current registry size
    pub fn required_votes(&self) -> usize {
        self.registered_count() / 2 + 1
    }

    /// Whether the next admission goes through the voting path
    pub fn requires_consensus(&self) -> bool {
        self.registered_count() >= self.params.bootstrap_threshold
    }

    pub fn is_registered(&self, id: &AccountId) -> bool {
        self.airlines.contains_key(id)
    }

    pub fn is_funded(&self, id: &AccountId) -> bool {
        self.airlines.get(id).map_or(false, Airline::is_funded)
    }

    pub fn airline(&self, id: &AccountId) -> Option<&Airline> {
        self.airlines.get(id)
    }

    /// Airlines in admission order
    pub fn airlines(&self) -> impl Iterator<Item = &Airline> {
        self.order.iter().filter_map(move |id| self.airlines.get(id))
    }

    /// Voters currently backing a pending candidate
    pub fn votes_for(&self, candidate: &AccountId) -> usize {
        self.votes.get(candidate).map_or(0, BTreeSet::len)
    }

    /// Check every precondition of `register_airline` without mutating
    pub(crate) fn check_registration(&self, candidate: &AccountId, proposer: &AccountId) -> Result<()> {
        if !self.is_funded(proposer) {
            return Err(SuretyError::unauthorized(format!(
                "proposer {} is not a funded airline",
                proposer
            )));
        }
        if candidate == proposer {
            return Err(SuretyError::unauthorized("an airline cannot vote for itself"));
        }
        if self.is_registered(candidate) {
            return Err(SuretyError::AirlineAlreadyRegistered(*candidate));
        }
        Ok(())
    }

    pub(crate) fn register_airline(
        &mut self,
        candidate: AccountId,
        proposer: AccountId,
        height: u64,
    ) -> Result<RegistrationOutcome> {
        self.check_registration(&candidate, &proposer)?;

        if !self.requires_consensus() {
            self.admit(candidate, height);
            info!(
                "Airline {} registered by {} (bootstrap, {} registered)",
                candidate.short(),
                proposer.short(),
                self.registered_count()
            );
            return Ok(RegistrationOutcome::Registered {
                registered_count: self.registered_count(),
            });
        }

        let required = self.required_votes();
        let voters = self.votes.entry(candidate).or_default();
        if !voters.insert(proposer) {
            let votes = voters.len();
            debug!(
                "Repeat vote by {} for {} ignored ({}/{})",
                proposer.short(),
                candidate.short(),
                votes,
                required
            );
            return Ok(RegistrationOutcome::DuplicateVote { votes, required });
        }

        let votes = voters.len();
        if votes < required {
            debug!(
                "Vote by {} for {} recorded ({}/{})",
                proposer.short(),
                candidate.short(),
                votes,
                required
            );
            return Ok(RegistrationOutcome::VoteRecorded { votes, required });
        }

        self.votes.remove(&candidate);
        self.admit(candidate, height);
        info!(
            "Airline {} registered by consensus with {}/{} votes",
            candidate.short(),
            votes,
            required
        );
        Ok(RegistrationOutcome::Registered {
            registered_count: self.registered_count(),
        })
    }

    /// Check every precondition of `fund_airline` without mutating
    pub(crate) fn check_funding(&self, airline: &AccountId, value: Wei) -> Result<()> {
        if !self.is_registered(airline) {
            return Err(SuretyError::unauthorized(format!(
                "{} is not a registered airline",
                airline
            )));
        }
        if value < self.params.min_contribution {
            return Err(SuretyError::insufficient(
                format!("funding requires at least {} wei", self.params.min_contribution),
                value,
            ));
        }
        self.funding_after(airline, value)?;
        Ok(())
    }

    fn funding_after(&self, airline: &AccountId, value: Wei) -> Result<Wei> {
        let funded = self.airlines.get(airline).map_or(0, |a| a.funded_amount);
        funded.checked_add(value).ok_or_else(|| SuretyError::ValueOverflow {
            reason: format!("funding of {} would overflow", airline),
            provided: value,
        })
    }

    pub(crate) fn fund_airline(&mut self, airline: AccountId, value: Wei) -> Result<FundingOutcome> {
        self.check_funding(&airline, value)?;
        let threshold = self.params.funding_threshold;
        let total = self.funding_after(&airline, value)?;

        let record = self
            .airlines
            .get_mut(&airline)
            .ok_or(SuretyError::AirlineNotRegistered(airline))?;
        record.funded_amount = total;

        let newly_funded = !record.is_funded() && record.funded_amount >= threshold;
        if newly_funded {
            record.status = AirlineStatus::Funded;
            info!(
                "Airline {} funded with {} wei",
                airline.short(),
                record.funded_amount
            );
        }

        Ok(FundingOutcome {
            total_funding: record.funded_amount,
            newly_funded,
        })
    }

    fn admit(&mut self, id: AccountId, height: u64) {
        self.airlines.insert(
            id,
            Airline {
                id,
                status: AirlineStatus::Registered,
                funded_amount: 0,
                registered_at: height,
            },
        );
        self.order.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::units;

    fn airline(n: usize) -> AccountId {
        AccountId::from_label(&format!("airline-{}", n))
    }

    fn funded_registry() -> AirlineRegistry {
        let mut registry = AirlineRegistry::new(airline(0), AirlineParams::default());
        registry.fund_airline(airline(0), units(10)).unwrap();
        registry
    }

    #[test]
    fn test_genesis_airline_is_registered_but_unfunded() {
        let registry = AirlineRegistry::new(airline(0), AirlineParams::default());
        assert!(registry.is_registered(&airline(0)));
        assert!(!registry.is_funded(&airline(0)));
        assert_eq!(registry.registered_count(), 1);
    }

    #[test]
    fn test_unfunded_airline_cannot_propose() {
        let mut registry = AirlineRegistry::new(airline(0), AirlineParams::default());
        let err = registry
            .register_airline(airline(1), airline(0), 1)
            .unwrap_err();
        assert!(matches!(err, SuretyError::Unauthorized(_)));
        assert!(!registry.is_registered(&airline(1)));
    }

    #[test]
    fn test_self_vote_is_rejected() {
        let mut registry = funded_registry();
        assert!(matches!(
            registry.register_airline(airline(0), airline(0), 1),
            Err(SuretyError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_bootstrap_fast_path() {
        let mut registry = funded_registry();
        for n in 1..4 {
            let outcome = registry.register_airline(airline(n), airline(0), n as u64).unwrap();
            assert_eq!(
                outcome,
                RegistrationOutcome::Registered {
                    registered_count: n + 1
                }
            );
        }
        assert!(registry.requires_consensus());
        assert_eq!(
            registry.register_airline(airline(2), airline(0), 9),
            Err(SuretyError::AirlineAlreadyRegistered(airline(2)))
        );
    }

    #[test]
    fn test_consensus_requires_strict_majority() {
        let mut registry = funded_registry();
        for n in 1..4 {
            registry.register_airline(airline(n), airline(0), 1).unwrap();
            registry.fund_airline(airline(n), units(10)).unwrap();
        }
        assert_eq!(registry.required_votes(), 3);

        let candidate = airline(10);
        assert_eq!(
            registry.register_airline(candidate, airline(0), 2).unwrap(),
            RegistrationOutcome::VoteRecorded { votes: 1, required: 3 }
        );
        assert_eq!(
            registry.register_airline(candidate, airline(0), 3).unwrap(),
            RegistrationOutcome::DuplicateVote { votes: 1, required: 3 }
        );
        assert_eq!(
            registry.register_airline(candidate, airline(1), 4).unwrap(),
            RegistrationOutcome::VoteRecorded { votes: 2, required: 3 }
        );
        assert!(!registry.is_registered(&candidate));
        assert_eq!(
            registry.register_airline(candidate, airline(2), 5).unwrap(),
            RegistrationOutcome::Registered { registered_count: 5 }
        );
        assert_eq!(registry.votes_for(&candidate), 0);
        assert_eq!(registry.airline(&candidate).unwrap().registered_at, 5);
    }

    #[test]
    fn test_funding_below_minimum_is_rejected() {
        let mut registry = AirlineRegistry::new(airline(0), AirlineParams::default());
        let err = registry.fund_airline(airline(0), units(9)).unwrap_err();
        assert!(matches!(err, SuretyError::InsufficientValue { .. }));
        assert_eq!(registry.airline(&airline(0)).unwrap().funded_amount, 0);
    }

    #[test]
    fn test_unregistered_airline_cannot_fund() {
        let mut registry = AirlineRegistry::new(airline(0), AirlineParams::default());
        assert!(matches!(
            registry.fund_airline(airline(5), units(10)),
            Err(SuretyError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_over_funding_is_accepted_once_funded() {
        let mut registry = AirlineRegistry::new(airline(0), AirlineParams::default());
        let first = registry.fund_airline(airline(0), units(15)).unwrap();
        assert!(first.newly_funded);
        let second = registry.fund_airline(airline(0), units(10)).unwrap();
        assert!(!second.newly_funded);
        assert_eq!(second.total_funding, units(25));
        assert!(registry.is_funded(&airline(0)));
    }

    #[test]
    fn test_cumulative_funding_crosses_threshold() {
        let params = AirlineParams {
            min_contribution: units(4),
            ..AirlineParams::default()
        };
        let mut registry = AirlineRegistry::new(airline(0), params);
        assert!(!registry.fund_airline(airline(0), units(4)).unwrap().newly_funded);
        assert!(!registry.fund_airline(airline(0), units(4)).unwrap().newly_funded);
        assert!(registry.fund_airline(airline(0), units(4)).unwrap().newly_funded);
        assert_eq!(registry.funded_count(), 1);
    }
}
