use log::{debug, info};
use serde::Serialize;
use std::collections::HashMap;

use crate::config::InsuranceParams;
use crate::errors::{Result, SuretyError};
use crate::flight::FlightStatus;
use crate::types::{AccountId, Wei};

/// Policy lifecycle: `Purchased -> Claimed -> Refunded`, never backwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PolicyState {
    /// Premium escrowed, waiting on the flight outcome
    Purchased,
    /// Flight delayed by the airline; `credit` is owed to the passenger
    Claimed { credit: Wei },
    /// Credit transferred to the passenger
    Refunded { paid: Wei },
}

/// Identifies the policies of one passenger on one flight code
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PolicyKey {
    pub passenger: AccountId,
    pub airline: AccountId,
    pub flight_code: String,
}

impl PolicyKey {
    pub fn new(passenger: AccountId, airline: AccountId, flight_code: impl Into<String>) -> Self {
        Self {
            passenger,
            airline,
            flight_code: flight_code.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsurancePolicy {
    pub key: PolicyKey,
    /// Escrowed premium
    pub premium: Wei,
    pub state: PolicyState,
    pub purchased_at: u64,
}

impl InsurancePolicy {
    /// Credit owed and not yet paid out
    pub fn credit_owed(&self) -> Wei {
        match self.state {
            PolicyState::Claimed { credit } => credit,
            _ => 0,
        }
    }
}

/// Escrowed passenger policies.
///
/// A key holds at most one `Purchased` policy. Once that policy is claimed the
/// key accepts a new purchase, so a key accumulates a history of policies.
#[derive(Debug)]
pub struct InsuranceLedger {
    policies: HashMap<PolicyKey, Vec<InsurancePolicy>>,
    params: InsuranceParams,
}

impl InsuranceLedger {
    pub fn new(params: InsuranceParams) -> Self {
        Self {
            policies: HashMap::new(),
            params,
        }
    }

    pub fn params(&self) -> &InsuranceParams {
        &self.params
    }

    /// The active (purchased, unclaimed) policy on a key
    pub fn active_policy(&self, key: &PolicyKey) -> Option<&InsurancePolicy> {
        self.policies
            .get(key)
            .and_then(|history| history.iter().find(|p| p.state == PolicyState::Purchased))
    }

    /// Most recent policy on a key, whatever its state
    pub fn latest_policy(&self, key: &PolicyKey) -> Option<&InsurancePolicy> {
        self.policies.get(key).and_then(|history| history.last())
    }

    pub fn history(&self, key: &PolicyKey) -> &[InsurancePolicy] {
        self.policies.get(key).map_or(&[], Vec::as_slice)
    }

    /// Total claimed credit on a key awaiting payout
    pub fn credit_owed(&self, key: &PolicyKey) -> Wei {
        self.history(key).iter().map(InsurancePolicy::credit_owed).sum()
    }

    /// Sum of premiums currently held against unclaimed policies
    pub fn escrowed(&self) -> Wei {
        self.policies
            .values()
            .flatten()
            .filter(|p| p.state == PolicyState::Purchased)
            .map(|p| p.premium)
            .sum()
    }

    pub fn policy_count(&self) -> usize {
        self.policies.values().map(Vec::len).sum()
    }

    pub(crate) fn check_purchase(&self, key: &PolicyKey, value: Wei) -> Result<()> {
        if value == 0 {
            return Err(SuretyError::insufficient("premium must be positive", value));
        }
        if value > self.params.premium_cap {
            return Err(SuretyError::insufficient(
                format!("premium exceeds the cap of {} wei", self.params.premium_cap),
                value,
            ));
        }
        if self.active_policy(key).is_some() {
            return Err(SuretyError::DuplicatePolicy {
                airline: key.airline,
                flight_code: key.flight_code.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn buy(&mut self, key: PolicyKey, value: Wei, height: u64) -> Result<()> {
        self.check_purchase(&key, value)?;
        info!(
            "Passenger {} insured {} on {} for {} wei",
            key.passenger.short(),
            key.flight_code,
            key.airline.short(),
            value
        );
        self.policies.entry(key.clone()).or_default().push(InsurancePolicy {
            key,
            premium: value,
            state: PolicyState::Purchased,
            purchased_at: height,
        });
        Ok(())
    }

    /// Move the active policy to `Claimed`, returning the credit owed.
    ///
    /// `status` is the latest resolved status of the insured flight code and
    /// `resolved_at` the height it was recorded at. A resolution at or before
    /// the purchase does not cover the policy, which then reads as Unknown.
    pub(crate) fn claim(&mut self, key: &PolicyKey, status: FlightStatus, resolved_at: u64) -> Result<Wei> {
        let status = match self.active_policy(key) {
            Some(policy) if resolved_at <= policy.purchased_at => FlightStatus::Unknown,
            _ => status,
        };
        if !status.is_claimable() {
            return Err(SuretyError::FlightNotLate {
                flight_code: key.flight_code.clone(),
                status,
            });
        }

        let params = &self.params;
        let policy = self
            .policies
            .get_mut(key)
            .and_then(|history| {
                history
                    .iter_mut()
                    .find(|p| p.state == PolicyState::Purchased)
            })
            .ok_or_else(|| SuretyError::NoPolicy {
                airline: key.airline,
                flight_code: key.flight_code.clone(),
            })?;

        let credit = params.payout_for(policy.premium);
        policy.state = PolicyState::Claimed { credit };
        info!(
            "Passenger {} claimed {} wei on {}",
            key.passenger.short(),
            credit,
            key.flight_code
        );
        Ok(credit)
    }

    pub(crate) fn check_settlement(&self, key: &PolicyKey) -> Result<Wei> {
        let owed = self.credit_owed(key);
        if owed == 0 {
            return Err(SuretyError::NoCredit {
                passenger: key.passenger,
                flight_code: key.flight_code.clone(),
            });
        }
        Ok(owed)
    }

    /// Mark every claimed policy on the key as refunded, returning the total.
    ///
    /// The caller transfers the returned amount.
    pub(crate) fn settle(&mut self, key: &PolicyKey) -> Result<Wei> {
        let owed = self.check_settlement(key)?;
        if let Some(history) = self.policies.get_mut(key) {
            for policy in history.iter_mut() {
                if let PolicyState::Claimed { credit } = policy.state {
                    policy.state = PolicyState::Refunded { paid: credit };
                }
            }
        }
        debug!(
            "Settled {} wei for {} on {}",
            owed,
            key.passenger.short(),
            key.flight_code
        );
        Ok(owed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{milli_units, units};

    fn key() -> PolicyKey {
        PolicyKey::new(
            AccountId::from_label("passenger"),
            AccountId::from_label("airline"),
            "F1",
        )
    }

    fn ledger() -> InsuranceLedger {
        InsuranceLedger::new(InsuranceParams::default())
    }

    #[test]
    fn test_premium_bounds() {
        let mut insurance = ledger();
        assert!(matches!(
            insurance.buy(key(), 0, 1),
            Err(SuretyError::InsufficientValue { .. })
        ));
        assert!(matches!(
            insurance.buy(key(), units(1) + 1, 1),
            Err(SuretyError::InsufficientValue { .. })
        ));
        insurance.buy(key(), units(1), 1).unwrap();
        assert_eq!(insurance.escrowed(), units(1));
    }

    #[test]
    fn test_duplicate_active_policy_is_rejected() {
        let mut insurance = ledger();
        insurance.buy(key(), milli_units(700), 1).unwrap();
        assert_eq!(
            insurance.buy(key(), milli_units(100), 2),
            Err(SuretyError::DuplicatePolicy {
                airline: key().airline,
                flight_code: "F1".to_string()
            })
        );
        assert_eq!(insurance.policy_count(), 1);
    }

    #[test]
    fn test_claim_requires_airline_delay() {
        let mut insurance = ledger();
        insurance.buy(key(), milli_units(700), 1).unwrap();
        for status in [FlightStatus::Unknown, FlightStatus::OnTime, FlightStatus::LateWeather] {
            assert!(matches!(
                insurance.claim(&key(), status, 5),
                Err(SuretyError::FlightNotLate { .. })
            ));
        }
        assert_eq!(
            insurance.active_policy(&key()).unwrap().state,
            PolicyState::Purchased
        );
    }

    #[test]
    fn test_claim_without_policy() {
        let mut insurance = ledger();
        assert!(matches!(
            insurance.claim(&key(), FlightStatus::LateAirline, 5),
            Err(SuretyError::NoPolicy { .. })
        ));
    }

    #[test]
    fn test_claim_credits_one_and_a_half_times_premium() {
        let mut insurance = ledger();
        insurance.buy(key(), milli_units(700), 1).unwrap();
        let credit = insurance.claim(&key(), FlightStatus::LateAirline, 5).unwrap();
        assert_eq!(credit, milli_units(1050));
        assert_eq!(insurance.credit_owed(&key()), milli_units(1050));
        assert_eq!(insurance.escrowed(), 0);

        // Claim is one-shot
        assert!(matches!(
            insurance.claim(&key(), FlightStatus::LateAirline, 5),
            Err(SuretyError::NoPolicy { .. })
        ));
    }

    #[test]
    fn test_settle_is_one_shot() {
        let mut insurance = ledger();
        insurance.buy(key(), milli_units(700), 1).unwrap();
        insurance.claim(&key(), FlightStatus::LateAirline, 5).unwrap();

        assert_eq!(insurance.settle(&key()).unwrap(), milli_units(1050));
        assert_eq!(
            insurance.latest_policy(&key()).unwrap().state,
            PolicyState::Refunded {
                paid: milli_units(1050)
            }
        );
        assert!(matches!(
            insurance.settle(&key()),
            Err(SuretyError::NoCredit { .. })
        ));
    }

    #[test]
    fn test_settle_before_claim_fails() {
        let mut insurance = ledger();
        insurance.buy(key(), milli_units(700), 1).unwrap();
        assert!(matches!(
            insurance.settle(&key()),
            Err(SuretyError::NoCredit { .. })
        ));
    }

    #[test]
    fn test_key_accepts_new_purchase_after_claim() {
        let mut insurance = ledger();
        insurance.buy(key(), milli_units(500), 1).unwrap();
        insurance.claim(&key(), FlightStatus::LateAirline, 5).unwrap();
        insurance.buy(key(), milli_units(200), 6).unwrap();
        insurance.claim(&key(), FlightStatus::LateAirline, 8).unwrap();

        assert_eq!(insurance.history(&key()).len(), 2);
        assert_eq!(insurance.settle(&key()).unwrap(), milli_units(750) + milli_units(300));
        assert_eq!(insurance.credit_owed(&key()), 0);
    }

    #[test]
    fn test_resolution_before_purchase_does_not_cover() {
        let mut insurance = ledger();
        insurance.buy(key(), milli_units(700), 6).unwrap();
        for resolved_at in [5, 6] {
            assert_eq!(
                insurance.claim(&key(), FlightStatus::LateAirline, resolved_at),
                Err(SuretyError::FlightNotLate {
                    flight_code: "F1".to_string(),
                    status: FlightStatus::Unknown
                })
            );
        }
        assert_eq!(
            insurance.claim(&key(), FlightStatus::LateAirline, 7),
            Ok(milli_units(1050))
        );
    }
}
