use log::info;
use serde::Serialize;

use super::{network::OracleNetwork, ResponseBehavior, SimulationError, MAX_FETCH_ATTEMPTS};
use crate::config::LedgerConfig;
use crate::errors::SuretyError;
use crate::flight::{FlightKey, FlightStatus};
use crate::ledger::FlightSuretyLedger;
use crate::types::{AccountId, CallContext};
use crate::units::{format_units, milli_units, units};

pub const SCENARIO_FLIGHT: &str = "F1";
pub const SCENARIO_DEPARTURE: u64 = 1_700_000_000;

/// What happened at a scenario step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StepOutcome {
    Completed(String),
    /// The ledger refused the call, as the step expects
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioStep {
    pub name: String,
    pub outcome: StepOutcome,
}

impl ScenarioStep {
    fn completed(name: &str, detail: String) -> Self {
        info!("{}: {}", name, detail);
        Self {
            name: name.to_string(),
            outcome: StepOutcome::Completed(detail),
        }
    }
}

fn expect_rejection<T>(
    name: &str,
    result: crate::errors::Result<T>,
    expected: fn(&SuretyError) -> bool,
) -> Result<ScenarioStep, SimulationError> {
    match result {
        Err(e) if expected(&e) => {
            info!("{}: rejected with {}", name, e);
            Ok(ScenarioStep {
                name: name.to_string(),
                outcome: StepOutcome::Rejected(e.to_string()),
            })
        }
        Err(e) => Err(SimulationError::Unexpected {
            step: name.to_string(),
            detail: e.to_string(),
        }),
        Ok(_) => Err(SimulationError::Unexpected {
            step: name.to_string(),
            detail: "call succeeded".to_string(),
        }),
    }
}

/// The canonical walk-through: fund, admit a second airline, insure, fail an
/// early claim, resolve an airline delay through the oracles, claim, refund,
/// and fail a repeat refund.
///
/// Returns the final ledger alongside the steps taken.
pub fn run_scenario(config: LedgerConfig, oracle_seed: u64) -> Result<(FlightSuretyLedger, Vec<ScenarioStep>), SimulationError> {
    let airline_a = AccountId::from_label("airline-a");
    let airline_b = AccountId::from_label("airline-b");
    let passenger = AccountId::from_label("passenger");
    let mut ledger = FlightSuretyLedger::new(airline_a, config)?;
    let mut steps = Vec::new();

    ledger.fund_airline(CallContext::with_value(airline_a, units(10)))?;
    steps.push(ScenarioStep::completed(
        "Fund airline A",
        format!("{} funded with 10 units", airline_a.short()),
    ));

    ledger.register_airline(CallContext::sender(airline_a), airline_b)?;
    steps.push(ScenarioStep::completed(
        "Register airline B",
        format!(
            "{} admitted, {} airlines registered",
            airline_b.short(),
            ledger.airlines().registered_count()
        ),
    ));

    let premium = milli_units(700);
    ledger.buy_insurance(CallContext::with_value(passenger, premium), airline_b, SCENARIO_FLIGHT)?;
    steps.push(ScenarioStep::completed(
        "Buy insurance",
        format!("{} units escrowed on {}", format_units(premium), SCENARIO_FLIGHT),
    ));

    steps.push(expect_rejection(
        "Claim before resolution",
        ledger.claim_insurance(CallContext::sender(passenger), airline_b, SCENARIO_FLIGHT),
        |e| matches!(e, SuretyError::FlightNotLate { .. }),
    )?);

    let mut network = OracleNetwork::new(oracle_seed, ResponseBehavior::Truthful { accuracy: 1.0 });
    let fee = ledger.config().oracles.registration_fee;
    network.launch(&mut ledger, 20, fee)?;
    let flight = FlightKey::new(airline_b, SCENARIO_FLIGHT, SCENARIO_DEPARTURE);
    network.set_ground_truth(flight.clone(), FlightStatus::LateAirline);

    let mut responses = 0;
    let mut resolution = None;
    for _ in 0..MAX_FETCH_ATTEMPTS {
        ledger.fetch_flight_status(
            CallContext::sender(passenger),
            airline_b,
            SCENARIO_FLIGHT,
            SCENARIO_DEPARTURE,
        )?;
        for (_, tally) in network.process_pending(&mut ledger)? {
            responses += tally.submitted;
            resolution = resolution.or(tally.resolution);
        }
        if resolution.is_some() {
            break;
        }
    }
    network.shutdown(&mut ledger);
    let status = resolution.ok_or_else(|| SimulationError::Unexpected {
        step: "Resolve flight status".to_string(),
        detail: format!("no quorum after {} fetches", MAX_FETCH_ATTEMPTS),
    })?;
    steps.push(ScenarioStep::completed(
        "Resolve flight status",
        format!("{} resolved as {} from {} responses", flight, status, responses),
    ));

    let credit = ledger.claim_insurance(CallContext::sender(passenger), airline_b, SCENARIO_FLIGHT)?;
    steps.push(ScenarioStep::completed(
        "Claim insurance",
        format!("{} units owed", format_units(credit)),
    ));

    let paid = ledger.refund_insurance(CallContext::sender(airline_a), passenger, airline_b, SCENARIO_FLIGHT)?;
    steps.push(ScenarioStep::completed(
        "Refund insurance",
        format!("{} units paid to {}", format_units(paid), passenger.short()),
    ));

    steps.push(expect_rejection(
        "Repeat refund",
        ledger.refund_insurance(CallContext::sender(airline_a), passenger, airline_b, SCENARIO_FLIGHT),
        |e| matches!(e, SuretyError::NoCredit { .. }),
    )?);

    Ok((ledger, steps))
}
