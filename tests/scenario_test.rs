mod common;

use common::{account, init_logging, oracles_holding};
use surety_core::config::LedgerConfig;
use surety_core::units::{milli_units, units};
use surety_core::{
    CallContext, FlightStatus, FlightSuretyLedger, LedgerEvent, PolicyState, RegistrationOutcome,
    ResponseOutcome, SuretyError,
};

const DEPARTURE: u64 = 1_700_000_000;

#[test]
fn test_insure_delay_claim_refund() {
    init_logging();
    let airline_a = account("airline-a");
    let airline_b = account("airline-b");
    let passenger = account("passenger");
    let mut ledger = FlightSuretyLedger::new(airline_a, LedgerConfig::testing(2024)).unwrap();

    // Bootstrap airline funds and admits B on its own
    ledger
        .fund_airline(CallContext::with_value(airline_a, units(10)))
        .unwrap();
    assert!(ledger.is_airline_funded(&airline_a));
    assert_eq!(
        ledger
            .register_airline(CallContext::sender(airline_a), airline_b)
            .unwrap(),
        RegistrationOutcome::Registered { registered_count: 2 }
    );

    ledger
        .buy_insurance(CallContext::with_value(passenger, milli_units(700)), airline_b, "F1")
        .unwrap();

    assert!(matches!(
        ledger.claim_insurance(CallContext::sender(passenger), airline_b, "F1"),
        Err(SuretyError::FlightNotLate { .. })
    ));

    let index = ledger
        .fetch_flight_status(CallContext::sender(passenger), airline_b, "F1", DEPARTURE)
        .unwrap();
    let oracles = oracles_holding(&mut ledger, index, 3);
    let mut outcomes = Vec::new();
    for oracle in &oracles {
        outcomes.push(
            ledger
                .submit_oracle_response(CallContext::sender(*oracle), index, airline_b, "F1", DEPARTURE, 20)
                .unwrap(),
        );
    }
    assert_eq!(
        outcomes,
        vec![
            ResponseOutcome::Accepted { votes: 1 },
            ResponseOutcome::Accepted { votes: 2 },
            ResponseOutcome::Resolved(FlightStatus::LateAirline),
        ]
    );
    assert_eq!(
        ledger.flight_status(&airline_b, "F1", DEPARTURE),
        FlightStatus::LateAirline
    );

    let credit = ledger
        .claim_insurance(CallContext::sender(passenger), airline_b, "F1")
        .unwrap();
    assert_eq!(credit, milli_units(1050));
    assert_eq!(ledger.credit_owed(&passenger, &airline_b, "F1"), milli_units(1050));

    let paid = ledger
        .refund_insurance(CallContext::sender(airline_a), passenger, airline_b, "F1")
        .unwrap();
    assert_eq!(paid, milli_units(1050));
    assert_eq!(ledger.paid_out(&passenger), milli_units(1050));
    assert_eq!(
        ledger.policy(&passenger, &airline_b, "F1").unwrap().state,
        PolicyState::Refunded {
            paid: milli_units(1050)
        }
    );

    assert!(matches!(
        ledger.refund_insurance(CallContext::sender(airline_a), passenger, airline_b, "F1"),
        Err(SuretyError::NoCredit { .. })
    ));
}

#[test]
fn test_event_journal_tells_the_story() {
    let airline_a = account("airline-a");
    let airline_b = account("airline-b");
    let passenger = account("passenger");
    let mut ledger = FlightSuretyLedger::new(airline_a, LedgerConfig::testing(7)).unwrap();

    ledger
        .fund_airline(CallContext::with_value(airline_a, units(10)))
        .unwrap();
    ledger
        .register_airline(CallContext::sender(airline_a), airline_b)
        .unwrap();
    ledger
        .buy_insurance(CallContext::with_value(passenger, milli_units(700)), airline_b, "F1")
        .unwrap();
    let index = ledger
        .fetch_flight_status(CallContext::sender(passenger), airline_b, "F1", DEPARTURE)
        .unwrap();
    for oracle in oracles_holding(&mut ledger, index, 3) {
        ledger
            .submit_oracle_response(CallContext::sender(oracle), index, airline_b, "F1", DEPARTURE, 20)
            .unwrap();
    }
    ledger
        .claim_insurance(CallContext::sender(passenger), airline_b, "F1")
        .unwrap();
    ledger
        .refund_insurance(CallContext::sender(airline_a), passenger, airline_b, "F1")
        .unwrap();

    let names: Vec<&str> = ledger
        .journal()
        .iter()
        .map(LedgerEvent::name)
        .filter(|name| *name != "OracleRegistered")
        .collect();
    assert_eq!(
        names,
        vec![
            "AirlineFunded",
            "AirlineRegistered",
            "InsurancePurchased",
            "OracleRequest",
            "OracleReport",
            "OracleReport",
            "OracleReport",
            "FlightStatusInfo",
            "InsuranceClaimed",
            "CreditPaid",
        ]
    );
}
