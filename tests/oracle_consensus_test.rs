mod common;

use common::{account, shared_index_config};
use proptest::prelude::*;
use surety_core::units::units;
use surety_core::{
    AccountId, CallContext, FlightStatus, FlightSuretyLedger, LedgerEvent, ResponseOutcome,
    SuretyError,
};

const DEPARTURE: u64 = 1_700_000_000;

fn ledger_with_oracles(count: usize) -> (FlightSuretyLedger, AccountId, Vec<AccountId>) {
    let owner = account("owner");
    let mut ledger = FlightSuretyLedger::new(owner, shared_index_config(11)).unwrap();
    let oracles: Vec<AccountId> = (0..count)
        .map(|n| {
            let oracle = account(&format!("oracle-{}", n));
            ledger
                .register_oracle(CallContext::with_value(oracle, units(1)))
                .unwrap();
            oracle
        })
        .collect();
    (ledger, owner, oracles)
}

/// Three votes for `winner` plus at most two for each other status, so no
/// rival can reach a quorum of three
fn ballots() -> impl Strategy<Value = (u8, Vec<u8>)> {
    (0usize..6, prop::collection::vec((0usize..6, 1usize..3), 0..3)).prop_flat_map(
        |(winner, rivals)| {
            let codes: Vec<u8> = FlightStatus::ALL.iter().map(|s| s.code()).collect();
            let winner_code = codes[winner];
            let mut votes = vec![winner_code; 3];
            let mut seen = vec![winner];
            for (rival, count) in rivals {
                if !seen.contains(&rival) {
                    seen.push(rival);
                    votes.extend(std::iter::repeat(codes[rival]).take(count));
                }
            }
            (Just(winner_code), Just(votes).prop_shuffle())
        },
    )
}

proptest! {
    #[test]
    fn resolution_does_not_depend_on_response_order((winner, votes) in ballots()) {
        let (mut ledger, owner, oracles) = ledger_with_oracles(votes.len());
        let index = ledger
            .fetch_flight_status(CallContext::sender(owner), owner, "F1", DEPARTURE)
            .unwrap();

        let mut resolutions = Vec::new();
        for (oracle, code) in oracles.iter().zip(&votes) {
            match ledger.submit_oracle_response(
                CallContext::sender(*oracle), index, owner, "F1", DEPARTURE, *code,
            ) {
                Ok(ResponseOutcome::Resolved(status)) => resolutions.push(status),
                Ok(_) => {}
                Err(SuretyError::AlreadyResolved { .. }) => {
                    prop_assert_eq!(resolutions.len(), 1);
                }
                Err(e) => prop_assert!(false, "unexpected rejection: {}", e),
            }
        }

        let expected = FlightStatus::from_code(winner).unwrap();
        prop_assert_eq!(resolutions, vec![expected]);
        prop_assert_eq!(ledger.flight_status(&owner, "F1", DEPARTURE), expected);
    }
}

#[test]
fn test_split_votes_leave_request_open() {
    let (mut ledger, owner, oracles) = ledger_with_oracles(4);
    let index = ledger
        .fetch_flight_status(CallContext::sender(owner), owner, "F1", DEPARTURE)
        .unwrap();

    for (oracle, code) in oracles.iter().zip([10u8, 20, 10, 20]) {
        let outcome = ledger
            .submit_oracle_response(CallContext::sender(*oracle), index, owner, "F1", DEPARTURE, code)
            .unwrap();
        assert!(matches!(outcome, ResponseOutcome::Accepted { votes: 1 | 2 }));
    }

    assert_eq!(ledger.flight_status(&owner, "F1", DEPARTURE), FlightStatus::Unknown);
    assert_eq!(ledger.snapshot().open_requests, 1);
    assert!(!ledger
        .journal()
        .iter()
        .any(|event| matches!(event, LedgerEvent::FlightStatusInfo { .. })));
}

#[test]
fn test_refetch_opens_request_under_new_index_only() {
    let (mut ledger, owner, oracles) = ledger_with_oracles(3);
    let first = ledger
        .fetch_flight_status(CallContext::sender(owner), owner, "F1", DEPARTURE)
        .unwrap();
    for oracle in &oracles {
        ledger
            .submit_oracle_response(CallContext::sender(*oracle), first, owner, "F1", DEPARTURE, 20)
            .unwrap();
    }

    // A later request that draws the same index finds it already settled
    let second = ledger
        .fetch_flight_status(CallContext::sender(owner), owner, "F1", DEPARTURE)
        .unwrap();
    let result = ledger.submit_oracle_response(
        CallContext::sender(oracles[0]),
        second,
        owner,
        "F1",
        DEPARTURE,
        10,
    );
    if second == first {
        assert!(matches!(result, Err(SuretyError::AlreadyResolved { .. })));
        assert_eq!(ledger.flight_status(&owner, "F1", DEPARTURE), FlightStatus::LateAirline);
    } else {
        assert_eq!(result.unwrap(), ResponseOutcome::Accepted { votes: 1 });
    }
}

#[test]
fn test_unregistered_caller_is_unauthorized() {
    let (mut ledger, owner, _) = ledger_with_oracles(1);
    let index = ledger
        .fetch_flight_status(CallContext::sender(owner), owner, "F1", DEPARTURE)
        .unwrap();
    let stranger = account("stranger");
    assert!(matches!(
        ledger.submit_oracle_response(CallContext::sender(stranger), index, owner, "F1", DEPARTURE, 20),
        Err(SuretyError::UnauthorizedOracle { .. })
    ));
}
