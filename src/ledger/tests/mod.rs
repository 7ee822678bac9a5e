use super::*;
use crate::config::OracleParams;
use crate::units::units;


pub fn account(label: &str) -> AccountId {
    AccountId::from_label(label)
}

pub fn owner() -> AccountId {
    account("owner")
}

/// Default constants, except every oracle holds every index
pub fn test_config() -> LedgerConfig {
    LedgerConfig {
        oracles: OracleParams {
            index_space: 3,
            indexes_per_oracle: 3,
            ..OracleParams::default()
        },
        ..LedgerConfig::testing(7)
    }
}

pub fn new_ledger() -> FlightSuretyLedger {
    FlightSuretyLedger::new(owner(), test_config()).unwrap()
}

/// Ledger whose genesis airline is funded
pub fn funded_ledger() -> FlightSuretyLedger {
    let mut ledger = new_ledger();
    ledger
        .fund_airline(CallContext::with_value(owner(), units(10)))
        .unwrap();
    ledger
}

pub fn register_oracles(ledger: &mut FlightSuretyLedger, count: usize) -> Vec<AccountId> {
    (0..count)
        .map(|n| {
            let oracle = account(&format!("oracle-{}", n));
            ledger
                .register_oracle(CallContext::with_value(oracle, units(1)))
                .unwrap();
            oracle
        })
        .collect()
}

/// Drive a status request for `airline`/`code`/`timestamp` to resolution
pub fn resolve_flight(
    ledger: &mut FlightSuretyLedger,
    oracles: &[AccountId],
    airline: AccountId,
    code: &str,
    timestamp: u64,
    status_code: u8,
) {
    let index = ledger
        .fetch_flight_status(CallContext::sender(account("requester")), airline, code, timestamp)
        .unwrap();
    for oracle in oracles.iter().take(ledger.config().oracles.quorum) {
        ledger
            .submit_oracle_response(
                CallContext::sender(*oracle),
                index,
                airline,
                code,
                timestamp,
                status_code,
            )
            .unwrap();
    }
}
