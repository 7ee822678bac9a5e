#![allow(dead_code)]

use surety_core::config::{LedgerConfig, OracleParams};
use surety_core::units::units;
use surety_core::{AccountId, CallContext, FlightSuretyLedger};

pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub fn account(label: &str) -> AccountId {
    AccountId::from_label(label)
}

/// Testing preset where every oracle holds every index
pub fn shared_index_config(seed: u64) -> LedgerConfig {
    LedgerConfig {
        oracles: OracleParams {
            index_space: 3,
            indexes_per_oracle: 3,
            ..OracleParams::default()
        },
        ..LedgerConfig::testing(seed)
    }
}

/// Register fresh oracles until `count` of them hold `index`.
///
/// Returns the holders in registration order.
pub fn oracles_holding(ledger: &mut FlightSuretyLedger, index: u8, count: usize) -> Vec<AccountId> {
    let mut holders = Vec::new();
    let mut n = ledger.oracles().oracle_count();
    while holders.len() < count {
        let oracle = account(&format!("oracle-{}", n));
        let indexes = ledger
            .register_oracle(CallContext::with_value(oracle, units(1)))
            .unwrap();
        if indexes.contains(&index) {
            holders.push(oracle);
        }
        n += 1;
    }
    holders
}
