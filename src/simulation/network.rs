//! In-process oracle network.
//!
//! Mirrors an off-ledger oracle server: a set of registered oracles that wait
//! for `OracleRequest` broadcasts and answer the ones addressed to an index
//! they hold.

use log::{debug, info};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::errors::{Result, SuretyError};
use crate::events::{LedgerEvent, LedgerEventListener, SubscriptionId};
use crate::flight::{FlightKey, FlightStatus};
use crate::ledger::FlightSuretyLedger;
use crate::oracle::{ResponseKey, ResponseOutcome};
use crate::types::{AccountId, CallContext, Wei};

/// How simulated oracles choose the status they report
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResponseBehavior {
    /// Uniformly random status code
    Random,
    /// Report the known true status with probability `accuracy`, otherwise random
    Truthful { accuracy: f64 },
}

impl Default for ResponseBehavior {
    fn default() -> Self {
        ResponseBehavior::Random
    }
}

/// A status request heard on the event bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub index: u8,
    pub flight: FlightKey,
}

/// Event listener queuing `OracleRequest` broadcasts for later processing.
///
/// The ledger is never re-entered from inside `on_event`.
#[derive(Debug, Default)]
pub struct RequestQueue {
    pending: Mutex<VecDeque<PendingRequest>>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    pub fn drain(&self) -> Vec<PendingRequest> {
        self.pending.lock().drain(..).collect()
    }
}

impl LedgerEventListener for RequestQueue {
    fn on_event(&self, event: &LedgerEvent) {
        if let LedgerEvent::OracleRequest {
            index,
            airline,
            flight_code,
            timestamp,
        } = event
        {
            self.pending.lock().push_back(PendingRequest {
                index: *index,
                flight: FlightKey::new(*airline, flight_code.clone(), *timestamp),
            });
        }
    }
}

/// Tally of one processed request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTally {
    pub submitted: usize,
    pub rejected: usize,
    pub resolution: Option<FlightStatus>,
}

/// Registered oracles plus the queue feeding them
pub struct OracleNetwork {
    oracles: Vec<(AccountId, Vec<u8>)>,
    queue: Arc<RequestQueue>,
    subscription: Option<SubscriptionId>,
    rng: ChaCha20Rng,
    behavior: ResponseBehavior,
    ground_truth: HashMap<FlightKey, FlightStatus>,
}

impl OracleNetwork {
    pub fn new(seed: u64, behavior: ResponseBehavior) -> Self {
        Self {
            oracles: Vec::new(),
            queue: Arc::new(RequestQueue::new()),
            subscription: None,
            rng: ChaCha20Rng::seed_from_u64(seed),
            behavior,
            ground_truth: HashMap::new(),
        }
    }

    pub fn oracle_count(&self) -> usize {
        self.oracles.len()
    }

    pub fn oracles(&self) -> impl Iterator<Item = &AccountId> {
        self.oracles.iter().map(|(id, _)| id)
    }

    pub fn queue(&self) -> &Arc<RequestQueue> {
        &self.queue
    }

    /// Subscribe to the ledger (once) and register `count` new oracles paying
    /// `fee` each.
    pub fn launch(&mut self, ledger: &mut FlightSuretyLedger, count: usize, fee: Wei) -> Result<()> {
        if self.subscription.is_none() {
            let listener: Arc<dyn LedgerEventListener> = self.queue.clone();
            self.subscription = Some(ledger.subscribe(listener));
        }

        let start = self.oracles.len();
        for n in start..start + count {
            let id = AccountId::from_label(&format!("oracle-{}", n));
            ledger.register_oracle(CallContext::with_value(id, fee))?;
            let indexes = ledger.get_my_indexes(&id)?;
            debug!("Oracle {} listening on {:?}", id.short(), indexes);
            self.oracles.push((id, indexes));
        }
        info!("Oracle network running with {} oracles", self.oracles.len());
        Ok(())
    }

    /// Stop listening for requests
    pub fn shutdown(&mut self, ledger: &mut FlightSuretyLedger) {
        if let Some(id) = self.subscription.take() {
            ledger.unsubscribe(id);
        }
    }

    /// Status that `Truthful` oracles report for a flight
    pub fn set_ground_truth(&mut self, flight: FlightKey, status: FlightStatus) {
        self.ground_truth.insert(flight, status);
    }

    fn pick_status(&mut self, flight: &FlightKey) -> FlightStatus {
        let random = FlightStatus::ALL[self.rng.gen_range(0..FlightStatus::ALL.len())];
        match self.behavior {
            ResponseBehavior::Random => random,
            ResponseBehavior::Truthful { accuracy } => match self.ground_truth.get(flight) {
                Some(truth) if self.rng.gen_bool(accuracy.clamp(0.0, 1.0)) => *truth,
                _ => random,
            },
        }
    }

    /// Answer every queued request. Returns one tally per request, in the
    /// order the requests were broadcast.
    pub fn process_pending(&mut self, ledger: &mut FlightSuretyLedger) -> Result<Vec<(PendingRequest, RequestTally)>> {
        let mut tallies = Vec::new();
        for request in self.queue.drain() {
            let tally = self.answer(ledger, &request)?;
            tallies.push((request, tally));
        }
        Ok(tallies)
    }

    fn answer(&mut self, ledger: &mut FlightSuretyLedger, request: &PendingRequest) -> Result<RequestTally> {
        let responders: Vec<AccountId> = self
            .oracles
            .iter()
            .filter(|(_, indexes)| indexes.contains(&request.index))
            .map(|(id, _)| *id)
            .collect();

        let mut tally = RequestTally::default();
        for oracle in responders {
            let status = self.pick_status(&request.flight);
            let result = ledger.submit_oracle_response(
                CallContext::sender(oracle),
                request.index,
                request.flight.airline,
                &request.flight.code,
                request.flight.timestamp,
                status.code(),
            );
            match result {
                Ok(ResponseOutcome::Resolved(resolved)) => {
                    tally.submitted += 1;
                    tally.resolution = Some(resolved);
                    break;
                }
                Ok(_) => tally.submitted += 1,
                Err(SuretyError::AlreadyResolved { .. }) => {
                    // Request was resolved by an earlier broadcast
                    tally.resolution = ledger
                        .oracles()
                        .request(&ResponseKey::new(request.index, request.flight.clone()))
                        .and_then(|r| r.resolution());
                    break;
                }
                Err(SuretyError::Halted) => return Err(SuretyError::Halted),
                Err(e) => {
                    debug!("Oracle {} response rejected: {}", oracle.short(), e);
                    tally.rejected += 1;
                }
            }
        }
        Ok(tally)
    }
}

impl std::fmt::Debug for OracleNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleNetwork")
            .field("oracles", &self.oracles.len())
            .field("pending", &self.queue.len())
            .field("behavior", &self.behavior)
            .finish()
    }
}
