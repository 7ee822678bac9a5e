use log::{debug, info};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::index::IndexGenerator;
use crate::config::OracleParams;
use crate::errors::{Result, SuretyError};
use crate::flight::{FlightKey, FlightStatus};
use crate::types::{AccountId, Wei};

/// A registered oracle and the indexes it answers for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleRecord {
    pub id: AccountId,
    /// Fixed at registration
    pub indexes: Vec<u8>,
    pub fee_paid: Wei,
    pub registered_at: u64,
}

impl OracleRecord {
    pub fn holds(&self, index: u8) -> bool {
        self.indexes.contains(&index)
    }
}

/// Identifies one status request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResponseKey {
    pub index: u8,
    pub flight: FlightKey,
}

impl ResponseKey {
    pub fn new(index: u8, flight: FlightKey) -> Self {
        Self { index, flight }
    }
}

/// An open or resolved status request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleRequest {
    pub key: ResponseKey,
    pub requester: AccountId,
    pub opened_at: u64,
    responses: BTreeMap<FlightStatus, BTreeSet<AccountId>>,
    resolution: Option<FlightStatus>,
}

impl OracleRequest {
    fn new(key: ResponseKey, requester: AccountId, opened_at: u64) -> Self {
        Self {
            key,
            requester,
            opened_at,
            responses: BTreeMap::new(),
            resolution: None,
        }
    }

    pub fn resolution(&self) -> Option<FlightStatus> {
        self.resolution
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// Oracles that reported `status`
    pub fn votes_for(&self, status: FlightStatus) -> usize {
        self.responses.get(&status).map_or(0, BTreeSet::len)
    }

    /// The status an oracle reported, if it answered
    pub fn response_of(&self, oracle: &AccountId) -> Option<FlightStatus> {
        self.responses
            .iter()
            .find(|(_, voters)| voters.contains(oracle))
            .map(|(status, _)| *status)
    }

    pub fn response_count(&self) -> usize {
        self.responses.values().map(BTreeSet::len).sum()
    }
}

/// Result of a `submit_response` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Response counted; `votes` oracles now back this status
    Accepted { votes: usize },
    /// Oracle had already reported this status; nothing changed
    Duplicate,
    /// This response reached quorum
    Resolved(FlightStatus),
}

/// Oracle registry and per-request response tallies.
///
/// A request resolves to the first status reported by `quorum` distinct
/// oracles. Buckets are sets, so the order responses arrive in does not
/// affect the outcome.
#[derive(Debug)]
pub struct OracleConsensus {
    oracles: HashMap<AccountId, OracleRecord>,
    requests: HashMap<ResponseKey, OracleRequest>,
    generator: IndexGenerator,
    params: OracleParams,
}

impl OracleConsensus {
    pub fn new(params: OracleParams, generator: IndexGenerator) -> Self {
        Self {
            oracles: HashMap::new(),
            requests: HashMap::new(),
            generator,
            params,
        }
    }

    pub fn params(&self) -> &OracleParams {
        &self.params
    }

    pub fn oracle_count(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_registered(&self, id: &AccountId) -> bool {
        self.oracles.contains_key(id)
    }

    pub fn oracle(&self, id: &AccountId) -> Option<&OracleRecord> {
        self.oracles.get(id)
    }

    pub fn indexes_of(&self, id: &AccountId) -> Result<&[u8]> {
        self.oracles
            .get(id)
            .map(|record| record.indexes.as_slice())
            .ok_or(SuretyError::OracleNotRegistered(*id))
    }

    pub fn request(&self, key: &ResponseKey) -> Option<&OracleRequest> {
        self.requests.get(key)
    }

    /// Requests that have not reached quorum
    pub fn open_requests(&self) -> impl Iterator<Item = &OracleRequest> {
        self.requests.values().filter(|r| !r.is_resolved())
    }

    pub(crate) fn check_registration(&self, id: &AccountId, fee: Wei) -> Result<()> {
        if fee < self.params.registration_fee {
            return Err(SuretyError::insufficient(
                format!(
                    "oracle registration requires {} wei",
                    self.params.registration_fee
                ),
                fee,
            ));
        }
        if self.is_registered(id) {
            return Err(SuretyError::OracleAlreadyRegistered(*id));
        }
        Ok(())
    }

    pub(crate) fn register_oracle(&mut self, id: AccountId, fee: Wei, height: u64) -> Result<Vec<u8>> {
        self.check_registration(&id, fee)?;
        let indexes = self.generator.distinct_indexes(
            &id,
            height,
            self.params.index_space,
            self.params.indexes_per_oracle,
        );
        info!("Oracle {} registered with indexes {:?}", id.short(), indexes);
        self.oracles.insert(
            id,
            OracleRecord {
                id,
                indexes: indexes.clone(),
                fee_paid: fee,
                registered_at: height,
            },
        );
        Ok(indexes)
    }

    /// Fresh uniform index for a status request
    pub(crate) fn draw_request_index(&mut self, requester: &AccountId, height: u64) -> u8 {
        self.generator
            .next_index(requester, height, self.params.index_space)
    }

    /// Open a request unless one already exists for the key. Returns `true`
    /// when a new request was opened.
    pub(crate) fn open_request(&mut self, key: ResponseKey, requester: AccountId, height: u64) -> bool {
        if self.requests.contains_key(&key) {
            debug!("Request {} on index {} already exists", key.flight, key.index);
            return false;
        }
        debug!("Opened request {} on index {}", key.flight, key.index);
        self.requests
            .insert(key.clone(), OracleRequest::new(key, requester, height));
        true
    }

    /// Check every precondition of `submit_response` without mutating.
    ///
    /// Returns `Ok(true)` when the submission repeats an earlier identical
    /// response.
    pub(crate) fn check_response(
        &self,
        oracle: &AccountId,
        key: &ResponseKey,
        status: FlightStatus,
    ) -> Result<bool> {
        let holds_index = self
            .oracles
            .get(oracle)
            .map_or(false, |record| record.holds(key.index));
        if !holds_index {
            return Err(SuretyError::UnauthorizedOracle {
                oracle: *oracle,
                index: key.index,
            });
        }

        let request = self
            .requests
            .get(key)
            .ok_or_else(|| SuretyError::RequestNotFound {
                index: key.index,
                flight_code: key.flight.code.clone(),
                timestamp: key.flight.timestamp,
            })?;

        if request.is_resolved() {
            return Err(SuretyError::AlreadyResolved {
                flight_code: key.flight.code.clone(),
                timestamp: key.flight.timestamp,
            });
        }

        match request.response_of(oracle) {
            Some(previous) if previous == status => Ok(true),
            Some(_) => Err(SuretyError::ConflictingResponse { oracle: *oracle }),
            None => Ok(false),
        }
    }

    pub(crate) fn submit_response(
        &mut self,
        oracle: AccountId,
        key: &ResponseKey,
        status: FlightStatus,
    ) -> Result<ResponseOutcome> {
        if self.check_response(&oracle, key, status)? {
            debug!("Repeat response from {} ignored", oracle.short());
            return Ok(ResponseOutcome::Duplicate);
        }

        let quorum = self.params.quorum;
        let request = self
            .requests
            .get_mut(key)
            .ok_or_else(|| SuretyError::RequestNotFound {
                index: key.index,
                flight_code: key.flight.code.clone(),
                timestamp: key.flight.timestamp,
            })?;

        let bucket = request.responses.entry(status).or_default();
        bucket.insert(oracle);
        let votes = bucket.len();
        debug!(
            "Oracle {} reported {} for {} ({}/{})",
            oracle.short(),
            status,
            key.flight,
            votes,
            quorum
        );

        if votes >= quorum {
            request.resolution = Some(status);
            info!("Flight {} resolved as {}", key.flight, status);
            return Ok(ResponseOutcome::Resolved(status));
        }
        Ok(ResponseOutcome::Accepted { votes })
    }
}
