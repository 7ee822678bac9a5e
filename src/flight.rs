use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::errors::{Result, SuretyError};
use crate::types::AccountId;

/// Flight status as reported by oracles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FlightStatus {
    Unknown,
    OnTime,
    LateAirline,
    LateWeather,
    LateTechnical,
    LateOther,
}

impl FlightStatus {
    pub const ALL: [FlightStatus; 6] = [
        FlightStatus::Unknown,
        FlightStatus::OnTime,
        FlightStatus::LateAirline,
        FlightStatus::LateWeather,
        FlightStatus::LateTechnical,
        FlightStatus::LateOther,
    ];

    /// Wire code used by oracle responses
    pub fn code(self) -> u8 {
        match self {
            FlightStatus::Unknown => 0,
            FlightStatus::OnTime => 10,
            FlightStatus::LateAirline => 20,
            FlightStatus::LateWeather => 30,
            FlightStatus::LateTechnical => 40,
            FlightStatus::LateOther => 50,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(FlightStatus::Unknown),
            10 => Ok(FlightStatus::OnTime),
            20 => Ok(FlightStatus::LateAirline),
            30 => Ok(FlightStatus::LateWeather),
            40 => Ok(FlightStatus::LateTechnical),
            50 => Ok(FlightStatus::LateOther),
            other => Err(SuretyError::InvalidStatusCode(other)),
        }
    }

    /// Only airline-caused delays make a policy claimable
    pub fn is_claimable(self) -> bool {
        self == FlightStatus::LateAirline
    }
}

impl Default for FlightStatus {
    fn default() -> Self {
        FlightStatus::Unknown
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlightStatus::Unknown => "unknown",
            FlightStatus::OnTime => "on-time",
            FlightStatus::LateAirline => "late-airline",
            FlightStatus::LateWeather => "late-weather",
            FlightStatus::LateTechnical => "late-technical",
            FlightStatus::LateOther => "late-other",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

/// Natural key of a scheduled departure
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlightKey {
    pub airline: AccountId,
    pub code: String,
    pub timestamp: u64,
}

impl FlightKey {
    pub fn new(airline: AccountId, code: impl Into<String>, timestamp: u64) -> Self {
        Self {
            airline,
            code: code.into(),
            timestamp,
        }
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} by {}", self.code, self.timestamp, self.airline.short())
    }
}

/// A cataloged departure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub key: FlightKey,
    pub status: FlightStatus,
    /// Account that first cataloged the flight
    pub registered_by: AccountId,
    /// Ledger height of the resolution, 0 while unresolved
    pub updated_at: u64,
}

impl Flight {
    pub fn is_resolved(&self) -> bool {
        self.updated_at != 0
    }
}

/// Catalog of known departures and their resolved status.
#[derive(Debug, Default)]
pub struct FlightRegistry {
    flights: HashMap<FlightKey, Flight>,
    /// (airline, code) -> key of the most recently resolved departure
    latest_resolved: HashMap<(AccountId, String), FlightKey>,
}

impl FlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    pub fn contains(&self, key: &FlightKey) -> bool {
        self.flights.contains_key(key)
    }

    /// Catalog a departure. Returns `false` if it was already known.
    pub(crate) fn insert(&mut self, key: FlightKey, registered_by: AccountId) -> bool {
        if self.flights.contains_key(&key) {
            return false;
        }
        debug!("Cataloged flight {}", key);
        self.flights.insert(
            key.clone(),
            Flight {
                key,
                status: FlightStatus::Unknown,
                registered_by,
                updated_at: 0,
            },
        );
        true
    }

    /// Record the resolved status of a departure, cataloging it if needed.
    ///
    /// The first resolution is final: returns `false` and leaves the flight
    /// untouched if it was already resolved.
    pub(crate) fn set_status(&mut self, key: &FlightKey, status: FlightStatus, height: u64) -> bool {
        let flight = self.flights.entry(key.clone()).or_insert_with(|| Flight {
            key: key.clone(),
            status: FlightStatus::Unknown,
            registered_by: key.airline,
            updated_at: 0,
        });
        if flight.is_resolved() {
            debug!(
                "Ignoring {} for {}: already resolved as {}",
                status, key, flight.status
            );
            return false;
        }
        flight.status = status;
        flight.updated_at = height;
        self.latest_resolved
            .insert((key.airline, key.code.clone()), key.clone());
        true
    }

    pub fn flight(&self, key: &FlightKey) -> Option<&Flight> {
        self.flights.get(key)
    }

    /// Status of a departure; absent flights read as Unknown
    pub fn status_of(&self, key: &FlightKey) -> FlightStatus {
        self.flights
            .get(key)
            .map(|f| f.status)
            .unwrap_or_default()
    }

    /// Status of the most recently resolved departure of `code` by `airline`
    pub fn latest_status(&self, airline: &AccountId, code: &str) -> FlightStatus {
        self.latest_resolution(airline, code)
            .map(|flight| flight.status)
            .unwrap_or_default()
    }

    /// Most recently resolved departure of `code` by `airline`
    pub fn latest_resolution(&self, airline: &AccountId, code: &str) -> Option<&Flight> {
        self.latest_resolved
            .get(&(*airline, code.to_string()))
            .and_then(|key| self.flights.get(key))
    }

    /// All departures cataloged for an airline, ordered by timestamp
    pub fn flights_of(&self, airline: &AccountId) -> Vec<&Flight> {
        let mut flights: Vec<&Flight> = self
            .flights
            .values()
            .filter(|f| &f.key.airline == airline)
            .collect();
        flights.sort_by(|a, b| a.key.cmp(&b.key));
        flights
    }
}
