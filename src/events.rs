//! Ledger event broadcast.
//!
//! Off-ledger processes (the oracle network, UIs) learn about state changes by
//! subscribing to the ledger's [`EventBus`]. Delivery is fire-and-forget: the
//! bus never inspects what a listener does with an event.

use log::{debug, trace};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::flight::FlightStatus;
use crate::types::{AccountId, Wei};

/// Something that happened on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum LedgerEvent {
    OperationalStatusChanged {
        operational: bool,
    },
    AirlineRegistered {
        airline: AccountId,
        registered_count: usize,
    },
    AirlineVoteRecorded {
        candidate: AccountId,
        voter: AccountId,
        votes: usize,
        required: usize,
    },
    AirlineFunded {
        airline: AccountId,
        total_funding: Wei,
    },
    FlightRegistered {
        airline: AccountId,
        flight_code: String,
        timestamp: u64,
    },
    InsurancePurchased {
        passenger: AccountId,
        airline: AccountId,
        flight_code: String,
        premium: Wei,
    },
    InsuranceClaimed {
        passenger: AccountId,
        airline: AccountId,
        flight_code: String,
        credit: Wei,
    },
    CreditPaid {
        passenger: AccountId,
        airline: AccountId,
        flight_code: String,
        amount: Wei,
    },
    OracleRegistered {
        oracle: AccountId,
        indexes: Vec<u8>,
    },
    /// Broadcast asking oracles holding `index` to report on a flight
    OracleRequest {
        index: u8,
        airline: AccountId,
        flight_code: String,
        timestamp: u64,
    },
    OracleReport {
        oracle: AccountId,
        airline: AccountId,
        flight_code: String,
        timestamp: u64,
        status: FlightStatus,
    },
    /// Terminal event of an oracle request
    FlightStatusInfo {
        airline: AccountId,
        flight_code: String,
        timestamp: u64,
        status: FlightStatus,
    },
}

impl LedgerEvent {
    /// Short event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::OperationalStatusChanged { .. } => "OperationalStatusChanged",
            LedgerEvent::AirlineRegistered { .. } => "AirlineRegistered",
            LedgerEvent::AirlineVoteRecorded { .. } => "AirlineVoteRecorded",
            LedgerEvent::AirlineFunded { .. } => "AirlineFunded",
            LedgerEvent::FlightRegistered { .. } => "FlightRegistered",
            LedgerEvent::InsurancePurchased { .. } => "InsurancePurchased",
            LedgerEvent::InsuranceClaimed { .. } => "InsuranceClaimed",
            LedgerEvent::CreditPaid { .. } => "CreditPaid",
            LedgerEvent::OracleRegistered { .. } => "OracleRegistered",
            LedgerEvent::OracleRequest { .. } => "OracleRequest",
            LedgerEvent::OracleReport { .. } => "OracleReport",
            LedgerEvent::FlightStatusInfo { .. } => "FlightStatusInfo",
        }
    }
}

/// Trait for listeners that respond to ledger events
#[cfg_attr(test, mockall::automock)]
pub trait LedgerEventListener: Send + Sync {
    /// Called once per event, after the emitting operation has committed
    fn on_event(&self, event: &LedgerEvent);
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Subscriber registry plus an append-only journal of every delivered event
#[derive(Default)]
pub struct EventBus {
    listeners: BTreeMap<SubscriptionId, Arc<dyn LedgerEventListener>>,
    next_id: u64,
    journal: Vec<LedgerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Arc<dyn LedgerEventListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.insert(id, listener);
        debug!("Listener {:?} subscribed", id);
        id
    }

    /// Returns `false` if the subscription was unknown
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver events in order to every listener, in subscription order
    pub(crate) fn publish(&mut self, events: Vec<LedgerEvent>) {
        for event in events {
            trace!("Publishing {}", event.name());
            for listener in self.listeners.values() {
                listener.on_event(&event);
            }
            self.journal.push(event);
        }
    }

    /// Every event published so far
    pub fn journal(&self) -> &[LedgerEvent] {
        &self.journal
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("journal", &self.journal.len())
            .finish()
    }
}
