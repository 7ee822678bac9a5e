//! Oracle registration, index assignment and status consensus

pub mod consensus;
pub mod index;

pub use consensus::{OracleConsensus, OracleRecord, OracleRequest, ResponseKey, ResponseOutcome};
pub use index::IndexGenerator;
