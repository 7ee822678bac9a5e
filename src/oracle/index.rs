use rand::rngs::OsRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

use crate::types::AccountId;

/// Source of oracle indexes.
///
/// Every draw hashes the ledger seed, the requesting account, the ledger height
/// and a running nonce, then samples from a ChaCha20 stream keyed by the digest.
/// With a fixed seed the whole sequence is reproducible.
pub struct IndexGenerator {
    seed: [u8; 32],
    nonce: u64,
}

impl IndexGenerator {
    pub fn from_seed_bytes(seed: [u8; 32]) -> Self {
        Self { seed, nonce: 0 }
    }

    /// Derive the 32-byte seed from a numeric one, or from the OS when `None`
    pub fn from_config_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(value) => {
                let mut hasher = Sha256::new();
                hasher.update(b"surety-index-seed");
                hasher.update(value.to_le_bytes());
                let mut bytes = [0u8; 32];
                bytes.copy_from_slice(&hasher.finalize());
                Self::from_seed_bytes(bytes)
            }
            None => {
                let mut bytes = [0u8; 32];
                OsRng.fill_bytes(&mut bytes);
                Self::from_seed_bytes(bytes)
            }
        }
    }

    /// Draws made so far
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// One uniform index from `0..space`
    pub fn next_index(&mut self, account: &AccountId, height: u64, space: u8) -> u8 {
        let mut hasher = Sha256::new();
        hasher.update(self.seed);
        hasher.update(account.as_bytes());
        hasher.update(height.to_le_bytes());
        hasher.update(self.nonce.to_le_bytes());
        self.nonce += 1;

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());
        let mut rng = ChaCha20Rng::from_seed(digest);
        rng.gen_range(0..space.max(1))
    }

    /// `count` distinct indexes from `0..space`, in draw order.
    ///
    /// Collisions are resampled. `count` is capped at `space`.
    pub fn distinct_indexes(
        &mut self,
        account: &AccountId,
        height: u64,
        space: u8,
        count: usize,
    ) -> Vec<u8> {
        let count = count.min(space as usize);
        let mut indexes = Vec::with_capacity(count);
        while indexes.len() < count {
            let index = self.next_index(account, height, space);
            if !indexes.contains(&index) {
                indexes.push(index);
            }
        }
        indexes
    }
}

impl std::fmt::Debug for IndexGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Seed stays out of logs
        f.debug_struct("IndexGenerator")
            .field("nonce", &self.nonce)
            .finish()
    }
}
