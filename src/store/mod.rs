// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
//! # Transaction Store Module
//!
//! A durable, ordered set of the relay's submitted transactions, keyed by
//! nonce. The reconciler relies on it to find the oldest outstanding
//! submission after a restart, bump its gas price when it is stuck, and
//! prune records once they are deeply confirmed.
//!
//! Two backings exist behind the same contract: an in-memory ordered map
//! for tests and dev runs, and a [Sled](https://sled.rs)-based store for
//! production.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ethers::types::{Bytes, Transaction, H256};
use ethers::utils::keccak256;

use crate::error::Result;

/// A module for managing in-memory storage of submitted transactions.
pub mod mem;
/// A module for setting up and managing a [Sled](https://sled.rs)-based
/// transaction store.
pub mod sled;

/// A clock yielding unix seconds. Injectable so tests can control record
/// timestamps and the reconciler's age threshold.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// The system clock.
pub fn system_clock() -> Clock {
    Arc::new(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    })
}

/// A signed transaction together with the time it was last submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampedTransaction {
    /// The signed transaction.
    pub tx: Transaction,
    /// Unix seconds of the last save or update.
    pub timestamp: u64,
}

impl TimestampedTransaction {
    /// Encodes the record as the 8-byte big-endian timestamp followed by
    /// the canonical signed-transaction wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let raw = self.tx.rlp();
        let mut bytes = Vec::with_capacity(8 + raw.len());
        bytes.extend_from_slice(&self.timestamp.to_be_bytes());
        bytes.extend_from_slice(&raw);
        bytes
    }

    /// Decodes a record produced by [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() <= 8 {
            return Err(crate::Error::Generic(
                "stored transaction record is too short",
            ));
        }
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&bytes[..8]);
        let raw = &bytes[8..];
        let mut tx: Transaction = rlp::decode(raw)?;
        tx.hash = H256::from(keccak256(raw));
        Ok(Self {
            tx,
            timestamp: u64::from_be_bytes(ts),
        })
    }

    /// The raw signed wire bytes of the transaction.
    pub fn raw(&self) -> Bytes {
        self.tx.rlp()
    }
}

/// TxStore is the contract of the relay's durable transaction record.
///
/// Records are totally ordered by nonce and unique by nonce; a `save` with
/// an already-present nonce overwrites the record. All mutating operations
/// are serialized by an internal lock; readers observe a consistent
/// snapshot.
pub trait TxStore: Send + Sync {
    /// Dates and stores a transaction, keyed and ordered by its nonce.
    fn save(&self, tx: &Transaction) -> Result<()>;
    /// Returns the record with the lowest nonce, if any.
    fn get_first(&self) -> Result<Option<TimestampedTransaction>>;
    /// Replaces the record with the same nonce, refreshing its timestamp.
    /// Fails if no record with that nonce exists.
    fn update_by_nonce(&self, tx: &Transaction) -> Result<()>;
    /// Deletes every record with a nonce strictly less than `nonce`.
    fn remove_less_than(&self, nonce: u64) -> Result<()>;
    /// All records ordered by nonce. Only used by tests.
    fn list(&self) -> Result<Vec<TimestampedTransaction>>;
    /// Deletes every record. Only used by tests.
    fn clear(&self) -> Result<()>;
    /// Releases the underlying resources.
    fn close(&self) -> Result<()>;
}

impl<S> TxStore for Arc<S>
where
    S: TxStore,
{
    fn save(&self, tx: &Transaction) -> Result<()> {
        S::save(self, tx)
    }

    fn get_first(&self) -> Result<Option<TimestampedTransaction>> {
        S::get_first(self)
    }

    fn update_by_nonce(&self, tx: &Transaction) -> Result<()> {
        S::update_by_nonce(self, tx)
    }

    fn remove_less_than(&self, nonce: u64) -> Result<()> {
        S::remove_less_than(self, nonce)
    }

    fn list(&self) -> Result<Vec<TimestampedTransaction>> {
        S::list(self)
    }

    fn clear(&self) -> Result<()> {
        S::clear(self)
    }

    fn close(&self) -> Result<()> {
        S::close(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{Address, U256};

    fn signed_tx(nonce: u64) -> Transaction {
        Transaction {
            hash: H256::zero(),
            nonce: nonce.into(),
            from: Address::random(),
            to: Some(
                "0xffcf8fdee72ac11b5c542428b35eef5769c409f0"
                    .parse()
                    .unwrap(),
            ),
            value: U256::from(10u64),
            gas_price: Some(U256::from(2000u64)),
            gas: U256::from(100_000u64),
            input: Bytes::from(vec![0xde, 0xad, 0x00, 0xef]),
            v: 38u64.into(),
            r: U256::from(7u64),
            s: U256::from(9u64),
            ..Default::default()
        }
    }

    #[test]
    fn record_roundtrip_preserves_the_transaction() {
        let mut tx = signed_tx(42);
        let raw = tx.rlp();
        tx.hash = H256::from(keccak256(&raw));
        let record = TimestampedTransaction {
            tx: tx.clone(),
            timestamp: 1_600_000_000,
        };
        let decoded =
            TimestampedTransaction::decode(&record.encode()).unwrap();
        assert_eq!(decoded.timestamp, 1_600_000_000);
        assert_eq!(decoded.tx.nonce, tx.nonce);
        assert_eq!(decoded.tx.to, tx.to);
        assert_eq!(decoded.tx.hash, tx.hash);
        assert_eq!(decoded.tx.gas_price, tx.gas_price);
        assert_eq!(decoded.tx.input, tx.input);
    }

    #[test]
    fn decode_rejects_truncated_records() {
        assert!(TimestampedTransaction::decode(&[0u8; 8]).is_err());
        assert!(TimestampedTransaction::decode(&[]).is_err());
    }
}
