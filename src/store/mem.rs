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
use std::collections::BTreeMap;
use std::sync::Arc;

use ethers::types::Transaction;
use parking_lot::Mutex;

use super::{system_clock, Clock, TimestampedTransaction, TxStore};
use crate::error::Result;

/// MemoryTxStore keeps the transaction records in an ordered in-memory map.
/// Used by tests and short-lived dev runs.
#[derive(Clone)]
pub struct MemoryTxStore {
    transactions: Arc<Mutex<BTreeMap<u64, TimestampedTransaction>>>,
    clock: Clock,
}

impl std::fmt::Debug for MemoryTxStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTxStore").finish()
    }
}

impl Default for MemoryTxStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTxStore {
    /// Creates an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    /// Creates an empty store on the given clock.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            transactions: Arc::new(Mutex::new(BTreeMap::new())),
            clock,
        }
    }
}

impl TxStore for MemoryTxStore {
    #[tracing::instrument(skip_all, fields(nonce = %tx.nonce))]
    fn save(&self, tx: &Transaction) -> Result<()> {
        let mut guard = self.transactions.lock();
        guard.insert(
            tx.nonce.as_u64(),
            TimestampedTransaction {
                tx: tx.clone(),
                timestamp: (self.clock)(),
            },
        );
        Ok(())
    }

    fn get_first(&self) -> Result<Option<TimestampedTransaction>> {
        let guard = self.transactions.lock();
        Ok(guard.values().next().cloned())
    }

    #[tracing::instrument(skip_all, fields(nonce = %tx.nonce))]
    fn update_by_nonce(&self, tx: &Transaction) -> Result<()> {
        let mut guard = self.transactions.lock();
        let nonce = tx.nonce.as_u64();
        match guard.get_mut(&nonce) {
            Some(record) => {
                *record = TimestampedTransaction {
                    tx: tx.clone(),
                    timestamp: (self.clock)(),
                };
                Ok(())
            }
            None => Err(crate::Error::TxNotFound(nonce)),
        }
    }

    #[tracing::instrument(skip(self))]
    fn remove_less_than(&self, nonce: u64) -> Result<()> {
        let mut guard = self.transactions.lock();
        let kept = guard.split_off(&nonce);
        *guard = kept;
        Ok(())
    }

    fn list(&self) -> Result<Vec<TimestampedTransaction>> {
        let guard = self.transactions.lock();
        Ok(guard.values().cloned().collect())
    }

    fn clear(&self) -> Result<()> {
        self.transactions.lock().clear();
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{new_tx, FakeClock};

    #[test]
    fn get_first_on_an_empty_store_returns_none() {
        let store = MemoryTxStore::new();
        assert!(store.get_first().unwrap().is_none());
    }

    #[test]
    fn clear_deletes_all_txs() {
        let store = MemoryTxStore::new();
        store.save(&new_tx(2)).unwrap();
        store.clear().unwrap();
        assert!(store.get_first().unwrap().is_none());
    }

    #[test]
    fn save_stores_the_current_time() {
        let clock = FakeClock::new(1_600_000_000);
        let store = MemoryTxStore::with_clock(clock.clock());
        store.save(&new_tx(2)).unwrap();
        let record = store.get_first().unwrap().unwrap();
        assert_eq!(record.tx.nonce.as_u64(), 2);
        assert_eq!(record.timestamp, 1_600_000_000);
    }

    #[test]
    fn records_are_ordered_by_nonce() {
        let store = MemoryTxStore::new();
        store.save(&new_tx(4)).unwrap();
        store.save(&new_tx(3)).unwrap();
        store.save(&new_tx(5)).unwrap();
        assert_eq!(store.get_first().unwrap().unwrap().tx.nonce.as_u64(), 3);
    }

    #[test]
    fn update_by_nonce_replaces_the_payload() {
        let store = MemoryTxStore::new();
        let updated = new_tx(4);
        store.save(&new_tx(4)).unwrap();
        store.save(&new_tx(3)).unwrap();
        store.save(&new_tx(5)).unwrap();
        store.update_by_nonce(&updated).unwrap();
        let txs = store.list().unwrap();
        assert_eq!(txs[1].tx.hash, updated.hash);
    }

    #[test]
    fn update_by_nonce_fails_if_the_tx_is_not_present() {
        let store = MemoryTxStore::new();
        store.save(&new_tx(3)).unwrap();
        let err = store.update_by_nonce(&new_tx(4)).unwrap_err();
        assert!(matches!(err, crate::Error::TxNotFound(4)));
    }

    #[test]
    fn remove_less_than_is_strict_and_idempotent() {
        let store = MemoryTxStore::new();
        store.save(&new_tx(4)).unwrap();
        store.save(&new_tx(3)).unwrap();
        store.save(&new_tx(7)).unwrap();
        store.save(&new_tx(5)).unwrap();
        store.remove_less_than(5).unwrap();
        let txs = store.list().unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].tx.nonce.as_u64(), 5);
        assert_eq!(txs[1].tx.nonce.as_u64(), 7);
        // a second pass removes nothing more
        store.remove_less_than(5).unwrap();
        assert_eq!(store.list().unwrap().len(), 2);
    }
}
