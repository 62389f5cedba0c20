use std::path::Path;

use ethers::types::Transaction;
use parking_lot::Mutex;

use super::{system_clock, Clock, TimestampedTransaction, TxStore};
use crate::error::Result;

const TX_TREE: &str = "relay_txs";

/// SledTxStore persists the transaction records in a
/// [Sled](https://sled.rs) tree. The key is the 8-byte big-endian nonce, so
/// the tree's natural key order is nonce order; the value is the record
/// encoding of [`TimestampedTransaction`].
#[derive(Clone)]
pub struct SledTxStore {
    db: sled::Db,
    // serializes read-modify-write operations; sled only makes single ops atomic
    write_lock: std::sync::Arc<Mutex<()>>,
    clock: Clock,
}

impl std::fmt::Debug for SledTxStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledTxStore").finish()
    }
}

impl SledTxStore {
    /// Opens (or creates) the store at the given path, on the system clock.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_clock(path, system_clock())
    }

    /// Opens (or creates) the store at the given path, on the given clock.
    pub fn open_with_clock<P: AsRef<Path>>(
        path: P,
        clock: Clock,
    ) -> Result<Self> {
        let db = sled::Config::new()
            .path(path)
            .temporary(cfg!(test))
            .use_compression(true)
            .compression_factor(18)
            .open()?;
        Ok(Self {
            db,
            write_lock: std::sync::Arc::new(Mutex::new(())),
            clock,
        })
    }

    fn tree(&self) -> Result<sled::Tree> {
        Ok(self.db.open_tree(TX_TREE)?)
    }
}

fn nonce_key(nonce: u64) -> [u8; 8] {
    nonce.to_be_bytes()
}

impl TxStore for SledTxStore {
    #[tracing::instrument(skip_all, fields(nonce = %tx.nonce))]
    fn save(&self, tx: &Transaction) -> Result<()> {
        let _guard = self.write_lock.lock();
        let tree = self.tree()?;
        let record = TimestampedTransaction {
            tx: tx.clone(),
            timestamp: (self.clock)(),
        };
        tree.insert(nonce_key(tx.nonce.as_u64()), record.encode())?;
        Ok(())
    }

    fn get_first(&self) -> Result<Option<TimestampedTransaction>> {
        let tree = self.tree()?;
        match tree.first()? {
            Some((_, value)) => {
                Ok(Some(TimestampedTransaction::decode(&value)?))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip_all, fields(nonce = %tx.nonce))]
    fn update_by_nonce(&self, tx: &Transaction) -> Result<()> {
        let _guard = self.write_lock.lock();
        let tree = self.tree()?;
        let nonce = tx.nonce.as_u64();
        if tree.get(nonce_key(nonce))?.is_none() {
            return Err(crate::Error::TxNotFound(nonce));
        }
        let record = TimestampedTransaction {
            tx: tx.clone(),
            timestamp: (self.clock)(),
        };
        tree.insert(nonce_key(nonce), record.encode())?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn remove_less_than(&self, nonce: u64) -> Result<()> {
        let _guard = self.write_lock.lock();
        let tree = self.tree()?;
        let mut batch = sled::Batch::default();
        for item in tree.range(..nonce_key(nonce)) {
            let (key, _) = item?;
            batch.remove(key);
        }
        tree.apply_batch(batch)?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<TimestampedTransaction>> {
        let tree = self.tree()?;
        let mut txs = Vec::with_capacity(tree.len());
        for item in tree.iter() {
            let (_, value) = item?;
            txs.push(TimestampedTransaction::decode(&value)?);
        }
        Ok(txs)
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        let tree = self.tree()?;
        tree.clear()?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
