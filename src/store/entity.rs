//! One tenant bucket: get/put/delete over a transactional storage tree,
//! with metric hooks wired through the same write path (C4).

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::metrics::StoreAggregator;

/// The persisted, public shape of a store — exactly what's JSON-encoded
/// into the metadata bucket and returned on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: u16,
    pub token: String,
    #[serde(rename = "ownerId")]
    pub owner_id: u64,
    #[serde(rename = "submissionId")]
    pub submission_id: u64,
}

/// Fields an admin PATCH may carry; zero/empty means "leave unchanged"
/// (§4.6 patch semantics — `id` is never patchable).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorePatch {
    #[serde(rename = "ownerId", default)]
    pub owner_id: u64,
    #[serde(rename = "submissionId", default)]
    pub submission_id: u64,
    #[serde(default)]
    pub token: String,
}

pub fn bucket_name(id: u16) -> String {
    format!("stores.{id}.items")
}

pub struct Store {
    meta: RwLock<StoreRecord>,
    tree: sled::Tree,
    metrics: Arc<StoreAggregator>,
}

impl Store {
    /// Opens (or creates) the store's data bucket and scans it once to seed
    /// the aggregator's length/size totals — used both for freshly created
    /// stores (empty bucket) and for rehydration at startup.
    pub fn attach(db: &sled::Db, record: StoreRecord) -> StoreResult<Self> {
        let tree = db.open_tree(bucket_name(record.id))?;
        let (length, size) = scan_totals(&tree)?;
        Ok(Self {
            meta: RwLock::new(record),
            tree,
            metrics: Arc::new(StoreAggregator::new(length, size)),
        })
    }

    pub fn id(&self) -> u16 {
        self.meta.read().unwrap().id
    }

    pub fn token(&self) -> String {
        self.meta.read().unwrap().token.clone()
    }

    pub fn record(&self) -> StoreRecord {
        self.meta.read().unwrap().clone()
    }

    pub fn set_token(&self, token: String) {
        self.meta.write().unwrap().token = token;
    }

    /// Applies only the non-zero/non-empty fields of a patch (§4.6).
    pub fn apply_patch(&self, patch: &StorePatch) {
        let mut meta = self.meta.write().unwrap();
        if patch.owner_id != 0 {
            meta.owner_id = patch.owner_id;
        }
        if patch.submission_id != 0 {
            meta.submission_id = patch.submission_id;
        }
        if !patch.token.is_empty() {
            meta.token = patch.token.clone();
        }
    }

    pub fn metrics(&self) -> Arc<StoreAggregator> {
        self.metrics.clone()
    }

    /// Always increments the read counter, even on a miss — the read was
    /// serviced regardless of whether the key existed.
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.metrics.inc_reads();
        Ok(self.tree.get(key)?.map(|v| v.to_vec()))
    }

    /// Reads the current value and writes the new one inside a single
    /// backing transaction, so the length/size delta is computed against
    /// the exact snapshot being replaced.
    pub fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let key = key.to_vec();
        let value = value.to_vec();
        let old_len: Option<u64> = self.tree.transaction::<_, _, std::convert::Infallible>(|tx| {
            let old = tx.get(&key)?;
            tx.insert(key.as_slice(), value.clone())?;
            Ok(old.map(|v| v.len() as u64))
        })?;

        let len_delta = if old_len.is_some() { 0u64 } else { 1u64 };
        let size_delta = (value.len() as u64).wrapping_sub(old_len.unwrap_or(0));
        self.metrics.inc_writes(len_delta, size_delta);
        Ok(())
    }

    /// No-op, no error, if the key is absent.
    pub fn delete(&self, key: &[u8]) -> StoreResult<()> {
        let key_owned = key.to_vec();
        let old_len: Option<u64> = self.tree.transaction::<_, _, std::convert::Infallible>(|tx| {
            let old = tx.get(&key_owned)?;
            if old.is_some() {
                tx.remove(key_owned.as_slice())?;
            }
            Ok(old.map(|v| v.len() as u64))
        })?;

        if let Some(len) = old_len {
            self.metrics.inc_writes(1u64.wrapping_neg(), len.wrapping_neg());
        }
        Ok(())
    }
}

fn scan_totals(tree: &sled::Tree) -> StoreResult<(u64, u64)> {
    let mut length = 0u64;
    let mut size = 0u64;
    for entry in tree.iter() {
        let (_, value) = entry?;
        length += 1;
        size += value.len() as u64;
    }
    Ok((length, size))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_store(id: u16) -> (sled::Db, Store) {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let record = StoreRecord { id, token: "a".repeat(16), owner_id: 1, submission_id: 0 };
        let store = Store::attach(&db, record).unwrap();
        (db, store)
    }

    #[test]
    fn put_then_get_round_trips() {
        let (_db, store) = fresh_store(1);
        store.put(b"k", b"v").unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn get_on_miss_still_counts_a_read() {
        let (_db, store) = fresh_store(1);
        assert_eq!(store.get(b"missing").unwrap(), None);
        assert_eq!(store.metrics().collect().reads_sec, 1);
    }

    #[test]
    fn metrics_track_length_and_size_across_put_delete() {
        let (_db, store) = fresh_store(1);
        store.put(b"a", b"xx").unwrap();
        store.put(b"b", b"yyy").unwrap();
        store.put(b"a", b"zzzz").unwrap();
        store.delete(b"b").unwrap();
        let snap = store.metrics().collect();
        assert_eq!(snap.length, 1);
        assert_eq!(snap.size, 4);
        assert_eq!(snap.writes_sec, 4);
    }

    #[test]
    fn delete_missing_key_is_a_noop() {
        let (_db, store) = fresh_store(1);
        store.delete(b"nope").unwrap();
        assert_eq!(store.metrics().collect().writes_sec, 0);
    }

    #[test]
    fn rehydration_recomputes_totals_from_the_bucket() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let record = StoreRecord { id: 2, token: "b".repeat(16), owner_id: 1, submission_id: 0 };
        {
            let store = Store::attach(&db, record.clone()).unwrap();
            store.put(b"a", b"1234").unwrap();
            store.put(b"b", b"12").unwrap();
        }
        let reattached = Store::attach(&db, record).unwrap();
        let snap = reattached.metrics().collect();
        assert_eq!(snap.length, 2);
        assert_eq!(snap.size, 6);
    }
}
