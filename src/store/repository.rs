//! Owns all stores; token↔id↔bucket mapping; create/save/delete/rotate;
//! startup rehydration (C5).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rand::RngCore;

use crate::error::{RepositoryResult, StoreError, StoreResult};
use crate::store::entity::{Store, StoreRecord};

const META_BUCKET: &str = "stores";
const TOKEN_LENGTH: usize = 16;

struct RepoState {
    by_token: HashMap<String, Arc<Store>>,
    by_id: HashMap<u16, String>,
    sequential_id: u16,
}

/// All mutation happens from the admin plane, expected in the single digits
/// per day; the tenant hot path only ever reads `byToken`. A single
/// `RwLock` is enough to make that safe in Rust without serializing
/// concurrent tenant lookups against each other — see DESIGN.md for why
/// this, rather than per-key locking, is the chosen translation of the
/// original's intentionally lock-free (and intentionally racy) map.
pub struct StoreRepository {
    db: sled::Db,
    meta: sled::Tree,
    state: RwLock<RepoState>,
}

impl StoreRepository {
    /// Opens the metadata bucket and reconstructs every persisted store,
    /// recomputing each one's length/size totals from its data bucket.
    pub fn load(db_path: &str) -> StoreResult<Self> {
        let db = sled::open(db_path)?;
        let meta = db.open_tree(META_BUCKET)?;

        let mut by_token = HashMap::new();
        let mut by_id = HashMap::new();
        let mut sequential_id = 0u16;

        for entry in meta.iter() {
            let (_, value) = entry?;
            let record: StoreRecord = serde_json::from_slice(&value)?;
            sequential_id = sequential_id.max(record.id);
            let id = record.id;
            let token = record.token.clone();
            let store = Arc::new(Store::attach(&db, record)?);
            by_id.insert(id, token.clone());
            by_token.insert(token, store);
        }

        Ok(Self {
            db,
            meta,
            state: RwLock::new(RepoState { by_token, by_id, sequential_id }),
        })
    }

    pub fn get_by_id(&self, id: u16) -> Option<Arc<Store>> {
        let state = self.state.read().unwrap();
        let token = state.by_id.get(&id)?;
        state.by_token.get(token).cloned()
    }

    pub fn get_by_token(&self, token: &str) -> Option<Arc<Store>> {
        self.state.read().unwrap().by_token.get(token).cloned()
    }

    /// All live stores, for the tick scheduler's single per-period
    /// subscriber to fan decay out to (§9 design note: the repository is
    /// the subscriber, and internally iterates its owned stores).
    pub fn all_stores(&self) -> Vec<Arc<Store>> {
        self.state.read().unwrap().by_token.values().cloned().collect()
    }

    /// Returns a snapshot of every live store, keyed by token — this is
    /// exactly the wire shape of `GET /stores` (§3: "there is no separate
    /// DTO, the repository's map *is* the wire shape").
    pub fn snapshot(&self) -> HashMap<String, StoreRecord> {
        self.state
            .read()
            .unwrap()
            .by_token
            .iter()
            .map(|(token, store)| (token.clone(), store.record()))
            .collect()
    }

    pub fn create(&self, owner_id: u64, submission_id: u64, id_req: u16, token_req: String) -> RepositoryResult<Arc<Store>> {
        let mut state = self.state.write().unwrap();

        let token = if token_req.is_empty() { self.gen_token_locked(&state) } else { token_req };
        let id = if id_req != 0 { id_req } else { state.sequential_id + 1 };

        let record = StoreRecord { id, token: token.clone(), owner_id, submission_id };
        let store = Arc::new(Store::attach(&self.db, record.clone())?);

        self.write_meta(&record)?;

        state.sequential_id = state.sequential_id.max(id);
        state.by_id.insert(id, token.clone());
        state.by_token.insert(token, store.clone());

        Ok(store)
    }

    /// Re-runs key assignment to fill any defaults a patch cleared, then
    /// persists the metadata entry and re-installs the store in both maps.
    pub fn save(&self, store: &Arc<Store>) -> RepositoryResult<()> {
        let mut state = self.state.write().unwrap();

        let mut record = store.record();
        if record.token.is_empty() {
            record.token = self.gen_token_locked(&state);
            store.set_token(record.token.clone());
        }

        self.write_meta(&record)?;

        state.sequential_id = state.sequential_id.max(record.id);
        state.by_id.insert(record.id, record.token.clone());
        state.by_token.insert(record.token, store.clone());
        Ok(())
    }

    /// No-op if the id is unknown. Otherwise drops the data bucket and
    /// removes the metadata entry before removing both map entries.
    pub fn delete(&self, id: u16) -> RepositoryResult<()> {
        let mut state = self.state.write().unwrap();
        let Some(token) = state.by_id.get(&id).cloned() else {
            return Ok(());
        };

        self.meta.remove(meta_key(id)).map_err(StoreError::from)?;
        self.db.drop_tree(crate::store::entity::bucket_name(id)).map_err(StoreError::from)?;

        state.by_id.remove(&id);
        state.by_token.remove(&token);
        Ok(())
    }

    /// Stashes the old token, assigns a fresh one, and saves; on failure the
    /// store keeps its old token and the old `byToken` entry is untouched.
    /// On success the old entry is removed (the new one was installed by
    /// `save`), preserving the store's identity (`Arc` pointer) throughout.
    pub fn rotate_token(&self, store: &Arc<Store>) -> RepositoryResult<String> {
        let old_token = store.token();
        let new_token = {
            let state = self.state.read().unwrap();
            self.gen_token_locked(&state)
        };

        store.set_token(new_token.clone());
        if let Err(e) = self.save(store) {
            store.set_token(old_token);
            return Err(e);
        }

        self.state.write().unwrap().by_token.remove(&old_token);
        Ok(new_token)
    }

    pub fn exists(&self, id: u16) -> bool {
        self.state.read().unwrap().by_id.contains_key(&id)
    }

    /// Removes a stale `byToken` entry left behind after an admin patch or
    /// rotation reassigns a store's token to something new.
    pub fn forget_token(&self, token: &str) {
        self.state.write().unwrap().by_token.remove(token);
    }

    fn write_meta(&self, record: &StoreRecord) -> RepositoryResult<()> {
        let bytes = serde_json::to_vec(record).map_err(crate::error::StoreError::from)?;
        self.meta.insert(meta_key(record.id), bytes).map_err(crate::error::StoreError::from)?;
        Ok(())
    }

    fn gen_token_locked(&self, state: &RepoState) -> String {
        loop {
            let mut bytes = [0u8; 8];
            rand::thread_rng().fill_bytes(&mut bytes);
            let candidate = hex::encode(bytes);
            debug_assert_eq!(candidate.len(), TOKEN_LENGTH);
            if !state.by_token.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

fn meta_key(id: u16) -> [u8; 2] {
    id.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fresh_repo() -> (TempDir, StoreRepository) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("glitchd.db");
        let repo = StoreRepository::load(path.to_str().unwrap()).unwrap();
        (dir, repo)
    }

    #[test]
    fn create_assigns_monotonic_ids() {
        let (_dir, repo) = fresh_repo();
        let s1 = repo.create(1, 0, 0, String::new()).unwrap();
        let s2 = repo.create(2, 0, 0, String::new()).unwrap();
        assert_eq!(s1.id(), 1);
        assert_eq!(s2.id(), 2);
    }

    #[test]
    fn generated_token_matches_hex_shape_and_is_unique() {
        let (_dir, repo) = fresh_repo();
        let s1 = repo.create(1, 0, 0, String::new()).unwrap();
        let s2 = repo.create(2, 0, 0, String::new()).unwrap();
        let re_ok = |t: &str| t.len() == 16 && t.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase());
        assert!(re_ok(&s1.token()));
        assert!(re_ok(&s2.token()));
        assert_ne!(s1.token(), s2.token());
    }

    #[test]
    fn by_token_and_by_id_stay_consistent() {
        let (_dir, repo) = fresh_repo();
        let store = repo.create(7, 0, 0, String::new()).unwrap();
        let via_id = repo.get_by_id(store.id()).unwrap();
        let via_token = repo.get_by_token(&store.token()).unwrap();
        assert!(Arc::ptr_eq(&via_id, &via_token));
    }

    #[test]
    fn rotate_token_preserves_identity_and_drops_old_token() {
        let (_dir, repo) = fresh_repo();
        let store = repo.create(1, 0, 0, String::new()).unwrap();
        let old_token = store.token();
        let id = store.id();

        let new_token = repo.rotate_token(&store).unwrap();
        assert_ne!(new_token, old_token);

        let via_id = repo.get_by_id(id).unwrap();
        assert!(Arc::ptr_eq(&via_id, &store));
        assert_eq!(via_id.token(), new_token);
        assert!(repo.get_by_token(&old_token).is_none());
    }

    #[test]
    fn delete_drops_bucket_and_is_idempotent() {
        let (_dir, repo) = fresh_repo();
        let store = repo.create(1, 0, 0, String::new()).unwrap();
        store.put(b"k", b"v").unwrap();
        let id = store.id();
        let token = store.token();

        repo.delete(id).unwrap();
        assert!(repo.get_by_id(id).is_none());
        assert!(repo.get_by_token(&token).is_none());

        // deleting again is a no-op, not an error
        repo.delete(id).unwrap();
    }

    #[test]
    fn round_trip_persistence_preserves_maps_and_totals() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("glitchd.db");
        let id;
        let token;
        {
            let repo = StoreRepository::load(path.to_str().unwrap()).unwrap();
            let store = repo.create(1, 0, 0, String::new()).unwrap();
            store.put(b"a", b"1234").unwrap();
            id = store.id();
            token = store.token();
        }
        let repo = StoreRepository::load(path.to_str().unwrap()).unwrap();
        let store = repo.get_by_id(id).unwrap();
        assert_eq!(store.token(), token);
        let snap = store.metrics().collect();
        assert_eq!(snap.length, 1);
        assert_eq!(snap.size, 4);
    }
}
