//! Sled-backed plan store.

use crate::error::{to_storage_data, to_storage_io, StorageError};
use crate::plan::{now_millis, PlanRecord};
use crate::store::PlanStore;
use crate::types::ActorId;
use sled::{Db, Tree};
use std::path::Path;

const TREE_PLANS: &str = "plans";

/// Sled-backed implementation of `PlanStore`.
///
/// One row per actor, bincode-encoded `PlanRecord` values. The optimistic
/// version check rides on sled's `compare_and_swap`: the store re-reads
/// the current row, verifies the caller's expected version, and swaps
/// against the exact bytes it read, so a concurrent writer loses cleanly.
pub struct SledPlanStore {
    db: Db,
    tree: Tree,
}

impl SledPlanStore {
    /// Open (or create) a plan store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(to_storage_io)?;
        Self::from_db(db)
    }

    /// Wrap an already-open sled database (shared with other stores).
    pub fn from_db(db: Db) -> Result<Self, StorageError> {
        let tree = db.open_tree(TREE_PLANS).map_err(to_storage_io)?;
        Ok(Self { db, tree })
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }

    fn decode(value: &[u8]) -> Result<PlanRecord, StorageError> {
        bincode::deserialize(value).map_err(to_storage_data)
    }
}

impl PlanStore for SledPlanStore {
    fn get(&self, actor: &ActorId) -> Result<Option<PlanRecord>, StorageError> {
        match self.tree.get(actor.as_str().as_bytes()).map_err(to_storage_io)? {
            Some(value) => Ok(Some(Self::decode(&value)?)),
            None => Ok(None),
        }
    }

    fn upsert(
        &self,
        actor: &ActorId,
        record: &PlanRecord,
        expected_version: Option<u64>,
    ) -> Result<(), StorageError> {
        let key = actor.as_str().as_bytes();
        let new_value = bincode::serialize(record).map_err(to_storage_data)?;

        let current = self.tree.get(key).map_err(to_storage_io)?;
        match (&current, expected_version) {
            (None, None) => {}
            (Some(existing), Some(expected)) => {
                let found = Self::decode(existing)?.version;
                if found != expected {
                    return Err(StorageError::VersionConflict {
                        actor: actor.clone(),
                        expected,
                        found,
                    });
                }
            }
            (Some(existing), None) => {
                let found = Self::decode(existing)?.version;
                return Err(StorageError::VersionConflict {
                    actor: actor.clone(),
                    expected: 0,
                    found,
                });
            }
            (None, Some(expected)) => {
                return Err(StorageError::Corrupt(format!(
                    "plan for actor {actor} vanished (expected version {expected})"
                )));
            }
        }

        // Swap against the exact bytes read above; a concurrent writer
        // that slipped in between shows up as a CAS failure.
        let swap = self
            .tree
            .compare_and_swap(key, current.as_deref(), Some(new_value))
            .map_err(to_storage_io)?;
        if swap.is_err() {
            let found = self
                .tree
                .get(key)
                .map_err(to_storage_io)?
                .map(|v| Self::decode(&v).map(|r| r.version))
                .transpose()?
                .unwrap_or(0);
            return Err(StorageError::VersionConflict {
                actor: actor.clone(),
                expected: expected_version.unwrap_or(0),
                found,
            });
        }
        Ok(())
    }

    fn delete(&self, actor: &ActorId) -> Result<(), StorageError> {
        self.tree
            .remove(actor.as_str().as_bytes())
            .map_err(to_storage_io)?;
        Ok(())
    }

    fn load_active_within_ttl(
        &self,
        ttl_ms: u64,
    ) -> Result<Vec<(ActorId, PlanRecord)>, StorageError> {
        let cutoff = now_millis().saturating_sub(ttl_ms);
        let mut out = Vec::new();
        for item in self.tree.iter() {
            let (key, value) = item.map_err(to_storage_io)?;
            let record = Self::decode(&value)?;
            if record.updated_at_ms >= cutoff {
                let actor = ActorId::new(String::from_utf8_lossy(&key).to_string());
                out.push((actor, record));
            }
        }
        out.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(out)
    }

    fn purge_expired(&self, ttl_ms: u64) -> Result<usize, StorageError> {
        let cutoff = now_millis().saturating_sub(ttl_ms);
        let mut stale: Vec<Vec<u8>> = Vec::new();
        for item in self.tree.iter() {
            let (key, value) = item.map_err(to_storage_io)?;
            let record = Self::decode(&value)?;
            if record.updated_at_ms < cutoff {
                stale.push(key.to_vec());
            }
        }
        for key in &stale {
            self.tree.remove(key).map_err(to_storage_io)?;
        }
        Ok(stale.len())
    }
}
