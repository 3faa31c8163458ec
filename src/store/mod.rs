//! Durable stores.
//!
//! Store traits sit between the engine and sled so tests and the offline
//! simulator can substitute in-memory implementations. The engine reads
//! and writes plans exclusively through `PlanStore` and primitives through
//! `PrimitiveStore`.

mod plan_store;
mod primitive_store;

pub use plan_store::SledPlanStore;
pub use primitive_store::{MemoryPrimitiveStore, SledPrimitiveStore};

use crate::error::StorageError;
use crate::plan::PlanRecord;
use crate::types::{ActorId, Primitive, PrimitiveId, Vec3};

/// Durable storage for per-actor build plans.
///
/// Writes are guarded by an optimistic version counter: `upsert` with
/// `expected_version = None` creates the row and fails if one exists;
/// `Some(v)` replaces the row only if its stored version is still `v`.
/// A mismatch surfaces as `StorageError::VersionConflict`.
pub trait PlanStore: Send + Sync {
    fn get(&self, actor: &ActorId) -> Result<Option<PlanRecord>, StorageError>;

    fn upsert(
        &self,
        actor: &ActorId,
        record: &PlanRecord,
        expected_version: Option<u64>,
    ) -> Result<(), StorageError>;

    fn delete(&self, actor: &ActorId) -> Result<(), StorageError>;

    /// Plans updated within the TTL window. Rows older than the window are
    /// left untouched; use `purge_expired` to remove them.
    fn load_active_within_ttl(
        &self,
        ttl_ms: u64,
    ) -> Result<Vec<(ActorId, PlanRecord)>, StorageError>;

    /// Delete rows whose last update is older than the TTL window,
    /// treating them as abandoned. Returns the number removed.
    fn purge_expired(&self, ttl_ms: u64) -> Result<usize, StorageError>;
}

/// Durable storage for placed primitives. Append-mostly: the validator
/// reads, successful placements append, nothing here mutates or deletes.
pub trait PrimitiveStore: Send + Sync {
    fn append(&self, primitive: &Primitive) -> Result<PrimitiveId, StorageError>;

    /// Every primitive within `radius` of `center` in the horizontal
    /// plane. This is the validator's world snapshot.
    fn all_near(&self, center: Vec3, radius: f32) -> Result<Vec<Primitive>, StorageError>;

    fn len(&self) -> Result<usize, StorageError>;
}
