//! Primitive stores: sled-backed for the live world, in-memory for tests
//! and the offline simulator.

use crate::error::{to_storage_data, to_storage_io, StorageError};
use crate::store::PrimitiveStore;
use crate::types::{Primitive, PrimitiveId, Vec3};
use parking_lot::RwLock;
use sled::{Db, Tree};
use std::path::Path;

const TREE_PRIMITIVES: &str = "primitives";

/// Sled-backed implementation of `PrimitiveStore`.
///
/// Keys are monotonic u64 sequence numbers in big-endian order, so
/// iteration returns primitives in placement order.
pub struct SledPrimitiveStore {
    db: Db,
    tree: Tree,
}

impl SledPrimitiveStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(to_storage_io)?;
        Self::from_db(db)
    }

    pub fn from_db(db: Db) -> Result<Self, StorageError> {
        let tree = db.open_tree(TREE_PRIMITIVES).map_err(to_storage_io)?;
        Ok(Self { db, tree })
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }
}

impl PrimitiveStore for SledPrimitiveStore {
    fn append(&self, primitive: &Primitive) -> Result<PrimitiveId, StorageError> {
        let id = self.db.generate_id().map_err(to_storage_io)?;
        let value = bincode::serialize(primitive).map_err(to_storage_data)?;
        self.tree
            .insert(id.to_be_bytes(), value)
            .map_err(to_storage_io)?;
        Ok(PrimitiveId(id))
    }

    fn all_near(&self, center: Vec3, radius: f32) -> Result<Vec<Primitive>, StorageError> {
        let mut out = Vec::new();
        for item in self.tree.iter() {
            let (_, value) = item.map_err(to_storage_io)?;
            let primitive: Primitive = bincode::deserialize(&value).map_err(to_storage_data)?;
            if primitive.position.xz_distance(&center) <= radius {
                out.push(primitive);
            }
        }
        Ok(out)
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.tree.len())
    }
}

/// In-memory implementation of `PrimitiveStore` for tests and the offline
/// template checker, which validates into an empty throwaway world.
#[derive(Default)]
pub struct MemoryPrimitiveStore {
    primitives: RwLock<Vec<Primitive>>,
}

impl MemoryPrimitiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything placed, in placement order.
    pub fn all(&self) -> Vec<Primitive> {
        self.primitives.read().clone()
    }
}

impl PrimitiveStore for MemoryPrimitiveStore {
    fn append(&self, primitive: &Primitive) -> Result<PrimitiveId, StorageError> {
        let mut primitives = self.primitives.write();
        primitives.push(primitive.clone());
        Ok(PrimitiveId(primitives.len() as u64 - 1))
    }

    fn all_near(&self, center: Vec3, radius: f32) -> Result<Vec<Primitive>, StorageError> {
        Ok(self
            .primitives
            .read()
            .iter()
            .filter(|p| p.position.xz_distance(&center) <= radius)
            .cloned()
            .collect())
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.primitives.read().len())
    }
}
