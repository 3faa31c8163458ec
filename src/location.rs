//! Actor location collaborator.
//!
//! The live agent-location service tracks where each actor currently
//! stands; the engine only asks for a position to enforce the build-site
//! radius before a batch.

use crate::error::StorageError;
use crate::types::{ActorId, Vec3};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Narrow interface to the external agent-location service.
pub trait ActorLocator: Send + Sync {
    fn current_position(&self, actor: &ActorId) -> Result<Vec3, StorageError>;
}

/// In-process locator for tests and the offline simulator. Actors without
/// an explicit position report the configured default.
pub struct FixedLocator {
    positions: RwLock<HashMap<ActorId, Vec3>>,
    default: Vec3,
}

impl FixedLocator {
    pub fn new(default: Vec3) -> Self {
        Self {
            positions: RwLock::new(HashMap::new()),
            default,
        }
    }

    pub fn place(&self, actor: &ActorId, position: Vec3) {
        self.positions.write().insert(actor.clone(), position);
    }
}

impl Default for FixedLocator {
    fn default() -> Self {
        Self::new(Vec3::default())
    }
}

impl ActorLocator for FixedLocator {
    fn current_position(&self, actor: &ActorId) -> Result<Vec3, StorageError> {
        Ok(self
            .positions
            .read()
            .get(actor)
            .copied()
            .unwrap_or(self.default))
    }
}
