//! Per-actor mutual exclusion.
//!
//! The engine assumes at most one in-flight mutating call per actor, but
//! does not trust callers to uphold it: two racing `advance` calls for the
//! same actor could double-read the same cursor and double-spend credits.
//! Every mutating operation therefore serializes on the actor's lock from
//! this manager, with the plan store's version counter as the second line
//! of defense.

use crate::types::ActorId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Hands out one mutex per actor id. Locks are created on first use and
/// kept for the life of the process; the per-actor footprint is a few
/// dozen bytes.
#[derive(Default)]
pub struct ActorLockManager {
    locks: Mutex<HashMap<ActorId, Arc<Mutex<()>>>>,
}

impl ActorLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the lock for an actor. The caller holds the
    /// returned `Arc` and locks it for the duration of the operation.
    pub fn acquire(&self, actor: &ActorId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(actor.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
