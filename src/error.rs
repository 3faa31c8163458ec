//! Error types for the build-placement engine.
//!
//! Two layers, following the storage/domain split: `StorageError` covers
//! I/O and collaborator failures that abort a whole operation and are
//! expected to succeed on retry once the backing service recovers;
//! `BuildError` is the caller-facing taxonomy the actor can act on.

use crate::types::ActorId;
use thiserror::Error;

/// Storage-related errors. These are the only fatal class in the core:
/// a mutating call that hits one aborts without partial persistence.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Plan version conflict for actor {actor}: expected {expected}, found {found}")]
    VersionConflict {
        actor: ActorId,
        expected: u64,
        found: u64,
    },

    #[error("Credit ledger unavailable: {0}")]
    Ledger(String),

    #[error("Actor location service unavailable: {0}")]
    Locate(String),
}

/// Caller-facing build errors. All variants except `Storage` are
/// recoverable by the caller fixing the named condition and retrying.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Actor {0} already has an active build plan")]
    AlreadyActive(ActorId),

    #[error("No active build plan for actor {0}")]
    NoActivePlan(ActorId),

    #[error("Unknown blueprint template: {0}")]
    UnknownTemplate(String),

    #[error("Credit ledger refused the build precondition for actor {0}")]
    EconomicPrecondition(ActorId),

    #[error(
        "Actor is {distance:.1} units from the build site at ({anchor_x:.1}, {anchor_z:.1}); \
         must be within {radius:.1}"
    )]
    TooFarFromSite {
        distance: f32,
        anchor_x: f32,
        anchor_z: f32,
        radius: f32,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl BuildError {
    /// Whether a retry of the same call is expected to succeed once the
    /// backing storage recovers, without the caller changing anything.
    pub fn is_transient(&self) -> bool {
        matches!(self, BuildError::Storage(_))
    }
}

pub(crate) fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(std::io::Error::new(
        std::io::ErrorKind::Other,
        err.to_string(),
    ))
}

pub(crate) fn to_storage_data(err: bincode::Error) -> StorageError {
    StorageError::Corrupt(err.to_string())
}
