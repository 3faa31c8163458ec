//! Credit ledger collaborator.
//!
//! Economic policy (balances, daily resets, transfers) lives in an
//! external service; the engine only needs an affordability probe, an
//! atomic debit, and a compensating refund for the abort path.

use crate::error::StorageError;
use crate::types::ActorId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Narrow interface to the external credit ledger.
///
/// A refusal (`Ok(false)`) is a domain outcome; `Err` means the ledger
/// itself is unreachable and the whole operation should abort as
/// transient.
pub trait CreditLedger: Send + Sync {
    /// Whether the actor could pay `amount` right now, without debiting.
    fn can_afford(&self, actor: &ActorId, amount: u64) -> Result<bool, StorageError>;

    /// Atomically debit `amount` if the balance covers it. Returns whether
    /// the debit happened.
    fn check_and_debit(&self, actor: &ActorId, amount: u64) -> Result<bool, StorageError>;

    /// Compensate a debit whose paired placement was aborted by a storage
    /// failure.
    fn refund(&self, actor: &ActorId, amount: u64) -> Result<(), StorageError>;
}

/// In-process ledger used by tests and the offline simulator.
#[derive(Default)]
pub struct MemoryLedger {
    balances: RwLock<HashMap<ActorId, u64>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an actor's balance.
    pub fn grant(&self, actor: &ActorId, amount: u64) {
        *self.balances.write().entry(actor.clone()).or_insert(0) += amount;
    }

    pub fn balance(&self, actor: &ActorId) -> u64 {
        self.balances.read().get(actor).copied().unwrap_or(0)
    }
}

impl CreditLedger for MemoryLedger {
    fn can_afford(&self, actor: &ActorId, amount: u64) -> Result<bool, StorageError> {
        Ok(self.balance(actor) >= amount)
    }

    fn check_and_debit(&self, actor: &ActorId, amount: u64) -> Result<bool, StorageError> {
        let mut balances = self.balances.write();
        let balance = balances.entry(actor.clone()).or_insert(0);
        if *balance < amount {
            return Ok(false);
        }
        *balance -= amount;
        Ok(true)
    }

    fn refund(&self, actor: &ActorId, amount: u64) -> Result<(), StorageError> {
        *self.balances.write().entry(actor.clone()).or_insert(0) += amount;
        Ok(())
    }
}
