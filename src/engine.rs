//! Build plan execution engine.
//!
//! Owns the lifecycle of one in-progress blueprint build per actor:
//! creation, batched continuation, cancellation, and completion
//! classification. All durable state goes through the store traits; the
//! credit ledger, actor locator, and event sink are external
//! collaborators.
//!
//! Ordering on every mutating path is place, then persist, then
//! acknowledge: the plan row is written through the store (with its
//! version bumped) after each placed piece and before the call returns,
//! so a crash between placement and acknowledgment is recoverable by
//! simply calling `advance` again and observing the already-advanced
//! cursor.

use crate::compiler::{compile, PlannedPiece};
use crate::concurrency::ActorLockManager;
use crate::config::WorldConfig;
use crate::error::{BuildError, StorageError};
use crate::events::{BuildEvent, EventSink};
use crate::geometry::{resolve_placement, Tolerances};
use crate::ledger::CreditLedger;
use crate::location::ActorLocator;
use crate::plan::{
    now_millis, BatchOutcome, BuildPlan, FailureReason, PieceFailure, PlanRecord, StartSummary,
    StatusReport,
};
use crate::store::{PlanStore, PrimitiveStore};
use crate::template::TemplateLibrary;
use crate::types::{ActorId, Primitive, Vec3};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counts reported by startup recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    pub restored: usize,
    pub purged: usize,
}

/// The build engine facade. One instance per process; every operation is
/// keyed by actor identity and serialized per actor.
pub struct BuildEngine {
    plans: Arc<dyn PlanStore>,
    primitives: Arc<dyn PrimitiveStore>,
    ledger: Arc<dyn CreditLedger>,
    locator: Arc<dyn ActorLocator>,
    events: Arc<dyn EventSink>,
    templates: TemplateLibrary,
    config: WorldConfig,
    locks: ActorLockManager,
    /// In-memory reservation preventing a second live plan per actor.
    /// Rebuilt from the store by `recover()`.
    active: RwLock<HashSet<ActorId>>,
}

impl BuildEngine {
    pub fn new(
        plans: Arc<dyn PlanStore>,
        primitives: Arc<dyn PrimitiveStore>,
        ledger: Arc<dyn CreditLedger>,
        locator: Arc<dyn ActorLocator>,
        events: Arc<dyn EventSink>,
        templates: TemplateLibrary,
        config: WorldConfig,
    ) -> Self {
        Self {
            plans,
            primitives,
            ledger,
            locator,
            events,
            templates,
            config,
            locks: ActorLockManager::new(),
            active: RwLock::new(HashSet::new()),
        }
    }

    /// Reload plans that survived a restart. Rows older than the TTL are
    /// purged as abandoned; the rest re-establish the per-actor
    /// reservation.
    pub fn recover(&self) -> Result<RecoveryReport, StorageError> {
        let ttl_ms = self.config.plan_ttl_ms();
        let purged = self.plans.purge_expired(ttl_ms)?;
        let restored_plans = self.plans.load_active_within_ttl(ttl_ms)?;
        let mut active = self.active.write();
        for (actor, record) in &restored_plans {
            debug!(
                actor = %actor,
                blueprint = %record.plan.blueprint_name,
                cursor = record.plan.cursor,
                "restored build plan"
            );
            active.insert(actor.clone());
        }
        let report = RecoveryReport {
            restored: restored_plans.len(),
            purged,
        };
        info!(restored = report.restored, purged = report.purged, "plan recovery complete");
        Ok(report)
    }

    /// Start a build: compile the template and persist a fresh plan. No
    /// pieces are placed yet.
    pub fn start(
        &self,
        actor: &ActorId,
        template_name: &str,
        anchor: (f32, f32),
        orientation: f32,
    ) -> Result<StartSummary, BuildError> {
        let lock = self.locks.acquire(actor);
        let _guard = lock.lock();

        if self.active.read().contains(actor) {
            return Err(BuildError::AlreadyActive(actor.clone()));
        }
        if self.plans.get(actor)?.is_some() {
            // A plan exists on disk that recovery never saw (another
            // process wrote it). Honor it.
            self.active.write().insert(actor.clone());
            return Err(BuildError::AlreadyActive(actor.clone()));
        }

        let template = self
            .templates
            .get(template_name)
            .ok_or_else(|| BuildError::UnknownTemplate(template_name.to_string()))?;

        if !self.ledger.can_afford(actor, self.config.piece_cost)? {
            return Err(BuildError::EconomicPrecondition(actor.clone()));
        }

        let compiled = compile(template, anchor, orientation);
        let plan = BuildPlan::new(
            &template.name,
            template.version,
            anchor,
            orientation,
            compiled,
        );
        let summary = StartSummary {
            blueprint_name: plan.blueprint_name.clone(),
            total_pieces: plan.total(),
            phases: plan.phase_labels.clone(),
            estimated_batches: plan.total().div_ceil(self.config.batch_size),
        };

        let record = PlanRecord::new(plan);
        match self.plans.upsert(actor, &record, None) {
            Ok(()) => {}
            Err(StorageError::VersionConflict { .. }) => {
                self.active.write().insert(actor.clone());
                return Err(BuildError::AlreadyActive(actor.clone()));
            }
            Err(e) => return Err(e.into()),
        }
        self.active.write().insert(actor.clone());

        info!(
            actor = %actor,
            blueprint = template_name,
            pieces = summary.total_pieces,
            "build plan started"
        );
        self.events.emit(&BuildEvent::PlanStarted {
            actor: actor.clone(),
            blueprint: summary.blueprint_name.clone(),
            total_pieces: summary.total_pieces,
            at_ms: now_millis(),
        });
        Ok(summary)
    }

    /// Attempt the next batch of up to `batch_size` pieces.
    ///
    /// Failures never retry and the cursor always advances, so every plan
    /// reaches a terminal status within `ceil(total / batch_size)` calls.
    /// A refused credit debit also advances the cursor; the piece slot is
    /// spent and the depletion shows up in the final status.
    pub fn advance(&self, actor: &ActorId) -> Result<BatchOutcome, BuildError> {
        let lock = self.locks.acquire(actor);
        let _guard = lock.lock();

        let mut record = match self.plans.get(actor)? {
            Some(record) => record,
            None => {
                self.active.write().remove(actor);
                return Err(BuildError::NoActivePlan(actor.clone()));
            }
        };

        // Site radius precondition, once per call, before any piece.
        let position = self.locator.current_position(actor)?;
        let anchor = Vec3::new(record.plan.anchor.0, 0.0, record.plan.anchor.1);
        let distance = position.xz_distance(&anchor);
        if distance > self.config.site_radius {
            return Err(BuildError::TooFarFromSite {
                distance,
                anchor_x: record.plan.anchor.0,
                anchor_z: record.plan.anchor.1,
                radius: self.config.site_radius,
            });
        }

        let tolerances = self.config.tolerances();
        let mut attempted = 0;
        while attempted < self.config.batch_size && !record.plan.is_finished() {
            let piece = record.plan.pieces[record.plan.cursor].clone();
            let mut plan = record.plan.clone();

            match self.attempt_piece(actor, &piece, &tolerances)? {
                None => plan.placed_count += 1,
                Some(reason) => {
                    debug!(
                        actor = %actor,
                        index = plan.cursor,
                        shape = %piece.shape,
                        %reason,
                        "piece not placed"
                    );
                    plan.failures.push(PieceFailure {
                        index: plan.cursor,
                        shape: piece.shape,
                        reason,
                    });
                }
            }
            plan.cursor += 1;

            // Persist before moving on so a crash loses at most the piece
            // in flight, never a placed-but-unrecorded batch.
            let next = record.next(plan);
            self.plans.upsert(actor, &next, Some(record.version))?;
            record = next;
            attempted += 1;
        }

        if record.plan.is_finished() {
            let completion = record.plan.completion();
            self.plans.delete(actor)?;
            self.active.write().remove(actor);
            info!(
                actor = %actor,
                blueprint = %record.plan.blueprint_name,
                placed = record.plan.placed_count,
                failed = record.plan.failures.len(),
                "build plan finished"
            );
            self.events.emit(&BuildEvent::PlanFinished {
                actor: actor.clone(),
                blueprint: record.plan.blueprint_name.clone(),
                completion: completion.clone(),
                at_ms: now_millis(),
            });
            Ok(BatchOutcome::Finished(completion))
        } else {
            let snapshot = record.plan.snapshot(self.config.batch_size);
            self.events.emit(&BuildEvent::BatchPlaced {
                actor: actor.clone(),
                blueprint: record.plan.blueprint_name.clone(),
                progress: snapshot.clone(),
                at_ms: now_millis(),
            });
            Ok(BatchOutcome::InProgress(snapshot))
        }
    }

    /// Validate one piece (with the single corrected retry), debit, and
    /// place it. `Ok(None)` means placed; `Ok(Some(reason))` records a
    /// per-piece failure; `Err` aborts the whole call.
    fn attempt_piece(
        &self,
        actor: &ActorId,
        piece: &PlannedPiece,
        tolerances: &Tolerances,
    ) -> Result<Option<FailureReason>, BuildError> {
        let existing = self
            .primitives
            .all_near(piece.position, self.config.validation_radius)?;

        let final_position = match resolve_placement(
            piece.shape,
            piece.position,
            piece.scale,
            &existing,
            tolerances,
        ) {
            Ok(position) => position,
            Err(reason) => return Ok(Some(FailureReason::from(reason))),
        };

        if !self.ledger.check_and_debit(actor, self.config.piece_cost)? {
            return Ok(Some(FailureReason::CreditRefused));
        }

        let primitive = Primitive {
            shape: piece.shape,
            position: final_position,
            rotation: piece.rotation,
            scale: piece.scale,
            color: piece.color.clone(),
            owner_id: actor.clone(),
            created_at: Utc::now(),
        };
        if let Err(e) = self.primitives.append(&primitive) {
            // Compensate the debit so the credit and primitive state stay
            // consistent, then abort the whole call.
            if let Err(refund_err) = self.ledger.refund(actor, self.config.piece_cost) {
                warn!(actor = %actor, error = %refund_err, "refund after failed append also failed");
            }
            return Err(e.into());
        }
        Ok(None)
    }

    /// Delete the actor's plan. Already-placed primitives stay.
    pub fn cancel(&self, actor: &ActorId) -> Result<(), BuildError> {
        let lock = self.locks.acquire(actor);
        let _guard = lock.lock();

        let record = match self.plans.get(actor)? {
            Some(record) => record,
            None => {
                self.active.write().remove(actor);
                return Err(BuildError::NoActivePlan(actor.clone()));
            }
        };
        self.plans.delete(actor)?;
        self.active.write().remove(actor);

        info!(
            actor = %actor,
            blueprint = %record.plan.blueprint_name,
            placed = record.plan.placed_count,
            "build plan cancelled"
        );
        self.events.emit(&BuildEvent::PlanCancelled {
            actor: actor.clone(),
            blueprint: record.plan.blueprint_name.clone(),
            placed: record.plan.placed_count,
            at_ms: now_millis(),
        });
        Ok(())
    }

    /// Read-only progress query. Takes no lock.
    pub fn status(&self, actor: &ActorId) -> Result<StatusReport, BuildError> {
        match self.plans.get(actor)? {
            Some(record) => Ok(StatusReport::active(
                record.plan.snapshot(self.config.batch_size),
            )),
            None => Ok(StatusReport::inactive()),
        }
    }

    /// Periodic TTL sweep: purge abandoned rows and drop their
    /// reservations.
    pub fn sweep_expired(&self) -> Result<usize, StorageError> {
        let purged = self.plans.purge_expired(self.config.plan_ttl_ms())?;
        if purged > 0 {
            let reserved: Vec<ActorId> = self.active.read().iter().cloned().collect();
            let mut active = self.active.write();
            for actor in reserved {
                if self.plans.get(&actor)?.is_none() {
                    active.remove(&actor);
                }
            }
            info!(purged, "expired build plans swept");
        }
        Ok(purged)
    }

    pub fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    pub fn world_config(&self) -> &WorldConfig {
        &self.config
    }
}
