//! Build plan state.
//!
//! A `BuildPlan` is the per-actor progress record of one in-progress
//! blueprint build: the fully-compiled piece list plus a cursor over it.
//! Plans are created by `start`, mutated only by `advance`, and destroyed
//! on cancel, terminal completion, or the TTL sweep. The durable form is
//! `PlanRecord`, which carries the optimistic version counter every
//! mutating transition must check.

use crate::compiler::{CompiledBlueprint, PlannedPiece};
use crate::geometry::RejectionReason;
use crate::types::ShapeKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why one piece of a plan was not placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// No support surface within snap tolerance, even after correction.
    Floating,
    /// Every candidate position interpenetrated an existing primitive.
    Overlapping,
    /// The credit ledger refused the per-piece debit.
    CreditRefused,
}

impl From<RejectionReason> for FailureReason {
    fn from(reason: RejectionReason) -> Self {
        match reason {
            RejectionReason::Floating => FailureReason::Floating,
            RejectionReason::Overlapping => FailureReason::Overlapping,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Floating => f.write_str("floating"),
            FailureReason::Overlapping => f.write_str("overlapping"),
            FailureReason::CreditRefused => f.write_str("credit refused"),
        }
    }
}

/// Per-piece failure record, accumulated on the plan and surfaced in the
/// terminal status. Failures are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceFailure {
    pub index: usize,
    pub shape: ShapeKind,
    pub reason: FailureReason,
}

/// The unit of in-progress work, exclusively owned by one actor.
///
/// Invariant: `placed_count <= cursor <= pieces.len()`, and both counters
/// are non-decreasing for the life of the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub blueprint_name: String,
    pub blueprint_version: u32,
    pub anchor: (f32, f32),
    pub orientation: f32,
    pub pieces: Vec<PlannedPiece>,
    /// Index of the next piece to attempt.
    pub cursor: usize,
    pub placed_count: usize,
    /// Cumulative piece count at the end of each phase.
    pub phase_boundaries: Vec<usize>,
    pub phase_labels: Vec<String>,
    pub failures: Vec<PieceFailure>,
    pub started_at: DateTime<Utc>,
}

impl BuildPlan {
    pub fn new(
        blueprint_name: impl Into<String>,
        blueprint_version: u32,
        anchor: (f32, f32),
        orientation: f32,
        compiled: CompiledBlueprint,
    ) -> Self {
        Self {
            blueprint_name: blueprint_name.into(),
            blueprint_version,
            anchor,
            orientation,
            pieces: compiled.pieces,
            cursor: 0,
            placed_count: 0,
            phase_boundaries: compiled.phase_boundaries,
            phase_labels: compiled.phase_labels,
            failures: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn total(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.pieces.len()
    }

    pub fn remaining(&self) -> usize {
        self.pieces.len() - self.cursor
    }

    /// Label of the phase the cursor currently sits in. After the last
    /// piece this stays on the final phase.
    pub fn current_phase_label(&self) -> &str {
        for (i, boundary) in self.phase_boundaries.iter().enumerate() {
            if self.cursor < *boundary {
                return &self.phase_labels[i];
            }
        }
        self.phase_labels.last().map(String::as_str).unwrap_or("")
    }

    /// Progress snapshot in the shape shared by `advance` and `status`.
    pub fn snapshot(&self, batch_size: usize) -> ProgressSnapshot {
        ProgressSnapshot {
            blueprint_name: self.blueprint_name.clone(),
            placed: self.placed_count,
            failed: self.failures.len(),
            total: self.total(),
            cursor: self.cursor,
            phase_label: self.current_phase_label().to_string(),
            next_batch: self.remaining().min(batch_size),
        }
    }

    /// Terminal classification. Only meaningful once `is_finished()`.
    pub fn completion(&self) -> PlanCompletion {
        if self.placed_count == self.pieces.len() {
            PlanCompletion::Completed {
                placed: self.placed_count,
            }
        } else {
            PlanCompletion::CompletedWithFailures {
                placed: self.placed_count,
                failed: self.failures.len(),
                failures: self.failures.clone(),
            }
        }
    }
}

/// Durable form of a plan: the plan plus the optimistic version counter
/// checked by every compare-and-swap write, and the last-update timestamp
/// the TTL sweep keys on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub plan: BuildPlan,
    pub version: u64,
    pub updated_at_ms: u64,
}

impl PlanRecord {
    pub fn new(plan: BuildPlan) -> Self {
        Self {
            plan,
            version: 0,
            updated_at_ms: now_millis(),
        }
    }

    /// The successor record a mutating transition writes: version bumped,
    /// timestamp refreshed.
    pub fn next(&self, plan: BuildPlan) -> Self {
        Self {
            plan,
            version: self.version + 1,
            updated_at_ms: now_millis(),
        }
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Terminal status of a finished plan. A build is never declared fully
/// complete while pieces are missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlanCompletion {
    Completed {
        placed: usize,
    },
    CompletedWithFailures {
        placed: usize,
        failed: usize,
        failures: Vec<PieceFailure>,
    },
}

/// Result of one `advance` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    InProgress(ProgressSnapshot),
    Finished(PlanCompletion),
}

/// Progress as seen by the caller, identical in shape between `advance`
/// and `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub blueprint_name: String,
    pub placed: usize,
    pub failed: usize,
    pub total: usize,
    pub cursor: usize,
    pub phase_label: String,
    pub next_batch: usize,
}

/// Read-only status answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressSnapshot>,
}

impl StatusReport {
    pub fn inactive() -> Self {
        Self {
            active: false,
            progress: None,
        }
    }

    pub fn active(snapshot: ProgressSnapshot) -> Self {
        Self {
            active: true,
            progress: Some(snapshot),
        }
    }
}

/// Summary returned by `start`. No pieces have been placed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartSummary {
    pub blueprint_name: String,
    pub total_pieces: usize,
    pub phases: Vec<String>,
    pub estimated_batches: usize,
}
