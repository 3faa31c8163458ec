//! Offline template simulation.
//!
//! The regression gate for template authoring: compile a template into an
//! empty world and run every piece through the real validator, including
//! the single corrected retry. A template whose pieces do not all place
//! cleanly from scratch will strand live builds in
//! `completed_with_failures`, so this check runs standalone (CLI, CI)
//! rather than in the live request path.

use crate::compiler::compile;
use crate::geometry::{resolve_placement, Tolerances};
use crate::plan::{FailureReason, PieceFailure};
use crate::template::{BlueprintTemplate, TemplateLibrary};
use crate::types::{ActorId, Primitive};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Result of simulating one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub template: String,
    pub version: u32,
    pub total: usize,
    pub placed: usize,
    pub failures: Vec<PieceFailure>,
}

impl SimulationReport {
    /// The authoring gate: every piece must validate.
    pub fn all_placed(&self) -> bool {
        self.placed == self.total && self.failures.is_empty()
    }
}

/// Simulate placing an entire template into an empty world.
pub fn simulate_template(
    template: &BlueprintTemplate,
    anchor: (f32, f32),
    orientation: f32,
    tolerances: &Tolerances,
) -> SimulationReport {
    let compiled = compile(template, anchor, orientation);
    let total = compiled.pieces.len();
    let mut world: Vec<Primitive> = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (index, piece) in compiled.pieces.into_iter().enumerate() {
        match resolve_placement(piece.shape, piece.position, piece.scale, &world, tolerances) {
            Ok(position) => world.push(Primitive {
                shape: piece.shape,
                position,
                rotation: piece.rotation,
                scale: piece.scale,
                color: piece.color,
                owner_id: ActorId::from("simulator"),
                created_at: Utc::now(),
            }),
            Err(reason) => failures.push(PieceFailure {
                index,
                shape: piece.shape,
                reason: FailureReason::from(reason),
            }),
        }
    }

    SimulationReport {
        template: template.name.clone(),
        version: template.version,
        total,
        placed: world.len(),
        failures,
    }
}

/// Simulate every template in a library at the origin with no rotation.
pub fn check_library(library: &TemplateLibrary, tolerances: &Tolerances) -> Vec<SimulationReport> {
    library
        .iter()
        .map(|template| simulate_template(template, (0.0, 0.0), 0.0, tolerances))
        .collect()
}
