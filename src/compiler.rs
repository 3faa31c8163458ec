//! Blueprint compilation.
//!
//! Expands a template's relative piece offsets into absolute world
//! coordinates for a given anchor and orientation. Pure coordinate
//! arithmetic; validation happens later, piece by piece, in the engine's
//! batch loop.

use crate::template::BlueprintTemplate;
use crate::types::{ShapeKind, Vec3};
use serde::{Deserialize, Serialize};

/// One compiled piece in absolute world coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedPiece {
    pub shape: ShapeKind,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub color: String,
}

/// Output of compilation: the flat ordered piece list plus the cumulative
/// piece count at the end of each phase, used for progress labels only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledBlueprint {
    pub pieces: Vec<PlannedPiece>,
    pub phase_boundaries: Vec<usize>,
    pub phase_labels: Vec<String>,
}

/// Compile a template at an anchor point with a yaw orientation.
///
/// The relative (x, z) offset of each piece is rotated about the vertical
/// axis by `orientation` (radians) and translated by the anchor; the
/// piece's own yaw gets `orientation` added. The y offset passes through
/// unchanged: orientation is horizontal-only.
pub fn compile(
    template: &BlueprintTemplate,
    anchor: (f32, f32),
    orientation: f32,
) -> CompiledBlueprint {
    let (sin, cos) = orientation.sin_cos();
    let mut pieces = Vec::with_capacity(template.piece_count());
    let mut phase_boundaries = Vec::with_capacity(template.phases.len());
    let mut phase_labels = Vec::with_capacity(template.phases.len());

    for phase in &template.phases {
        for spec in &phase.pieces {
            let rx = spec.offset.x * cos + spec.offset.z * sin;
            let rz = -spec.offset.x * sin + spec.offset.z * cos;
            pieces.push(PlannedPiece {
                shape: spec.shape,
                position: Vec3::new(anchor.0 + rx, spec.offset.y, anchor.1 + rz),
                rotation: Vec3::new(
                    spec.rotation.x,
                    spec.rotation.y + orientation,
                    spec.rotation.z,
                ),
                scale: spec.scale,
                color: spec.color.clone(),
            });
        }
        phase_boundaries.push(pieces.len());
        phase_labels.push(phase.label.clone());
    }

    CompiledBlueprint {
        pieces,
        phase_boundaries,
        phase_labels,
    }
}
