//! Spatial placement validation.
//!
//! Pure functions: given a candidate placement and the set of existing
//! primitives, decide validity and propose a corrected vertical position.
//! No I/O, no locking; the engine inlines these calls in the request path.
//!
//! A naive "snap to ground if close to ground" rule silently defeats
//! stacking, because a piece's bottom can be simultaneously within
//! tolerance of the ground and of a platform top. The validator instead
//! enumerates every candidate support surface as an explicit ranked list,
//! filters out candidates that would interpenetrate an existing primitive,
//! and picks the survivor closest to the requested Y.

use crate::types::{Primitive, ShapeKind, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Vertical and interpenetration tolerances for placement checks.
#[derive(Debug, Clone, Copy)]
pub struct Tolerances {
    /// Maximum vertical gap treated as "touching" a support surface.
    pub snap: f32,
    /// Interpenetration depth beyond which two boxes count as overlapping.
    /// Touching is allowed.
    pub overlap: f32,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            snap: 0.5,
            overlap: 0.05,
        }
    }
}

/// Axis-aligned bounding box derived from a primitive's center and scale.
/// Rotation is not considered for collision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_center_scale(center: Vec3, scale: Vec3) -> Self {
        let half = Vec3::new(scale.x / 2.0, scale.y / 2.0, scale.z / 2.0);
        Self {
            min: Vec3::new(center.x - half.x, center.y - half.y, center.z - half.z),
            max: Vec3::new(center.x + half.x, center.y + half.y, center.z + half.z),
        }
    }

    /// Whether the horizontal footprints overlap with positive area.
    /// Edge-touching footprints do not count as overlap.
    pub fn footprint_overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.z < other.max.z
            && other.min.z < self.max.z
    }

    /// Whether the boxes interpenetrate by more than `tolerance` on every
    /// axis. Touching faces (zero or near-zero penetration on any axis)
    /// are allowed.
    pub fn interpenetrates(&self, other: &Aabb, tolerance: f32) -> bool {
        let px = self.max.x.min(other.max.x) - self.min.x.max(other.min.x);
        let py = self.max.y.min(other.max.y) - self.min.y.max(other.min.y);
        let pz = self.max.z.min(other.max.z) - self.min.z.max(other.min.z);
        px > tolerance && py > tolerance && pz > tolerance
    }
}

/// Why a placement was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectionReason {
    /// No support surface within snap tolerance of the requested bottom.
    Floating,
    /// Support surfaces were in tolerance, but every snapped position
    /// would interpenetrate an existing primitive.
    Overlapping,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::Floating => f.write_str("floating"),
            RejectionReason::Overlapping => f.write_str("overlapping"),
        }
    }
}

/// Outcome of a placement check.
///
/// Invalid verdicts still carry a `corrected_y` best-guess: the canonical
/// "try here instead" hint the batch loop substitutes before its single
/// re-validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementVerdict {
    pub valid: bool,
    pub corrected_y: Option<f32>,
    pub rejection: Option<RejectionReason>,
}

impl PlacementVerdict {
    fn accepted(corrected_y: Option<f32>) -> Self {
        Self {
            valid: true,
            corrected_y,
            rejection: None,
        }
    }

    fn rejected(reason: RejectionReason, hint: Option<f32>) -> Self {
        Self {
            valid: false,
            corrected_y: hint,
            rejection: Some(reason),
        }
    }
}

/// A candidate support surface, ranked. Primitive tops are ranked before
/// the ground so that at an exact distance tie the stacking intent wins.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SurfaceCandidate {
    surface_y: f32,
    is_ground: bool,
}

/// Validate a candidate placement against the existing primitives.
///
/// Exempt shapes are always valid and receive no correction. For the rest,
/// the returned `corrected_y` is the snapped center Y the caller must use;
/// the requested Y is only honored indirectly, as the distance metric that
/// ranks candidate surfaces.
pub fn validate_placement(
    shape: ShapeKind,
    position: Vec3,
    scale: Vec3,
    existing: &[Primitive],
    tolerances: &Tolerances,
) -> PlacementVerdict {
    if shape.is_exempt() {
        return PlacementVerdict::accepted(None);
    }

    let requested_bottom = position.y - scale.y / 2.0;
    let own_footprint = Aabb::from_center_scale(position, scale);

    // Ranked candidate list: footprint-overlapping primitive tops first,
    // ground last. Exempt primitives neither support nor collide.
    let mut candidates: Vec<SurfaceCandidate> = Vec::new();
    for p in existing {
        if p.shape.is_exempt() {
            continue;
        }
        let their_box = Aabb::from_center_scale(p.position, p.scale);
        if own_footprint.footprint_overlaps(&their_box) {
            candidates.push(SurfaceCandidate {
                surface_y: p.top_y(),
                is_ground: false,
            });
        }
    }
    candidates.push(SurfaceCandidate {
        surface_y: 0.0,
        is_ground: true,
    });

    let in_tolerance: Vec<SurfaceCandidate> = candidates
        .iter()
        .copied()
        .filter(|c| (requested_bottom - c.surface_y).abs() <= tolerances.snap)
        .collect();

    // Snap to each in-tolerance surface and discard candidates whose
    // resulting box interpenetrates anything.
    let mut best: Option<(SurfaceCandidate, f32)> = None;
    for candidate in &in_tolerance {
        let snapped_center = candidate.surface_y + scale.y / 2.0;
        let snapped_box = Aabb::from_center_scale(
            Vec3::new(position.x, snapped_center, position.z),
            scale,
        );
        let collides = existing.iter().any(|p| {
            !p.shape.is_exempt()
                && snapped_box.interpenetrates(
                    &Aabb::from_center_scale(p.position, p.scale),
                    tolerances.overlap,
                )
        });
        if collides {
            continue;
        }
        let distance = (snapped_center - position.y).abs();
        let wins = match &best {
            None => true,
            // Closest to the requested Y wins; at an exact tie a
            // primitive top beats the ground (stacking intent).
            Some((current, d)) => {
                distance < *d || (distance == *d && current.is_ground && !candidate.is_ground)
            }
        };
        if wins {
            best = Some((*candidate, distance));
        }
    }

    if let Some((winner, _)) = best {
        return PlacementVerdict::accepted(Some(winner.surface_y + scale.y / 2.0));
    }

    let reason = if in_tolerance.is_empty() {
        RejectionReason::Floating
    } else {
        RejectionReason::Overlapping
    };
    PlacementVerdict::rejected(reason, best_guess_y(&candidates, position.y, scale.y))
}

/// Validate with the bounded single-correction retry: validate, substitute
/// the corrected Y, validate once more, accept or fail. A strict two-step
/// pipeline, never a loop; this is what bounds the cost of one piece and
/// prevents oscillation between candidate surfaces.
///
/// On failure the first verdict's rejection is reported: the caller asked
/// for the original placement, and that is the position the reason should
/// describe.
pub fn resolve_placement(
    shape: ShapeKind,
    position: Vec3,
    scale: Vec3,
    existing: &[Primitive],
    tolerances: &Tolerances,
) -> Result<Vec3, RejectionReason> {
    let verdict = validate_placement(shape, position, scale, existing, tolerances);
    if verdict.valid {
        let y = verdict.corrected_y.unwrap_or(position.y);
        return Ok(Vec3::new(position.x, y, position.z));
    }

    let first_reason = verdict.rejection.unwrap_or(RejectionReason::Floating);
    let Some(corrected) = verdict.corrected_y else {
        return Err(first_reason);
    };

    let retry = Vec3::new(position.x, corrected, position.z);
    let second = validate_placement(shape, retry, scale, existing, tolerances);
    if second.valid {
        let y = second.corrected_y.unwrap_or(retry.y);
        Ok(Vec3::new(position.x, y, position.z))
    } else {
        Err(first_reason)
    }
}

/// The "try here instead" hint for a rejected placement: among every
/// footprint-overlapping top face and the ground, the snapped center
/// closest to the requested Y, tolerance ignored.
fn best_guess_y(candidates: &[SurfaceCandidate], requested_y: f32, scale_y: f32) -> Option<f32> {
    candidates
        .iter()
        .map(|c| c.surface_y + scale_y / 2.0)
        .fold(None, |best: Option<f32>, snapped| match best {
            Some(b) if (b - requested_y).abs() <= (snapped - requested_y).abs() => Some(b),
            _ => Some(snapped),
        })
}
