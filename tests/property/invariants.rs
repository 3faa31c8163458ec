//! Property-based tests for the placement and plan invariants.

use chrono::Utc;
use plinth::config::WorldConfig;
use plinth::engine::BuildEngine;
use plinth::events::NullSink;
use plinth::geometry::{resolve_placement, Aabb, Tolerances};
use plinth::ledger::MemoryLedger;
use plinth::location::FixedLocator;
use plinth::plan::{BatchOutcome, PlanCompletion};
use plinth::store::{MemoryPrimitiveStore, PrimitiveStore, SledPlanStore};
use plinth::template::{BlueprintTemplate, PieceSpec, TemplateLibrary, TemplatePhase};
use plinth::types::{ActorId, Primitive, ShapeKind, Vec3};
use proptest::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

const SHAPES: [ShapeKind; 4] = [
    ShapeKind::Box,
    ShapeKind::Cylinder,
    ShapeKind::Sphere,
    ShapeKind::Plate,
];

fn arb_piece() -> impl Strategy<Value = PieceSpec> {
    (
        0..SHAPES.len(),
        -4.0f32..4.0,
        0.0f32..3.0,
        -4.0f32..4.0,
        0.2f32..1.2,
        0.2f32..1.2,
        0.2f32..1.2,
    )
        .prop_map(|(shape, x, y, z, sx, sy, sz)| PieceSpec {
            shape: SHAPES[shape],
            offset: Vec3::new(x, y, z),
            rotation: Vec3::default(),
            scale: Vec3::new(sx, sy, sz),
            color: "#abcdef".to_string(),
        })
}

/// Non-overlap invariant: no two placed non-exempt primitives
/// interpenetrate beyond tolerance. Support invariant: every placed
/// non-exempt primitive's bottom face sits within snap tolerance of the
/// ground or of an XZ-overlapping primitive's top face.
#[test]
fn accepted_placements_never_overlap_and_are_always_supported() {
    let tolerances = Tolerances::default();
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &proptest::collection::vec(arb_piece(), 1..40),
            |pieces| {
                let mut world: Vec<Primitive> = Vec::new();
                for spec in &pieces {
                    if let Ok(position) = resolve_placement(
                        spec.shape,
                        spec.offset,
                        spec.scale,
                        &world,
                        &tolerances,
                    ) {
                        world.push(Primitive {
                            shape: spec.shape,
                            position,
                            rotation: spec.rotation,
                            scale: spec.scale,
                            color: spec.color.clone(),
                            owner_id: ActorId::from("fuzz"),
                            created_at: Utc::now(),
                        });
                    }
                }

                let solid: Vec<&Primitive> =
                    world.iter().filter(|p| !p.shape.is_exempt()).collect();

                for (i, a) in solid.iter().enumerate() {
                    let box_a = Aabb::from_center_scale(a.position, a.scale);

                    for b in solid.iter().skip(i + 1) {
                        let box_b = Aabb::from_center_scale(b.position, b.scale);
                        prop_assert!(
                            !box_a.interpenetrates(&box_b, tolerances.overlap),
                            "{:?} interpenetrates {:?}",
                            a.position,
                            b.position
                        );
                    }

                    let on_ground = a.bottom_y().abs() <= tolerances.snap;
                    let on_primitive = solid.iter().any(|b| {
                        !std::ptr::eq(*a, *b)
                            && box_a.footprint_overlaps(&Aabb::from_center_scale(
                                b.position, b.scale,
                            ))
                            && (a.bottom_y() - b.top_y()).abs() <= tolerances.snap
                    });
                    prop_assert!(
                        on_ground || on_primitive,
                        "primitive at {:?} is unsupported",
                        a.position
                    );
                }
                Ok(())
            },
        )
        .unwrap();
}

/// Cursor monotonicity, bounded termination, and completion truthfulness
/// over random single-phase templates.
#[test]
fn plans_terminate_within_bounded_continuations() {
    let mut runner = proptest::test_runner::TestRunner::new(proptest::test_runner::Config {
        cases: 24,
        ..proptest::test_runner::Config::default()
    });

    runner
        .run(
            &proptest::collection::vec(arb_piece(), 1..18),
            |pieces| {
                let total = pieces.len();
                let template = BlueprintTemplate {
                    name: "fuzz".to_string(),
                    version: 1,
                    phases: vec![TemplatePhase {
                        label: "all".to_string(),
                        pieces,
                    }],
                };
                let mut templates = TemplateLibrary::new();
                templates.insert(template);

                let dir = TempDir::new().unwrap();
                let plans = Arc::new(SledPlanStore::new(dir.path()).unwrap());
                let primitives = Arc::new(MemoryPrimitiveStore::new());
                let ledger = Arc::new(MemoryLedger::new());
                let config = WorldConfig::default();
                let batch_size = config.batch_size;
                let engine = BuildEngine::new(
                    plans,
                    primitives.clone(),
                    ledger.clone(),
                    Arc::new(FixedLocator::default()),
                    Arc::new(NullSink),
                    templates,
                    config,
                );

                let actor = ActorId::from("fuzz");
                ledger.grant(&actor, total as u64);
                engine.start(&actor, "fuzz", (0.0, 0.0), 0.0).unwrap();

                let allowed = total.div_ceil(batch_size);
                let mut last_cursor = 0usize;
                let mut finished = false;
                for call in 1..=allowed {
                    match engine.advance(&actor).unwrap() {
                        BatchOutcome::InProgress(snapshot) => {
                            prop_assert!(call < allowed, "plan overran its batch budget");
                            prop_assert!(snapshot.cursor > last_cursor);
                            prop_assert!(snapshot.cursor <= total);
                            prop_assert!(snapshot.placed + snapshot.failed == snapshot.cursor);
                            last_cursor = snapshot.cursor;
                        }
                        BatchOutcome::Finished(completion) => {
                            let placed_in_store = primitives.len().unwrap();
                            match completion {
                                PlanCompletion::Completed { placed } => {
                                    prop_assert_eq!(placed, total);
                                    prop_assert_eq!(placed_in_store, total);
                                }
                                PlanCompletion::CompletedWithFailures {
                                    placed,
                                    failed,
                                    failures,
                                } => {
                                    prop_assert!(failed >= 1);
                                    prop_assert_eq!(placed + failed, total);
                                    prop_assert_eq!(placed_in_store, placed);
                                    prop_assert_eq!(failures.len(), failed);
                                }
                            }
                            finished = true;
                            break;
                        }
                    }
                }
                prop_assert!(finished, "plan did not reach a terminal status");
                // Terminal plans are cleared.
                prop_assert!(!engine.status(&actor).unwrap().active);
                Ok(())
            },
        )
        .unwrap();
}
