//! End-to-end build flow scenarios.

use super::test_utils::{spawn_engine, spawn_engine_with, WorldDir};
use plinth::config::WorldConfig;
use plinth::error::BuildError;
use plinth::events::BuildEvent;
use plinth::plan::{BatchOutcome, FailureReason, PlanCompletion};
use plinth::store::PrimitiveStore;
use plinth::template::{BlueprintTemplate, PieceSpec, TemplateLibrary, TemplatePhase};
use plinth::types::{ActorId, ShapeKind, Vec3};

#[test]
fn vertical_blueprint_stacks_every_piece() {
    let world = WorldDir::new();
    let t = spawn_engine(&world);
    let actor = ActorId::from("mason");
    t.ledger.grant(&actor, 10);

    let summary = t.engine.start(&actor, "obelisk", (12.0, -3.0), 0.0).unwrap();
    assert_eq!(summary.total_pieces, 4);
    assert_eq!(summary.phases, vec!["foundation", "shaft"]);
    assert_eq!(summary.estimated_batches, 1);

    match t.engine.advance(&actor).unwrap() {
        BatchOutcome::Finished(PlanCompletion::Completed { placed }) => assert_eq!(placed, 4),
        other => panic!("expected completed, got {other:?}"),
    }

    let placed = t
        .primitives
        .all_near(Vec3::new(12.0, 0.0, -3.0), 10.0)
        .unwrap();
    assert_eq!(placed.len(), 4);

    // The base rests on the ground; the first shaft cylinder rests on the
    // base's top face, not the ground.
    let base = &placed[0];
    assert!((base.bottom_y() - 0.0).abs() < 1e-5);
    let cylinder = &placed[1];
    assert_eq!(cylinder.shape, ShapeKind::Cylinder);
    assert!((cylinder.bottom_y() - base.top_y()).abs() < 1e-5);

    // Each subsequent piece rests on the one below.
    for pair in placed.windows(2) {
        assert!((pair[1].bottom_y() - pair[0].top_y()).abs() < 1e-5);
    }

    // Downstream collaborators heard about the whole lifecycle.
    let events = t.events.events();
    assert!(matches!(events.first(), Some(BuildEvent::PlanStarted { .. })));
    assert!(matches!(events.last(), Some(BuildEvent::PlanFinished { .. })));
}

#[test]
fn second_start_fails_until_cancel() {
    let world = WorldDir::new();
    let t = spawn_engine(&world);
    let actor = ActorId::from("mason");
    t.ledger.grant(&actor, 10);

    t.engine.start(&actor, "obelisk", (0.0, 0.0), 0.0).unwrap();
    match t.engine.start(&actor, "cabin", (8.0, 8.0), 0.0) {
        Err(BuildError::AlreadyActive(who)) => assert_eq!(who, actor),
        other => panic!("expected AlreadyActive, got {other:?}"),
    }

    t.engine.cancel(&actor).unwrap();
    let summary = t.engine.start(&actor, "cabin", (8.0, 8.0), 0.0).unwrap();
    assert_eq!(summary.blueprint_name, "cabin");

    // A different actor is unaffected throughout.
    let other = ActorId::from("rival");
    t.ledger.grant(&other, 10);
    t.engine.start(&other, "obelisk", (-8.0, -8.0), 0.0).unwrap();
}

#[test]
fn too_far_from_site_blocks_the_batch() {
    let world = WorldDir::new();
    let t = spawn_engine(&world);
    let actor = ActorId::from("mason");
    t.ledger.grant(&actor, 10);

    t.engine.start(&actor, "obelisk", (10.0, 0.0), 0.0).unwrap();
    t.locator.place(&actor, Vec3::new(10.0, 0.0, 60.0));

    match t.engine.advance(&actor).unwrap_err() {
        BuildError::TooFarFromSite {
            distance,
            anchor_x,
            anchor_z,
            radius,
        } => {
            assert!((distance - 60.0).abs() < 1e-4);
            assert!((anchor_x - 10.0).abs() < 1e-6);
            assert!(anchor_z.abs() < 1e-6);
            assert!((radius - 24.0).abs() < 1e-6);
        }
        other => panic!("expected TooFarFromSite, got {other:?}"),
    }
    assert_eq!(t.primitives.len().unwrap(), 0);

    // Walking back into range unblocks it.
    t.locator.place(&actor, Vec3::new(12.0, 0.0, 2.0));
    t.engine.advance(&actor).unwrap();
    assert_eq!(t.primitives.len().unwrap(), 4);
}

#[test]
fn status_mirrors_advance_progress() {
    let world = WorldDir::new();
    let t = spawn_engine(&world);
    let actor = ActorId::from("mason");
    t.ledger.grant(&actor, 10);

    assert!(!t.engine.status(&actor).unwrap().active);

    t.engine.start(&actor, "cabin", (0.0, 0.0), 0.0).unwrap();
    let fresh = t.engine.status(&actor).unwrap();
    assert!(fresh.active);
    let progress = fresh.progress.unwrap();
    assert_eq!(progress.placed, 0);
    assert_eq!(progress.total, 7);
    assert_eq!(progress.phase_label, "foundation");
    assert_eq!(progress.next_batch, 5);

    let advanced = match t.engine.advance(&actor).unwrap() {
        BatchOutcome::InProgress(snapshot) => snapshot,
        other => panic!("expected progress, got {other:?}"),
    };
    let queried = t.engine.status(&actor).unwrap().progress.unwrap();
    assert_eq!(advanced, queried);
}

#[test]
fn unsupportable_piece_ends_in_completed_with_failures() {
    // A span wedged between towers of mismatched heights cannot place,
    // even after its corrected retry.
    let template = BlueprintTemplate {
        name: "ledge".to_string(),
        version: 1,
        phases: vec![
            TemplatePhase {
                label: "towers".to_string(),
                pieces: vec![
                    piece_spec(ShapeKind::Box, (0.0, 1.0, 0.0), (1.0, 2.0, 1.0)),
                    piece_spec(ShapeKind::Box, (1.2, 0.5, 0.0), (1.0, 1.0, 1.0)),
                ],
            },
            TemplatePhase {
                label: "span".to_string(),
                pieces: vec![piece_spec(ShapeKind::Box, (0.6, 1.55, 0.0), (1.4, 1.0, 1.0))],
            },
        ],
    };
    let mut templates = TemplateLibrary::builtin();
    templates.insert(template);

    let world = WorldDir::new();
    let t = spawn_engine_with(&world, templates, WorldConfig::default());
    let actor = ActorId::from("mason");
    t.ledger.grant(&actor, 10);

    t.engine.start(&actor, "ledge", (0.0, 0.0), 0.0).unwrap();
    match t.engine.advance(&actor).unwrap() {
        BatchOutcome::Finished(PlanCompletion::CompletedWithFailures {
            placed,
            failed,
            failures,
        }) => {
            assert_eq!(placed, 2);
            assert_eq!(failed, 1);
            assert_eq!(failures[0].index, 2);
            assert_eq!(failures[0].reason, FailureReason::Overlapping);
        }
        other => panic!("expected completed_with_failures, got {other:?}"),
    }

    // The plan is cleared; the actor can start again.
    assert!(!t.engine.status(&actor).unwrap().active);
    t.engine.start(&actor, "obelisk", (20.0, 0.0), 0.0).unwrap();
}

fn piece_spec(shape: ShapeKind, offset: (f32, f32, f32), scale: (f32, f32, f32)) -> PieceSpec {
    PieceSpec {
        shape,
        offset: Vec3::new(offset.0, offset.1, offset.2),
        rotation: Vec3::default(),
        scale: Vec3::new(scale.0, scale.1, scale.2),
        color: "#cccccc".to_string(),
    }
}
