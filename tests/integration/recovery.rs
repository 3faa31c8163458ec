//! Restart recovery and TTL sweep behavior.

use super::test_utils::{spawn_engine, WorldDir};
use plinth::plan::{now_millis, BatchOutcome, PlanCompletion};
use plinth::store::{PlanStore, PrimitiveStore};
use plinth::types::{ActorId, ShapeKind, Vec3};

#[test]
fn plan_survives_restart_and_resumes() {
    let world = WorldDir::new();
    let actor = ActorId::from("mason");

    {
        let t = spawn_engine(&world);
        t.ledger.grant(&actor, 10);
        t.engine.start(&actor, "cabin", (0.0, 0.0), 0.0).unwrap();
        match t.engine.advance(&actor).unwrap() {
            BatchOutcome::InProgress(snapshot) => assert_eq!(snapshot.placed, 5),
            other => panic!("expected progress, got {other:?}"),
        }
        t.primitives.flush().unwrap();
    }

    // "Restart": a fresh engine over the same database.
    let t = spawn_engine(&world);
    t.ledger.grant(&actor, 10);

    // The reservation was rebuilt: a second plan is still refused.
    assert!(t.engine.start(&actor, "obelisk", (9.0, 9.0), 0.0).is_err());

    // Progress was not lost.
    let status = t.engine.status(&actor).unwrap();
    assert!(status.active);
    let progress = status.progress.unwrap();
    assert_eq!(progress.placed, 5);
    assert_eq!(progress.cursor, 5);

    // Resuming finishes the build without re-placing anything.
    match t.engine.advance(&actor).unwrap() {
        BatchOutcome::Finished(PlanCompletion::Completed { placed }) => assert_eq!(placed, 7),
        other => panic!("expected completed, got {other:?}"),
    }
    assert_eq!(t.primitives.len().unwrap(), 7);
}

#[test]
fn interrupted_run_matches_uninterrupted_run() {
    let actor = ActorId::from("mason");

    // Uninterrupted reference run.
    let reference_world = WorldDir::new();
    let reference: Vec<(ShapeKind, Vec3)> = {
        let t = spawn_engine(&reference_world);
        t.ledger.grant(&actor, 10);
        t.engine.start(&actor, "cabin", (0.0, 0.0), 0.0).unwrap();
        while !matches!(
            t.engine.advance(&actor).unwrap(),
            BatchOutcome::Finished(_)
        ) {}
        t.primitives
            .all_near(Vec3::default(), 100.0)
            .unwrap()
            .into_iter()
            .map(|p| (p.shape, p.position))
            .collect()
    };

    // Same build with a restart between batches.
    let world = WorldDir::new();
    {
        let t = spawn_engine(&world);
        t.ledger.grant(&actor, 10);
        t.engine.start(&actor, "cabin", (0.0, 0.0), 0.0).unwrap();
        t.engine.advance(&actor).unwrap();
        t.primitives.flush().unwrap();
        t.plans.flush().unwrap();
    }
    let t = spawn_engine(&world);
    t.ledger.grant(&actor, 10);
    match t.engine.advance(&actor).unwrap() {
        BatchOutcome::Finished(PlanCompletion::Completed { placed }) => assert_eq!(placed, 7),
        other => panic!("expected completed, got {other:?}"),
    }

    let resumed: Vec<(ShapeKind, Vec3)> = t
        .primitives
        .all_near(Vec3::default(), 100.0)
        .unwrap()
        .into_iter()
        .map(|p| (p.shape, p.position))
        .collect();
    assert_eq!(resumed, reference);
}

#[test]
fn stale_plans_are_purged_at_recovery() {
    let world = WorldDir::new();
    let stale_actor = ActorId::from("sleeper");

    {
        let t = spawn_engine(&world);
        t.ledger.grant(&stale_actor, 10);
        t.engine
            .start(&stale_actor, "obelisk", (0.0, 0.0), 0.0)
            .unwrap();

        // Backdate the plan beyond the TTL window (default 6 hours).
        let mut record = t.plans.get(&stale_actor).unwrap().unwrap();
        record.updated_at_ms = now_millis().saturating_sub(7 * 60 * 60 * 1000);
        t.plans.upsert(&stale_actor, &record, Some(0)).unwrap();
        t.plans.flush().unwrap();
    }

    let t = spawn_engine(&world);
    // The abandoned row is gone and the actor is free to start over.
    assert!(t.plans.get(&stale_actor).unwrap().is_none());
    assert!(!t.engine.status(&stale_actor).unwrap().active);
    t.ledger.grant(&stale_actor, 10);
    t.engine
        .start(&stale_actor, "obelisk", (0.0, 0.0), 0.0)
        .unwrap();
}

#[test]
fn runtime_sweep_clears_expired_reservations() {
    let world = WorldDir::new();
    let t = spawn_engine(&world);
    let actor = ActorId::from("sleeper");
    t.ledger.grant(&actor, 10);

    t.engine.start(&actor, "obelisk", (0.0, 0.0), 0.0).unwrap();

    // Nothing to sweep while the plan is fresh.
    assert_eq!(t.engine.sweep_expired().unwrap(), 0);
    assert!(t.engine.start(&actor, "cabin", (5.0, 5.0), 0.0).is_err());

    // Backdate, then sweep: reservation and row both go.
    let mut record = t.plans.get(&actor).unwrap().unwrap();
    record.updated_at_ms = now_millis().saturating_sub(7 * 60 * 60 * 1000);
    t.plans.upsert(&actor, &record, Some(0)).unwrap();

    assert_eq!(t.engine.sweep_expired().unwrap(), 1);
    t.engine.start(&actor, "cabin", (5.0, 5.0), 0.0).unwrap();
}

#[test]
fn version_is_bumped_per_persisted_step() {
    let world = WorldDir::new();
    let t = spawn_engine(&world);
    let actor = ActorId::from("mason");
    t.ledger.grant(&actor, 10);

    t.engine.start(&actor, "cabin", (0.0, 0.0), 0.0).unwrap();
    assert_eq!(t.plans.get(&actor).unwrap().unwrap().version, 0);

    t.engine.advance(&actor).unwrap();
    // Five pieces attempted, one version bump each.
    assert_eq!(t.plans.get(&actor).unwrap().unwrap().version, 5);
}
