//! Shared test utilities for integration tests.
//!
//! Builds a full engine over a sled database in a temp directory. The
//! database path outlives the engine so tests can drop an engine and
//! spawn a fresh one against the same data, simulating a process restart.

use plinth::config::WorldConfig;
use plinth::engine::BuildEngine;
use plinth::events::RecordingSink;
use plinth::ledger::MemoryLedger;
use plinth::location::FixedLocator;
use plinth::store::{SledPlanStore, SledPrimitiveStore};
use plinth::template::TemplateLibrary;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A world directory that persists across engine restarts within a test.
pub struct WorldDir {
    dir: TempDir,
}

impl WorldDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// One "process lifetime": an engine plus handles to its collaborators.
/// Dropping it closes the sled database so a successor can reopen it.
pub struct TestEngine {
    pub engine: BuildEngine,
    pub plans: Arc<SledPlanStore>,
    pub primitives: Arc<SledPrimitiveStore>,
    pub ledger: Arc<MemoryLedger>,
    pub locator: Arc<FixedLocator>,
    pub events: Arc<RecordingSink>,
}

/// Open the world database and run startup recovery, as a server process
/// would.
pub fn spawn_engine(world: &WorldDir) -> TestEngine {
    spawn_engine_with(world, TemplateLibrary::builtin(), WorldConfig::default())
}

pub fn spawn_engine_with(
    world: &WorldDir,
    templates: TemplateLibrary,
    config: WorldConfig,
) -> TestEngine {
    let db = sled::open(world.path()).unwrap();
    let plans = Arc::new(SledPlanStore::from_db(db.clone()).unwrap());
    let primitives = Arc::new(SledPrimitiveStore::from_db(db).unwrap());
    let ledger = Arc::new(MemoryLedger::new());
    let locator = Arc::new(FixedLocator::default());
    let events = Arc::new(RecordingSink::new());

    let engine = BuildEngine::new(
        plans.clone(),
        primitives.clone(),
        ledger.clone(),
        locator.clone(),
        events.clone(),
        templates,
        config,
    );
    engine.recover().unwrap();

    TestEngine {
        engine,
        plans,
        primitives,
        ledger,
        locator,
        events,
    }
}
