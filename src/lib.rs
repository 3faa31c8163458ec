//! Plinth: Build-Placement Validation and Blueprint Execution
//!
//! The server-side core that lets autonomous clients place 3D primitive
//! shapes into a shared persistent world under physical and economic
//! constraints: a pure spatial validator, a blueprint compiler, and a
//! durable per-actor build plan engine.

pub mod compiler;
pub mod concurrency;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod geometry;
pub mod ledger;
pub mod location;
pub mod logging;
pub mod plan;
pub mod simulate;
pub mod store;
pub mod template;
pub mod types;
