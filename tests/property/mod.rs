//! Property-based tests for the build-placement engine

mod invariants;
