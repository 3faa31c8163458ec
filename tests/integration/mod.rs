//! Integration tests for the build-placement engine

mod build_flow;
mod recovery;
mod template_check;
mod test_utils;
