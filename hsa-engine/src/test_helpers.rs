// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Helpers shared by integration tests.

use hsa_track::test_helpers::create_tracker;

use crate::engine::Engine;

/// Create an [`Engine`] whose log output is labelled with the test file.
#[must_use]
pub fn start_test(full_filepath: &str) -> Engine {
    Engine::new(&create_tracker(full_filepath))
}
