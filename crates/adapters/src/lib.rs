// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Process-level adapters: subprocess execution with timeouts, and the
//! worker executor backends (direct subprocess and docker container).

pub mod env;
mod executor;
mod subprocess;

pub use executor::{
    DirectExecutor, DockerExecutor, ExecutorError, WorkerExecutor, WorkerLaunchConfig,
};
pub use subprocess::{
    run_with_timeout, CommandOutcome, DIAGRAM_TIMEOUT, DOCKER_TIMEOUT, NOTEBOOK_TIMEOUT,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use executor::FakeExecutor;
