// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! HTTP bridge between containerized workers and the host's job queue.
//!
//! Container workers cannot safely open the host's SQLite file, so the host
//! runs this small JSON-over-HTTP service and containers drive the queue
//! through it. The endpoints mirror the queue operations one to one.

mod client;
mod routes;
mod server;
mod types;

pub use client::{ClientError, WorkerApiClient};
pub use server::{ApiServer, ApiServerHandle, ServerError};
pub use types::*;
