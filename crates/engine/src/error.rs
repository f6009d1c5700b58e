// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine.

use cb_core::BuildError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] cb_storage::StorageError),

    #[error("executor error: {0}")]
    Executor(#[from] cb_adapters::ExecutorError),

    #[error("api server error: {0}")]
    Api(#[from] cb_api::ServerError),

    #[error("failed to read course spec {path}: {message}")]
    SpecRead { path: PathBuf, message: String },

    #[error("invalid course spec {path}: {message}")]
    SpecInvalid { path: PathBuf, message: String },

    #[error("failed to read source file {path}: {message}")]
    SourceRead { path: PathBuf, message: String },

    #[error("failed to encode payload for {path}: {message}")]
    PayloadEncode { path: PathBuf, message: String },

    #[error("image name collision: {name} appears with different content in {first} and {second}")]
    ImageCollision {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("another build is already running (lock held on {0})")]
    BuildLocked(PathBuf),

    #[error("filesystem watcher error: {0}")]
    Watch(String),

    #[error("{}", .0.message)]
    Fatal(BuildError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to restore .git directory from {moved} to {original}: {message}")]
    GitRestoreFailed {
        original: PathBuf,
        moved: PathBuf,
        message: String,
    },
}
