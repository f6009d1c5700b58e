// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-build image name registry.
//!
//! Notebooks reference images by bare filename, so every emitted image name
//! must be unique across the whole course. Two source files producing the
//! same image name with different content is a build error; byte-identical
//! duplicates are allowed (topics share common diagrams).

use crate::error::EngineError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct ImageRegistry {
    /// image file name -> (source path, content hash)
    seen: HashMap<String, (PathBuf, String)>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one emitted image. Returns an error on a name collision
    /// with differing content.
    pub fn register(
        &mut self,
        image_name: &str,
        source: &Path,
        content_hash: &str,
    ) -> Result<(), EngineError> {
        match self.seen.get(image_name) {
            None => {
                self.seen.insert(
                    image_name.to_string(),
                    (source.to_path_buf(), content_hash.to_string()),
                );
                Ok(())
            }
            Some((first_source, first_hash)) if first_hash == content_hash => {
                tracing::debug!(
                    image = image_name,
                    first = %first_source.display(),
                    duplicate = %source.display(),
                    "identical image duplicate allowed"
                );
                Ok(())
            }
            Some((first_source, _)) => Err(EngineError::ImageCollision {
                name: image_name.to_string(),
                first: first_source.clone(),
                second: source.to_path_buf(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
#[path = "images_tests.rs"]
mod tests;
