// src/engine/checkpoint.rs
// =============================================================================
// This module persists per-link resolution progress to a JSON file.
//
// Guarantees the rest of the engine leans on:
// - The file on disk is ALWAYS valid JSON: every persist writes the full
//   document to a temporary file in the same directory and renames it over
//   the real one, so a crash mid-write never leaves a torn file
// - Loading tolerates a missing or empty file (fresh run)
// - The store only ever grows: once a link has a token it is done for good,
//   and later runs skip it
//
// Failed links are deliberately NOT recorded. Leaving them out means the
// next run picks them up again for free - reruns are the retry mechanism.
//
// Rust concepts:
// - Serde derive: The progress map serializes itself
// - PathBuf: Owned filesystem paths
// - Single ownership: The engine's aggregator owns the store, so persists
//   are naturally serialized without any locking
// =============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// On-disk shape: { "processed": { "<link>": "<token>", ... } }
#[derive(Debug, Default, Serialize, Deserialize)]
struct Progress {
    processed: BTreeMap<String, String>,
}

/// Durable map from source link to resolved token
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    progress: Progress,
}

impl CheckpointStore {
    // Loads the store from disk, or starts empty if there is nothing yet
    //
    // An empty file counts as "nothing yet" - an interrupted very first
    // run can leave one behind, and it shouldn't brick every later run.
    pub fn load(path: &Path) -> Result<Self> {
        let progress = match fs::read_to_string(path) {
            Ok(contents) if contents.trim().is_empty() => Progress::default(),
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("checkpoint file {} is corrupt", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Progress::default(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("could not read checkpoint {}", path.display()))
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            progress,
        })
    }

    /// True if this link already has a resolved token from an earlier run
    pub fn contains(&self, link: &str) -> bool {
        self.progress.processed.contains_key(link)
    }

    /// Number of links resolved so far (this run and earlier ones)
    pub fn resolved_count(&self) -> usize {
        self.progress.processed.len()
    }

    /// Records a resolved link in memory; call persist() to make it durable
    pub fn record(&mut self, link: String, token: String) {
        self.progress.processed.insert(link, token);
    }

    /// The full link -> token map
    pub fn resolutions(&self) -> &BTreeMap<String, String> {
        &self.progress.processed
    }

    // Writes the full store to disk atomically
    //
    // Write-to-temp + rename keeps the visible file valid JSON at every
    // instant. The temp file sits next to the real one so the rename never
    // crosses a filesystem boundary.
    pub fn persist(&self) -> Result<()> {
        let pretty = serde_json::to_string_pretty(&self.progress)?;

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, pretty)
            .with_context(|| format!("could not write checkpoint {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("could not move checkpoint into place at {}", self.path.display()))?;

        Ok(())
    }
}
