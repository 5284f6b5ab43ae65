// src/engine/batch.rs
// =============================================================================
// This module implements the parallel batch run over one JSON document.
//
// The life of a link: Pending -> Resolving -> Resolved or Failed.
// - Links already in the checkpoint never enter the pool again
// - Resolved links are recorded and persisted immediately
// - Failed links are logged and NOT recorded, so the next run retries them
//   (transient network hiccups and captcha walls self-heal via reruns)
//
// Concurrency model:
// - A fixed-width pool via buffer_unordered: up to N links resolving at
//   once, each end-to-end inside its own future with its own HTTP clients
// - Results come back in completion order, not submission order
// - The aggregator (the while-let loop below) is the only owner of the
//   checkpoint and the counters, so checkpoint writes are serialized by
//   construction - no lock needed
//
// A single link failing never stops the batch. The only fatal error after
// startup is failing to persist the checkpoint itself.
// =============================================================================

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::checkpoint::CheckpointStore;
use crate::document;
use crate::resolver;

/// Default worker-pool width for batch runs
pub const DEFAULT_WORKERS: usize = 50;

/// Pause between the two resolution phases of every link
const PHASE_DELAY: Duration = Duration::from_secs(5);

/// What a finished batch run looked like
#[derive(Debug)]
pub struct BatchSummary {
    /// Unique resolvable links discovered in the document
    pub total_links: usize,
    /// Links with a token in the checkpoint (this run plus earlier ones)
    pub resolved: usize,
    /// Links that failed this run (left for the next run to retry)
    pub failed_this_run: usize,
    /// Where the rewritten document was saved
    pub output_file: PathBuf,
    /// Where the checkpoint lives
    pub progress_file: PathBuf,
}

// Resolves every pending link in the document and writes the output file
//
// Parameters:
//   input_file: path to the JSON document
//   workers: worker-pool width (clamped to at least 1)
pub async fn run_batch(input_file: &Path, workers: usize) -> Result<BatchSummary> {
    // Load and parse the document
    let raw = fs::read_to_string(input_file)
        .with_context(|| format!("could not read input file {}", input_file.display()))?;
    let mut doc: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", input_file.display()))?;

    // Discover the links; duplicates collapse to one unit of work
    println!("🔎 Finding {} links in the document...", resolver::LINK_MARKER);
    let mut seen = HashSet::new();
    let links: Vec<String> = document::find_links(&doc)
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect();
    let total_links = links.len();
    println!("📄 Found {} unique link(s) to process", total_links);

    // Checkpoint and output live next to the input, named by convention
    let (progress_file, output_file) = sibling_files(input_file)?;
    let mut store = CheckpointStore::load(&progress_file)?;

    // Anything already resolved in an earlier run is skipped outright
    let pending: Vec<String> = links
        .iter()
        .filter(|link| !store.contains(link))
        .cloned()
        .collect();
    let previously_resolved = store.resolved_count();
    let remaining = pending.len();
    println!("⏭️  Already resolved: {} | To process: {}", previously_resolved, remaining);

    let started = Instant::now();
    let mut completed = 0usize;
    let mut failed = 0usize;

    // The worker pool: each future resolves one link end-to-end and hands
    // back (link, outcome) for the aggregator to account for
    let mut results = stream::iter(pending.into_iter().map(|link| async move {
        let outcome = resolver::resolve(&link, PHASE_DELAY, false).await;
        (link, outcome)
    }))
    .buffer_unordered(workers.max(1));

    // The aggregator: sole owner of the checkpoint and the counters
    while let Some((link, outcome)) = results.next().await {
        match outcome {
            Ok(token) => store.record(link, token),
            Err(e) => {
                failed += 1;
                eprintln!("⚠️  Failed {}: {}", link, e);
            }
        }

        // Persist the FULL checkpoint after every completion, so an
        // interrupted run loses at most the link in flight
        store.persist()?;

        completed += 1;
        let elapsed = started.elapsed();
        let eta = (elapsed / completed as u32) * (remaining - completed) as u32;
        println!(
            "Progress: {}/{} | Remaining: {} | Elapsed: {} | ETA: {}",
            previously_resolved + completed,
            total_links,
            remaining - completed,
            format_hms(elapsed),
            format_hms(eta),
        );
    }

    // Substitute everything we have (old and new) back into the document
    document::apply_resolutions(&mut doc, store.resolutions());
    let pretty = serde_json::to_string_pretty(&doc)?;
    fs::write(&output_file, pretty)
        .with_context(|| format!("could not write output file {}", output_file.display()))?;

    Ok(BatchSummary {
        total_links,
        resolved: store.resolved_count(),
        failed_this_run: failed,
        output_file,
        progress_file,
    })
}

// Derives the checkpoint and output paths from the input path
//
// "catalog.json" -> ("catalog_progress.json", "catalog_output.json"),
// both in the input file's directory.
fn sibling_files(input_file: &Path) -> Result<(PathBuf, PathBuf)> {
    let stem = input_file
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("input path {} has no usable file name", input_file.display()))?;

    let progress = input_file.with_file_name(format!("{}_progress.json", stem));
    let output = input_file.with_file_name(format!("{}_output.json", stem));
    Ok((progress, output))
}

// Formats a duration as H:MM:SS for the progress line
fn format_hms(duration: Duration) -> String {
    let total = duration.as_secs();
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_files_follow_the_naming_convention() {
        let (progress, output) = sibling_files(Path::new("/data/catalog.json")).unwrap();
        assert_eq!(progress, Path::new("/data/catalog_progress.json"));
        assert_eq!(output, Path::new("/data/catalog_output.json"));
    }

    #[test]
    fn test_sibling_files_relative_path() {
        let (progress, output) = sibling_files(Path::new("rogd.json")).unwrap();
        assert_eq!(progress, Path::new("rogd_progress.json"));
        assert_eq!(output, Path::new("rogd_output.json"));
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(Duration::from_secs(0)), "0:00:00");
        assert_eq!(format_hms(Duration::from_secs(61)), "0:01:01");
        assert_eq!(format_hms(Duration::from_secs(3 * 3600 + 25 * 60 + 7)), "3:25:07");
    }

    #[tokio::test]
    async fn test_run_batch_with_no_links_still_writes_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("doc.json");
        fs::write(&input, r#"{"items": [{"url": "https://other.site/x"}]}"#).unwrap();

        let summary = run_batch(&input, 4).await.unwrap();

        assert_eq!(summary.total_links, 0);
        assert_eq!(summary.resolved, 0);
        assert_eq!(summary.failed_this_run, 0);

        let out = fs::read_to_string(dir.path().join("doc_output.json")).unwrap();
        let doc: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(doc["items"][0]["url"], "https://other.site/x");
    }

    #[tokio::test]
    async fn test_run_batch_resumes_from_checkpoint_without_refetching() {
        // The only link in the document is already checkpointed, so the run
        // has nothing to fetch: it must just substitute and report
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("doc.json");
        fs::write(
            &input,
            r#"{"entry": {"url": "https://vcloud.zip/a"}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("doc_progress.json"),
            r#"{"processed": {"https://vcloud.zip/a": "TOKEN_A"}}"#,
        )
        .unwrap();

        let summary = run_batch(&input, 4).await.unwrap();

        assert_eq!(summary.total_links, 1);
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.failed_this_run, 0);

        let out = fs::read_to_string(dir.path().join("doc_output.json")).unwrap();
        let doc: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(doc["entry"]["url"], "TOKEN_A");
    }
}
