// src/resolver/error.rs
// =============================================================================
// This module defines the error taxonomy for the resolution pipeline.
//
// Why a real enum instead of anyhow everywhere?
// - The pipeline has three genuinely different failure modes, and callers
//   care which one happened:
//   * Extraction: the expected marker just wasn't in the response - the
//     page changed, or we got served a block page
//   * Decode: a payload was found but isn't valid base64/UTF-8
//   * Network: the transport itself failed (DNS, TLS, timeout, ...)
// - Hitting the redirect-hop limit is deliberately NOT an error: the last
//   response is simply treated as terminal and extraction proceeds
//
// The application layer (main.rs, engine) still uses anyhow; this enum is
// for the core, where the distinction is meaningful.
//
// Rust concepts:
// - thiserror: Derive macro that writes the Display/Error impls for us
// - #[from]: Automatic conversion so `?` works on reqwest calls
// =============================================================================

use thiserror::Error;

/// Everything that can go wrong while resolving one link
#[derive(Debug, Error)]
pub enum ResolveError {
    /// An expected pattern or marker was absent from a response
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// A recovered payload failed base64 or UTF-8 decoding
    #[error("decode failed: {0}")]
    Decode(String),

    /// Transport-level failure (connect, TLS, timeout, ...)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}
