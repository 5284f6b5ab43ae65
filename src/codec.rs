// src/codec.rs
// =============================================================================
// This module handles the two decoding schemes the redirect chain uses to
// smuggle URLs inside other URLs.
//
// Key functionality:
// - Base64 decode (the chain wraps inner URLs in standard base64)
// - Percent-decoding that PRESERVES '+' characters
//
// Why a special percent decoder?
// - The smuggled payloads are base64, and the base64 alphabet contains '+'
// - HTML-form decoding ("plus-as-space") turns '+' into ' ' and corrupts
//   the payload; we need "plus-as-literal" semantics instead
// - Some hops have already been through a plus-as-space decode upstream,
//   so a literal space in a payload really means '+'; we restore it
//
// Rust concepts:
// - Pure functions: No I/O here, everything is string in / string out
// - Result<T, E>: Decoding can fail, and the caller decides what that means
// =============================================================================

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use percent_encoding::percent_decode_str;

use crate::resolver::ResolveError;

// Decodes a standard-alphabet base64 string into UTF-8 text
//
// Parameters:
//   encoded: the base64 text (borrowed as &str)
//
// Returns: the decoded string, or ResolveError::Decode if the input is not
// valid base64 or the decoded bytes are not valid UTF-8
pub fn decode_base64_to_string(encoded: &str) -> Result<String, ResolveError> {
    let bytes = BASE64_STANDARD
        .decode(encoded)
        .map_err(|e| ResolveError::Decode(format!("invalid base64: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| ResolveError::Decode(format!("decoded bytes are not UTF-8: {}", e)))
}

// Encodes a string as standard-alphabet base64
//
// The resolver itself never encodes; the tests use this to build synthetic
// payloads, and it documents the exact inverse of the decoder.
#[cfg(test)]
pub fn encode_base64(plain: &str) -> String {
    BASE64_STANDARD.encode(plain.as_bytes())
}

// Percent-decodes a string with plus-as-literal semantics
//
// Two rules, in this order:
// 1. '%2B' (and every other percent escape) is decoded normally
// 2. a literal ' ' becomes '+' - a space can only have gotten into a base64
//    payload through an earlier plus-as-space decode, so we undo it
//
// Invalid UTF-8 after decoding falls back to the original input unchanged;
// the downstream base64 decode will report the real problem.
pub fn url_decode_preserving_plus(encoded: &str) -> String {
    let decoded = match percent_decode_str(encoded).decode_utf8() {
        Ok(cow) => cow.into_owned(),
        Err(_) => encoded.to_string(),
    };

    decoded.replace(' ', "+")
}

// Plain percent-decoding, '+' left untouched
//
// Used for values that are NOT base64 payloads: the captcha 'continue'
// parameter and meta-refresh targets, which are percent-encoded URLs.
pub fn url_decode(encoded: &str) -> String {
    match percent_decode_str(encoded).decode_utf8() {
        Ok(cow) => cow.into_owned(),
        Err(_) => encoded.to_string(),
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is BASE64_STANDARD?
//    - The base64 crate supports several alphabets (standard, URL-safe, ...)
//    - The redirect hosts use the standard alphabet ('+' and '/'),
//      which is exactly why percent-decoding has to be so careful
//
// 2. What is Cow<str>?
//    - "Clone on write" - either a borrowed &str or an owned String
//    - percent_decode_str returns one: if nothing needed decoding, it
//      hands back the original slice without allocating
//    - .into_owned() converts either case into a String
//
// 3. Why not use url::form_urlencoded?
//    - Form decoding treats '+' as a space - the exact bug we're avoiding
// -----------------------------------------------------------------------------
