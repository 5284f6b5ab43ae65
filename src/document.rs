// src/document.rs
// =============================================================================
// This module finds and rewrites resolvable links inside a JSON document.
//
// The documents are arbitrarily nested objects/arrays; somewhere in there,
// objects carry a "url" field whose string value contains the vcloud.zip
// marker. We never restructure the document - we only read those values
// out (locate) and write resolved tokens back over them (update).
//
// Rust concepts:
// - serde_json::Value: A tagged tree of Null/Bool/Number/String/Array/Object
// - Recursion: The natural shape for walking a tree of unknown depth
// - &mut: The updater mutates the document in place
// =============================================================================

use serde_json::Value;
use std::collections::BTreeMap;

use crate::resolver::LINK_MARKER;

/// Field name whose values may hold resolvable links
pub const LINK_FIELD: &str = "url";

// Collects every resolvable link in the document, depth-first
//
// Returns all occurrences in traversal order; the same URL appearing in
// several places shows up once per occurrence (the engine deduplicates).
pub fn find_links(document: &Value) -> Vec<String> {
    let mut links = Vec::new();
    collect_links(document, &mut links);
    links
}

fn collect_links(value: &Value, links: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match child {
                    Value::String(s) if key == LINK_FIELD && s.contains(LINK_MARKER) => {
                        links.push(s.clone());
                    }
                    _ => collect_links(child, links),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_links(item, links);
            }
        }
        // Scalars can't contain links
        _ => {}
    }
}

// Replaces resolved links with their tokens, in place
//
// Only values present in `resolutions` are touched; unresolved links stay
// exactly as they were. Applying the same map twice is a no-op the second
// time: the replaced values no longer contain the marker.
pub fn apply_resolutions(document: &mut Value, resolutions: &BTreeMap<String, String>) {
    match document {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                let replacement = match child {
                    Value::String(s) if key == LINK_FIELD && s.contains(LINK_MARKER) => {
                        resolutions.get(s.as_str()).cloned()
                    }
                    _ => None,
                };

                match replacement {
                    Some(token) => *child = Value::String(token),
                    None => apply_resolutions(child, resolutions),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                apply_resolutions(item, resolutions);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_document() -> Value {
        json!({
            "title": "catalog",
            "entries": [
                { "name": "a", "url": "https://vcloud.zip/aaa" },
                { "name": "b", "url": "https://other.site/keep-me" },
                {
                    "nested": {
                        "deeper": [
                            { "url": "https://vcloud.zip/bbb" }
                        ]
                    }
                }
            ],
            "meta": { "url": "https://vcloud.zip/aaa" }
        })
    }

    #[test]
    fn test_find_links_collects_every_occurrence() {
        let links = find_links(&sample_document());
        assert_eq!(links.len(), 3);
        assert_eq!(links.iter().filter(|l| l.ends_with("/aaa")).count(), 2);
        assert_eq!(links.iter().filter(|l| l.ends_with("/bbb")).count(), 1);
    }

    #[test]
    fn test_find_links_ignores_other_fields_and_domains() {
        let doc = json!({
            "url": "https://other.site/x",
            "href": "https://vcloud.zip/wrong-field",
            "items": [{ "url": 42 }]
        });
        assert!(find_links(&doc).is_empty());
    }

    #[test]
    fn test_apply_resolutions_replaces_all_occurrences() {
        let mut doc = sample_document();
        let mut resolutions = BTreeMap::new();
        resolutions.insert("https://vcloud.zip/aaa".to_string(), "TOKEN_A".to_string());
        resolutions.insert("https://vcloud.zip/bbb".to_string(), "TOKEN_B".to_string());

        apply_resolutions(&mut doc, &resolutions);

        assert_eq!(doc["entries"][0]["url"], "TOKEN_A");
        assert_eq!(doc["meta"]["url"], "TOKEN_A");
        assert_eq!(doc["entries"][2]["nested"]["deeper"][0]["url"], "TOKEN_B");
        // Unrelated link untouched
        assert_eq!(doc["entries"][1]["url"], "https://other.site/keep-me");
    }

    #[test]
    fn test_apply_resolutions_leaves_unmapped_links_alone() {
        let mut doc = sample_document();
        let resolutions = BTreeMap::new();

        apply_resolutions(&mut doc, &resolutions);

        assert_eq!(doc, sample_document());
    }

    #[test]
    fn test_apply_resolutions_is_idempotent() {
        let mut once = sample_document();
        let mut resolutions = BTreeMap::new();
        resolutions.insert("https://vcloud.zip/aaa".to_string(), "TOKEN_A".to_string());

        apply_resolutions(&mut once, &resolutions);
        let mut twice = once.clone();
        apply_resolutions(&mut twice, &resolutions);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_find_links_after_update_sees_only_unresolved() {
        let mut doc = sample_document();
        let mut resolutions = BTreeMap::new();
        resolutions.insert("https://vcloud.zip/aaa".to_string(), "TOKEN_A".to_string());

        apply_resolutions(&mut doc, &resolutions);
        let remaining = find_links(&doc);

        assert_eq!(remaining, vec!["https://vcloud.zip/bbb".to_string()]);
    }
}
