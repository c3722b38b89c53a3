//! # Insight Deduplication Engine
//!
//! Guards the per-meeting insight lists against repeats. Transcript
//! segments arrive from speech-to-text providers that frequently emit the
//! same sentence twice (overlapping audio windows, reconnects), so a
//! naive append would fill the decision/action lists with duplicates.
//!
//! ## Matching strategy:
//! 1. **Exact match**: a SHA-256 hash of the normalized text is kept in a
//!    set. Hashing is used purely as an exact-match key, not for security.
//! 2. **Near match**: the classic sequence-matcher ratio (2*M / T, where
//!    M is the total length of the longest matching blocks and T the
//!    combined length of both normalized strings) against every
//!    previously accepted text. O(n) per call, which is acceptable at
//!    meeting-transcript scale.
//!
//! The accepted-text history grows without bound for the lifetime of the
//! meeting. This is a known limitation of the design, not an accident:
//! capping it would change which pairs get compared.

use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Similarity ratio at or above which a text counts as a near duplicate.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.92;

/// Lowercase, trim, and collapse internal whitespace runs to single
/// spaces. Idempotent: normalizing an already-normalized string is a
/// no-op.
pub fn normalize_text(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Hex-encoded SHA-256 digest of the normalized text. Two strings that
/// differ only in case or whitespace hash identically.
pub fn content_hash(value: &str) -> String {
    let normalized = normalize_text(value);
    let digest = Sha256::digest(normalized.as_bytes());
    digest.iter().map(|byte| format!("{:02x}", byte)).collect()
}

/// Sequence-matcher ratio between the normalized forms of two strings,
/// in [0, 1]. Symmetric. Two empty strings compare as 1.0.
pub fn similarity_ratio(left: &str, right: &str) -> f64 {
    let a: Vec<char> = normalize_text(left).chars().collect();
    let b: Vec<char> = normalize_text(right).chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// Total length of the longest matching blocks between `a` and `b`
/// (Ratcliff/Obershelp): find the longest common substring, then recurse
/// into the pieces to its left and right.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // Longest common substring via one-row dynamic programming. Ties keep
    // the earliest block in `a`, then in `b`, matching the classic
    // sequence-matcher behavior.
    let mut best_len = 0;
    let mut best_a = 0;
    let mut best_b = 0;
    let mut prev = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        let mut row = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                let len = prev[j] + 1;
                row[j + 1] = len;
                if len > best_len {
                    best_len = len;
                    best_a = i + 1 - len;
                    best_b = j + 1 - len;
                }
            }
        }
        prev = row;
    }

    if best_len == 0 {
        return 0;
    }

    best_len
        + matching_chars(&a[..best_a], &b[..best_b])
        + matching_chars(&a[best_a + best_len..], &b[best_b + best_len..])
}

/// Per-meeting duplicate detector. One engine is owned per meeting by the
/// live state manager, which serializes all calls for that meeting, so no
/// internal locking is needed here.
#[derive(Debug)]
pub struct DeduplicationEngine {
    similarity_threshold: f64,
    known_hashes: HashSet<String>,
    known_texts: Vec<String>,
}

impl DeduplicationEngine {
    pub fn new(similarity_threshold: f64) -> Self {
        Self {
            similarity_threshold,
            known_hashes: HashSet::new(),
            known_texts: Vec::new(),
        }
    }

    /// A text is known if its normalized hash was seen before, or if it
    /// is sufficiently similar to *any* previously accepted text.
    pub fn is_duplicate(&self, text: &str) -> bool {
        if self.known_hashes.contains(&content_hash(text)) {
            return true;
        }

        self.known_texts
            .iter()
            .any(|candidate| similarity_ratio(text, candidate) >= self.similarity_threshold)
    }

    /// Record `text` unless it duplicates earlier content. Returns `true`
    /// when the text was accepted. A rejected text leaves the engine
    /// untouched.
    pub fn add_if_unique(&mut self, text: &str) -> bool {
        if self.is_duplicate(text) {
            return false;
        }
        self.known_hashes.insert(content_hash(text));
        self.known_texts.push(text.to_string());
        true
    }

    /// Number of accepted texts so far. Grows for the meeting lifetime.
    pub fn known_count(&self) -> usize {
        self.known_texts.len()
    }
}

impl Default for DeduplicationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [" Decision:  Approve ", "MIXED   Case\ttext", ""];
        for input in inputs {
            let once = normalize_text(input);
            assert_eq!(normalize_text(&once), once);
        }
    }

    #[test]
    fn test_normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize_text("  Risk:   API \t timeout  "), "risk: api timeout");
    }

    #[test]
    fn test_content_hash_ignores_case_and_whitespace() {
        assert_eq!(
            content_hash("Decision:  Approve "),
            content_hash("decision: approve")
        );
        assert_ne!(content_hash("decision: approve"), content_hash("decision: reject"));
    }

    #[test]
    fn test_similarity_of_identical_text_is_one() {
        for text in ["Risk: downtime", "a", "Action: ship v1 by Friday"] {
            assert_eq!(similarity_ratio(text, text), 1.0);
        }
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let left = "Action: ship v1 by Friday";
        let right = "action ship v1 by friday";
        assert_eq!(similarity_ratio(left, right), similarity_ratio(right, left));
    }

    #[test]
    fn test_similarity_detects_near_duplicates() {
        let ratio = similarity_ratio("Action: ship v1 by Friday", "action ship v1 by friday");
        assert!(ratio > 0.9, "expected near-duplicate ratio, got {ratio}");
    }

    #[test]
    fn test_similarity_of_unrelated_text_is_low() {
        let ratio = similarity_ratio("budget approved", "xzq wvk pfm");
        assert!(ratio < 0.5, "expected low ratio, got {ratio}");
    }

    #[test]
    fn test_add_if_unique_rejects_case_variant() {
        let mut engine = DeduplicationEngine::new(0.9);
        assert!(engine.add_if_unique("Risk: downtime in region A"));
        assert!(!engine.add_if_unique("risk: downtime in region a"));
        assert_eq!(engine.known_count(), 1);
    }

    #[test]
    fn test_add_if_unique_rejects_near_duplicate() {
        let mut engine = DeduplicationEngine::default();
        assert!(engine.add_if_unique("prepare the customer email for launch"));
        assert!(!engine.add_if_unique("prepare the customer email for launch!"));
        assert!(engine.add_if_unique("schedule the retrospective meeting"));
        assert_eq!(engine.known_count(), 2);
    }

    #[test]
    fn test_rejected_text_does_not_mutate_state() {
        let mut engine = DeduplicationEngine::new(0.9);
        engine.add_if_unique("Risk: downtime in region A");
        engine.add_if_unique("RISK: downtime in region A");
        assert_eq!(engine.known_count(), 1);
    }
}
