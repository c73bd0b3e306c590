//! Keyword-overlap matching of segments against candidate sources.
//!
//! A candidate corroborates a segment when their vocabularies overlap enough
//! to count as evidence. Thresholds are asymmetric: thin metadata (a bare
//! title) matches on a single shared token, substantial bodies require real
//! overlap.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, error};

use crate::segmenter::segment_text;
use crate::types::{Candidate, Diagnostic, GroundingPayload, Segment, SupportRecord};

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"\W+").unwrap();
}

/// A candidate with fewer tokens than this is a "short source" and matches
/// on a single shared token.
const SHORT_SOURCE_TOKENS: usize = 5;

/// Long candidates match on at least this many shared tokens...
const MIN_SHARED_TOKENS: usize = 2;

/// ...or when the shared fraction of the segment's own tokens exceeds this.
const MIN_SHARED_RATIO: f64 = 0.3;

/// Confidence attached to every locally computed match. Provider metadata
/// carries real figures; local matching has none, so a fixed value marks
/// these records as heuristic.
const MATCH_CONFIDENCE: f64 = 0.9;

/// Tokenize for overlap checks: lowercase, split on non-word boundaries,
/// drop tokens of two characters or fewer.
fn tokenize(text: &str) -> HashSet<String> {
    NON_WORD
        .split(&text.to_lowercase())
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Map each segment to the candidates whose vocabulary overlaps it.
///
/// Returns one support record per segment with at least one match, the
/// flattened union of all referenced indices (arrival order), and any
/// integrity diagnostics. Segments with zero matches are omitted.
pub fn map_segments_to_sources(
    segments: &[Segment],
    candidates: &[Candidate],
) -> (Vec<SupportRecord>, Vec<usize>, Vec<Diagnostic>) {
    let mut supports = Vec::new();
    let mut referenced_indices = Vec::new();
    let mut diagnostics = Vec::new();

    let candidate_tokens: Vec<HashSet<String>> = candidates
        .iter()
        .map(|c| tokenize(c.matchable_text()))
        .collect();

    for segment in segments {
        let segment_tokens = tokenize(&segment.text);
        if segment_tokens.is_empty() {
            continue;
        }

        let mut mapped: Vec<usize> = Vec::new();
        for (idx, tokens) in candidate_tokens.iter().enumerate() {
            if tokens.is_empty() {
                continue;
            }

            let shared = segment_tokens.intersection(tokens).count();
            let matched = if tokens.len() < SHORT_SOURCE_TOKENS {
                shared >= 1
            } else {
                shared >= MIN_SHARED_TOKENS
                    || (shared as f64 / segment_tokens.len() as f64) > MIN_SHARED_RATIO
            };

            if matched {
                mapped.push(idx);
            }
        }

        if mapped.is_empty() {
            continue;
        }

        // Integrity check: every emitted index must exist in the current
        // catalog. Local enumeration cannot produce a violation, but the
        // guard holds for any future producer of `mapped`.
        let mut valid: Vec<usize> = Vec::with_capacity(mapped.len());
        for idx in mapped {
            if idx < candidates.len() {
                valid.push(idx);
            } else {
                error!(index = idx, candidate_count = candidates.len(), "candidate index out of bounds, excluding");
                diagnostics.push(Diagnostic::IndexOutOfRange {
                    index: idx,
                    candidate_count: candidates.len(),
                });
            }
        }

        if valid.is_empty() {
            continue;
        }

        debug!(segment = %segment.text.trim(), indices = ?valid, "segment mapped to candidates");
        referenced_indices.extend(valid.iter().copied());
        supports.push(SupportRecord {
            segment: segment.clone(),
            confidence_scores: vec![MATCH_CONFIDENCE; valid.len()],
            grounding_chunk_indices: valid,
        });
    }

    (supports, referenced_indices, diagnostics)
}

/// Segment prose and match it against a candidate catalog, producing a
/// complete grounding payload.
pub fn build_grounding(analysis_text: &str, candidates: &[Candidate]) -> GroundingPayload {
    debug!(
        utf16_len = crate::segmenter::utf16_len(analysis_text),
        candidates = candidates.len(),
        "building grounding payload"
    );

    let segments = segment_text(analysis_text);
    let (supports, referenced_indices, diagnostics) =
        map_segments_to_sources(&segments, candidates);

    GroundingPayload {
        grounding_chunks: candidates.to_vec(),
        grounding_supports: supports,
        referenced_indices,
        web_search_queries: Vec::new(),
        diagnostics,
    }
}
