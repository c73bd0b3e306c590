//! Citation stitching: re-anchor cited spans in the text actually shown.
//!
//! Support offsets are computed against one copy of the prose; the copy
//! rendered to the user can differ character-for-character after an
//! intermediate re-serialization. The stitcher relocates every cited span
//! inside the target text, splices visible markers, and builds the ordered,
//! deduplicated source list.
//!
//! Unresolvable citations are dropped, never fatal: the user sees fewer
//! markers, not an error.

use std::collections::HashMap;

use tracing::warn;

use crate::authority::url_host;
use crate::segmenter::slice_utf16;
use crate::types::{Candidate, Diagnostic, Source, SupportRecord};
use crate::GroundingError;

/// Result of stitching: annotated text, minted sources, and the degraded
/// conditions observed along the way.
#[derive(Debug, Clone)]
pub struct StitchOutcome {
    pub text: String,
    pub sources: Vec<Source>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A cited span relocated into the target text, byte offsets.
struct ResolvedSpan {
    start: usize,
    end: usize,
    text: String,
    chunk_indices: Vec<usize>,
}

/// Relocate every cited span into `target_text`, splice bracketed markers,
/// and build the deduplicated source list.
///
/// `raw_text` is the prose the support offsets were computed against; it is
/// only consulted when a record carries offsets but no text of its own. An
/// inverted span in a record is a precondition violation and the single
/// hard failure of this component.
pub fn stitch(
    target_text: &str,
    supports: &[SupportRecord],
    raw_text: Option<&str>,
    chunks: &[Candidate],
) -> Result<StitchOutcome, GroundingError> {
    let mut diagnostics = Vec::new();
    let mut resolved = Vec::new();

    for support in supports {
        let segment = &support.segment;
        if segment.is_inverted() {
            return Err(GroundingError::InvertedSpan {
                start: segment.start_index,
                end: segment.end_index,
            });
        }

        // Resolve the literal cited substring: the record's own text, else a
        // slice of the raw source text at the record's offsets.
        let literal = if !segment.text.is_empty() {
            segment.text.clone()
        } else if let Some(raw) = raw_text {
            slice_utf16(raw, segment.start_index, segment.end_index).to_string()
        } else {
            String::new()
        };

        let clean = literal.trim();
        if clean.is_empty() {
            warn!("could not resolve segment text, skipping citation");
            diagnostics.push(Diagnostic::EmptySegment);
            continue;
        }

        let start = match target_text.find(clean) {
            Some(pos) => Some(pos),
            None => match locate_by_anchor(target_text, clean) {
                Some((pos, anchor)) => {
                    diagnostics.push(Diagnostic::FallbackAnchor {
                        anchor,
                        excerpt: excerpt(clean),
                    });
                    Some(pos)
                }
                None => None,
            },
        };

        let Some(start) = start else {
            warn!(excerpt = %excerpt(clean), "cited span not found in target, dropping citation");
            diagnostics.push(Diagnostic::UnresolvedCitation {
                excerpt: excerpt(clean),
            });
            continue;
        };

        // An anchor hit keeps the full segment length, clamped to the text
        // and snapped back to a character boundary.
        let mut end = (start + clean.len()).min(target_text.len());
        while !target_text.is_char_boundary(end) {
            end -= 1;
        }

        resolved.push(ResolvedSpan {
            start,
            end,
            text: clean.to_string(),
            chunk_indices: support.grounding_chunk_indices.clone(),
        });
    }

    // Splice from the rightmost end offset toward the start: every insertion
    // shifts offsets of spans with smaller ends, so the largest end must go
    // first to keep the remaining prefix valid.
    resolved.sort_by(|a, b| b.end.cmp(&a.end));

    let mut modified = target_text.to_string();
    let mut sources: Vec<Source> = Vec::new();
    let mut assigned_ids: HashMap<usize, usize> = HashMap::new();
    let mut next_id = 1usize;

    for span in &resolved {
        let mut tags = String::new();
        for &chunk_idx in &span.chunk_indices {
            let id = match assigned_ids.get(&chunk_idx) {
                Some(&id) => id,
                None => {
                    let id = next_id;
                    next_id += 1;
                    assigned_ids.insert(chunk_idx, id);
                    sources.push(build_source(id, chunk_idx, span, target_text, chunks));
                    id
                }
            };
            tags.push_str(&format!("[{}]", id));
        }

        if !tags.is_empty() {
            modified.insert_str(span.end, &format!(" {}", tags));
        }
    }

    Ok(StitchOutcome {
        text: modified,
        sources,
        diagnostics,
    })
}

/// Fallback anchor: the first three words longer than four characters (all
/// words when none qualify), joined by single spaces. Takes the first
/// textual occurrence.
fn locate_by_anchor(target_text: &str, clean: &str) -> Option<(usize, String)> {
    let long_words: Vec<&str> = clean
        .split_whitespace()
        .filter(|w| w.chars().count() > 4)
        .collect();
    let words = if long_words.is_empty() {
        clean.split_whitespace().collect::<Vec<_>>()
    } else {
        long_words
    };
    if words.is_empty() {
        return None;
    }

    let anchor = words[..words.len().min(3)].join(" ");
    target_text.find(&anchor).map(|pos| (pos, anchor))
}

/// Mint a source for a chunk index, pulling metadata from the catalog and
/// degrading to placeholders: a citation must never vanish just because its
/// metadata is incomplete.
fn build_source(
    id: usize,
    chunk_idx: usize,
    span: &ResolvedSpan,
    target_text: &str,
    chunks: &[Candidate],
) -> Source {
    let mut cited_segment = target_text[span.start..span.end].to_string();
    if cited_segment.chars().count() < 5 {
        cited_segment = span.text.clone();
    }

    let Some(chunk) = chunks.get(chunk_idx) else {
        return Source {
            id,
            title: "Reference".to_string(),
            url: String::new(),
            cited_segment,
            source_context: "Offline reference".to_string(),
            favicon_url: None,
        };
    };

    let url = chunk.uri.clone().unwrap_or_default();
    let title = chunk
        .title
        .clone()
        .unwrap_or_else(|| "Unknown Source".to_string());
    let domain = if url.is_empty() {
        "unknown".to_string()
    } else {
        url_host(&url).unwrap_or_else(|| "unknown".to_string())
    };

    let mut source_context = format!("{} ({})", title, domain);
    if let Some(ctx) = chunk.retrieved_context.as_deref() {
        if !ctx.is_empty() {
            source_context = ctx.to_string();
        }
    }

    let favicon_url = if url.is_empty() {
        None
    } else {
        Some(format!(
            "https://www.google.com/s2/favicons?domain={}&sz=64",
            domain
        ))
    };

    Source {
        id,
        title,
        url,
        cited_segment,
        source_context,
        favicon_url,
    }
}

/// Short prefix of a span for diagnostics and log lines.
fn excerpt(text: &str) -> String {
    const MAX: usize = 30;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX).collect();
        format!("{}...", cut)
    }
}
