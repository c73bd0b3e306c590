//! Shared data model for the grounding pipeline.
//!
//! Provider grounding metadata and locally computed supports both flow
//! through the same types: incompatible upstream shapes are normalized into
//! `Candidate` at the ingestion boundary so downstream logic only ever sees
//! one representation.

use serde::{Deserialize, Serialize};

use crate::GroundingError;

/// A contiguous prose span treated as one fact-checkable unit.
///
/// Offsets are **UTF-16 code units** (end exclusive), not code points: the
/// downstream rendering surface indexes text in 16-bit units, so a character
/// outside the Basic Multilingual Plane counts as two.
///
/// Serialized in camelCase to interoperate with provider metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// The span text. May be empty when the producer only supplied offsets.
    #[serde(default)]
    pub text: String,

    /// Start offset in UTF-16 code units.
    pub start_index: usize,

    /// End offset in UTF-16 code units, exclusive.
    pub end_index: usize,
}

impl Segment {
    /// Create a segment, rejecting an inverted span.
    ///
    /// Inverted spans are the one precondition violation this crate treats
    /// as a hard failure; everything else degrades.
    pub fn new(
        text: impl Into<String>,
        start_index: usize,
        end_index: usize,
    ) -> Result<Self, GroundingError> {
        if start_index > end_index {
            return Err(GroundingError::InvertedSpan {
                start: start_index,
                end: end_index,
            });
        }
        Ok(Self {
            text: text.into(),
            start_index,
            end_index,
        })
    }

    /// Whether the span is inverted (start past end).
    ///
    /// Deserialized segments bypass [`Segment::new`], so components
    /// re-check this at their own boundary.
    pub fn is_inverted(&self) -> bool {
        self.start_index > self.end_index
    }
}

/// One evidence item (search result or uploaded file), referenced by a
/// stable 0-based index within a single request.
///
/// This is the single normalized record both provider chunk shapes collapse
/// into; all fields except the index are optional and resolve to
/// conservative defaults downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    /// 0-based position in the request's candidate catalog.
    pub index: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// Body text used for matching; falls back to the title when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,

    /// Precomputed domain; derived from the uri when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Richer provider-supplied context; overrides the synthesized context
    /// string on a cited [`Source`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_context: Option<String>,
}

impl Candidate {
    /// Create an empty candidate at a catalog position.
    pub fn at(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_retrieved_context(mut self, context: impl Into<String>) -> Self {
        self.retrieved_context = Some(context.into());
        self
    }

    /// Text used for token matching: snippet when present, else title.
    pub fn matchable_text(&self) -> &str {
        match self.snippet.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => self.title.as_deref().unwrap_or(""),
        }
    }
}

/// Association between one segment and its corroborating candidate indices.
///
/// Indices may originate from a decoupled producer and are re-validated
/// against the current candidate list before every use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupportRecord {
    pub segment: Segment,

    /// Distinct matching candidate indices, arrival order.
    pub grounding_chunk_indices: Vec<usize>,

    /// Per-candidate confidence, positionally aligned with the indices.
    /// Missing entries resolve to a defined default in the scorer.
    #[serde(default)]
    pub confidence_scores: Vec<f64>,
}

/// Output of the matching stage: the candidate echo list, one support per
/// matched segment, and the flattened union of referenced indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingPayload {
    pub grounding_chunks: Vec<Candidate>,
    pub grounding_supports: Vec<SupportRecord>,

    /// Every index referenced by any support, arrival order, duplicates kept.
    pub referenced_indices: Vec<usize>,

    #[serde(default)]
    pub web_search_queries: Vec<String>,

    /// Degraded-but-non-fatal conditions observed while matching.
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

/// A deduplicated, output-facing bibliography entry. Minted lazily: only
/// candidates actually cited become sources, ids assigned in first-citation
/// order starting at 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub id: usize,
    pub title: String,
    pub url: String,

    /// The span of target text this source was cited for.
    pub cited_segment: String,

    /// Human-readable provenance, `"{title} ({domain})"` unless the
    /// candidate carried richer retrieved context.
    pub source_context: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon_url: Option<String>,
}

/// A research document consumed by the scorer for snippet lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub snippet: String,
}

/// Structured record of a degraded-but-non-fatal condition.
///
/// Returned alongside component results so callers and tests can assert on
/// silent degradation directly instead of scraping logs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A referenced candidate index fell outside the current catalog and
    /// was excluded.
    IndexOutOfRange {
        index: usize,
        candidate_count: usize,
    },

    /// A cited span could not be located in the target text, even with the
    /// fallback anchor; the citation was dropped.
    UnresolvedCitation { excerpt: String },

    /// A cited span was located only via its fallback anchor. The first
    /// textual occurrence was taken, which can mis-cite repeated phrasing.
    FallbackAnchor { anchor: String, excerpt: String },

    /// A support record resolved to a wholly blank span and was skipped.
    EmptySegment,
}
