//! # groundcheck-core
//!
//! Deterministic grounding, citation stitching, and reliability scoring.
//!
//! This crate is the evidentiary backbone of an AI fact-checking service.
//! Given raw analysis prose from a generative model plus a list of candidate
//! evidence sources, it answers:
//! - Which sentence is corroborated by which source?
//! - Where do visible citation markers belong in the text actually shown?
//! - How reliable is the analysis, and why?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **Pure and stateless**: One request-scoped transform, no persistence
//! 3. **Degrades, never aborts**: Malformed or partial evidence yields a
//!    best-effort score and citation set, with structured diagnostics
//! 4. **Traceable**: Every score cites per-segment evidence and every
//!    dropped citation leaves a diagnostic record
//!
//! ## Example
//!
//! ```rust,ignore
//! use groundcheck_core::{analyze, build_grounding, stitch, Candidate, VerifiedDomains};
//!
//! let verified = VerifiedDomains::from_json_file("verified_domains.json")?;
//! let candidates = vec![
//!     Candidate::at(0)
//!         .with_title("Atmosphere")
//!         .with_snippet("The atmosphere scatters blue light."),
//! ];
//!
//! let report = analyze("The sky is blue.", &candidates, &[], false, 0.9, &verified);
//! println!("{}: {:.2}", report.verdict_label, report.reliability_score);
//! ```

pub mod authority;
pub mod matcher;
pub mod scorer;
pub mod segmenter;
pub mod stitcher;
pub mod types;

// Re-export main types at crate root
pub use authority::{authority_multiplier, extract_domain, normalize_domain, VerifiedDomains};
pub use matcher::{build_grounding, map_segments_to_sources};
pub use scorer::{
    calculate_reliability, EvaluatedSource, ReliabilityReport, SegmentAudit, UnusedSource,
};
pub use segmenter::{segment_text, utf16_len};
pub use stitcher::{stitch, StitchOutcome};
pub use types::{
    Candidate, Citation, Diagnostic, GroundingPayload, Segment, Source, SupportRecord,
};

use thiserror::Error;

/// Errors that can escape the pipeline.
///
/// Malformed upstream data degrades silently; the only hard failure from
/// inside the algorithms is a precondition violation at a component
/// boundary. The remaining variants cover loading the verified-domain set,
/// which happens once at process start.
#[derive(Error, Debug)]
pub enum GroundingError {
    #[error("Inverted span: start {start} is past end {end}")]
    InvertedSpan { start: usize, end: usize },

    #[error("Failed to read verified domains file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse verified domains file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Segment, match, and score in one pass.
///
/// Convenience entry point for the common flow: raw prose and candidates in,
/// reliability report out. Stitching runs independently via [`stitch`]
/// because it targets a different copy of the prose.
pub fn analyze(
    analysis_text: &str,
    candidates: &[Candidate],
    citations: &[Citation],
    is_multimodal_verified: bool,
    ai_confidence: f64,
    verified: &VerifiedDomains,
) -> ReliabilityReport {
    let payload = build_grounding(analysis_text, candidates);
    calculate_reliability(
        &payload.grounding_supports,
        &payload.grounding_chunks,
        citations,
        is_multimodal_verified,
        ai_confidence,
        verified,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sky_and_mars_candidates() -> Vec<Candidate> {
        vec![
            Candidate::at(0)
                .with_title("Atmosphere")
                .with_uri("https://example.org/sky")
                .with_snippet("The atmosphere scatters blue light making the sky appear blue."),
            Candidate::at(1)
                .with_title("Mars")
                .with_uri("https://example.org/mars")
                .with_snippet("Iron oxide dust makes Mars look red."),
        ]
    }

    #[test]
    fn test_two_segments_match_distinct_candidates() {
        let payload = build_grounding("The sky is blue. Mars is red.", &sky_and_mars_candidates());

        assert_eq!(payload.grounding_supports.len(), 2);
        assert_eq!(
            payload.grounding_supports[0].grounding_chunk_indices,
            vec![0]
        );
        assert_eq!(
            payload.grounding_supports[1].grounding_chunk_indices,
            vec![1]
        );
    }

    #[test]
    fn test_end_to_end_analysis_scores_and_audits() {
        let report = analyze(
            "The sky is blue. Mars is red.",
            &sky_and_mars_candidates(),
            &[],
            false,
            0.8,
            &VerifiedDomains::empty(),
        );

        assert_eq!(report.segments.len(), 2);
        // Both best sources sit on example.org: 0.9 confidence x 0.9
        // authority, plus the two-domain bonus is NOT earned (one domain).
        assert!((report.base_grounding - 0.81).abs() < 1e-9);
        assert_eq!(report.consistency_bonus, 0.0);
        assert!(report.reliability_score <= 1.0);
        assert_eq!(report.ai_confidence, 0.8);
    }

    #[test]
    fn test_end_to_end_stitch_then_score() {
        let candidates = sky_and_mars_candidates();
        let target = "The sky is blue. Mars is red.";
        let payload = build_grounding(target, &candidates);

        let outcome = stitch(target, &payload.grounding_supports, Some(target), &candidates)
            .unwrap();
        assert_eq!(outcome.sources.len(), 2);
        assert!(outcome.text.contains("[1]"));
        assert!(outcome.text.contains("[2]"));

        let report = calculate_reliability(
            &payload.grounding_supports,
            &payload.grounding_chunks,
            &[],
            false,
            0.0,
            &VerifiedDomains::empty(),
        );
        assert!(report.reliability_score > 0.0);
    }

    #[test]
    fn test_empty_evidence_terminal_state() {
        let report = analyze(
            "An uncorroborated claim.",
            &[],
            &[],
            false,
            0.0,
            &VerifiedDomains::empty(),
        );
        assert_eq!(report.reliability_score, 0.0);
        assert_eq!(report.verdict_label, "Unverified / No Data");
        assert!(report.segments.is_empty());
    }

    #[test]
    fn test_verified_domains_load_from_json() {
        let dir = std::env::temp_dir();
        let path = dir.join("groundcheck_verified_domains_test.json");
        std::fs::write(&path, r#"["www.Snopes.com", "factcheck.org"]"#).unwrap();

        let verified = VerifiedDomains::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(verified.len(), 2);
        assert!(verified.contains("snopes.com"));
        assert_eq!(authority_multiplier("snopes.com", &verified), 1.0);
    }

    #[test]
    fn test_verified_domains_bad_json_is_error() {
        let dir = std::env::temp_dir();
        let path = dir.join("groundcheck_verified_domains_bad.json");
        std::fs::write(&path, "not json").unwrap();

        let result = VerifiedDomains::from_json_file(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(GroundingError::Json(_))));
    }
}
