//! Strongest-link reliability scoring.
//!
//! A claim is as strong as its single best piece of corroboration: each
//! segment contributes the maximum combined score among its evidence
//! candidates, not the average, so weak co-citations never dilute a solid
//! source. The aggregate is the mean of those maxima plus two small, capped
//! bonuses for domain diversity and multimodal corroboration.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::authority::{authority_multiplier, extract_domain, normalize_domain, VerifiedDomains};
use crate::types::{Candidate, Citation, Diagnostic, SupportRecord};

/// Additive bonus for corroboration spanning more than one distinct domain.
const CONSISTENCY_BONUS: f64 = 0.05;

/// Additive bonus when multimodal evidence corroborated the claim.
const MULTIMODAL_BONUS: f64 = 0.05;

/// One evidence candidate as evaluated for a segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluatedSource {
    /// 1-based display id (candidate index + 1).
    pub id: usize,
    pub chunk_index: usize,

    /// Position of the matching document in the citation list, when found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_index: Option<usize>,

    pub domain: String,

    /// Combined score: confidence x authority.
    pub score: f64,

    /// Snippet of the matching citation, else the candidate title.
    pub quote_text: String,

    pub confidence: f64,
    pub authority: f64,
    pub is_verified: bool,
}

/// Per-segment audit entry: what was evaluated and which source won.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentAudit {
    pub text: String,
    pub top_source_domain: String,
    pub top_source_score: f64,

    /// Evaluated candidates, sorted by combined score descending.
    pub sources: Vec<EvaluatedSource>,
}

/// A catalog entry never selected as any segment's evidence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnusedSource {
    pub domain: String,
    pub title: String,
}

/// The reliability payload: final score, breakdown, verdict, and the full
/// per-segment audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityReport {
    pub reliability_score: f64,

    /// The model's self-reported confidence, echoed opaquely.
    pub ai_confidence: f64,

    pub base_grounding: f64,
    pub consistency_bonus: f64,
    pub multimodal_bonus: f64,
    pub verdict_label: String,
    pub explanation: String,
    pub segments: Vec<SegmentAudit>,
    pub unused_sources: Vec<UnusedSource>,

    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,

    pub evaluated_at: DateTime<Utc>,
}

/// Score the supports against the candidate catalog.
///
/// Zero supports is a defined terminal state distinct from "evidence that
/// scored zero": downstream rendering must tell "no evidence" apart from
/// "evidence, all weak". Partial or malformed evidence degrades to defaults
/// and the computation continues.
pub fn calculate_reliability(
    supports: &[SupportRecord],
    chunks: &[Candidate],
    citations: &[Citation],
    is_multimodal_verified: bool,
    ai_confidence: f64,
    verified: &VerifiedDomains,
) -> ReliabilityReport {
    if supports.is_empty() {
        return ReliabilityReport {
            reliability_score: 0.0,
            ai_confidence,
            base_grounding: 0.0,
            consistency_bonus: 0.0,
            multimodal_bonus: 0.0,
            verdict_label: "Unverified / No Data".to_string(),
            explanation: "No reliable search results were found to verify this claim."
                .to_string(),
            segments: Vec::new(),
            unused_sources: Vec::new(),
            diagnostics: Vec::new(),
            evaluated_at: Utc::now(),
        };
    }

    // Snippet lookup: uri -> (position in the citation list, snippet).
    let mut citation_lookup: HashMap<&str, (usize, &str)> = HashMap::new();
    for (idx, citation) in citations.iter().enumerate() {
        if !citation.url.is_empty() {
            citation_lookup.insert(citation.url.as_str(), (idx, citation.snippet.as_str()));
        }
    }

    let mut segment_audits = Vec::new();
    let mut diagnostics = Vec::new();
    let mut used_domains: HashSet<String> = HashSet::new();
    let mut used_chunk_indices: HashSet<usize> = HashSet::new();

    for support in supports {
        let mut evaluated: Vec<EvaluatedSource> = Vec::new();
        let mut best_score = 0.0f64;
        let mut best_domain = "unknown".to_string();

        for (position, &chunk_idx) in support.grounding_chunk_indices.iter().enumerate() {
            let Some(chunk) = chunks.get(chunk_idx) else {
                error!(
                    index = chunk_idx,
                    candidate_count = chunks.len(),
                    "referenced candidate out of bounds, excluding"
                );
                diagnostics.push(Diagnostic::IndexOutOfRange {
                    index: chunk_idx,
                    candidate_count: chunks.len(),
                });
                continue;
            };

            let uri = chunk.uri.as_deref().unwrap_or("");
            let domain = resolve_domain(chunk);

            let authority = authority_multiplier(&domain, verified);
            // Missing confidence resolves to 1.0 for file-scheme uris:
            // user-supplied evidence is trusted as context. Anything else
            // defaults to 0.0.
            let confidence = support
                .confidence_scores
                .get(position)
                .copied()
                .unwrap_or_else(|| if uri.starts_with("file://") { 1.0 } else { 0.0 });
            let score = confidence * authority;

            used_chunk_indices.insert(chunk_idx);
            if domain != "unknown" && !domain.is_empty() {
                used_domains.insert(domain.clone());
            }

            let (source_index, quote_text) = match citation_lookup.get(uri) {
                Some(&(idx, snippet)) => (Some(idx), snippet.to_string()),
                None => (
                    None,
                    chunk
                        .title
                        .clone()
                        .unwrap_or_else(|| "No snippet available.".to_string()),
                ),
            };

            debug!(
                chunk = chunk_idx,
                domain = %domain,
                confidence,
                authority,
                score,
                "evaluated evidence candidate"
            );

            if score > best_score {
                best_score = score;
                best_domain = domain.clone();
            }

            let is_verified = verified.contains(&normalize_domain(&domain));
            evaluated.push(EvaluatedSource {
                id: chunk_idx + 1,
                chunk_index: chunk_idx,
                source_index,
                domain,
                score,
                quote_text,
                confidence,
                authority,
                is_verified,
            });
        }

        evaluated.sort_by(|a, b| b.score.total_cmp(&a.score));

        let text = if support.segment.text.is_empty() {
            "Unknown segment text".to_string()
        } else {
            support.segment.text.clone()
        };
        segment_audits.push(SegmentAudit {
            text,
            top_source_domain: best_domain,
            top_source_score: best_score,
            sources: evaluated,
        });
    }

    let base_grounding = if segment_audits.is_empty() {
        0.0
    } else {
        segment_audits
            .iter()
            .map(|a| a.top_source_score)
            .sum::<f64>()
            / segment_audits.len() as f64
    };

    let unused_sources = collect_unused(chunks, &used_chunk_indices, &used_domains);

    let consistency_bonus = if used_domains.len() > 1 {
        CONSISTENCY_BONUS
    } else {
        0.0
    };
    let multimodal_bonus = if is_multimodal_verified {
        MULTIMODAL_BONUS
    } else {
        0.0
    };
    let reliability_score = (base_grounding + consistency_bonus + multimodal_bonus).min(1.0);

    let verdict_label = verdict_for(reliability_score).to_string();

    let mut explanation = format!(
        "Base grounding evaluated at {:.2} across {} segments. ",
        base_grounding,
        segment_audits.len()
    );
    if consistency_bonus > 0.0 {
        explanation.push_str(&format!(
            "Consistency bonus (+{:.2}) applied for {} unique domains. ",
            CONSISTENCY_BONUS,
            used_domains.len()
        ));
    }
    if multimodal_bonus > 0.0 {
        explanation.push_str("Multimodal cross-check bonus (+0.05) applied.");
    }

    debug!(
        base = base_grounding,
        consistency = consistency_bonus,
        multimodal = multimodal_bonus,
        final_score = reliability_score,
        verdict = %verdict_label,
        "reliability computed"
    );

    ReliabilityReport {
        reliability_score,
        ai_confidence,
        base_grounding,
        consistency_bonus,
        multimodal_bonus,
        verdict_label,
        explanation,
        segments: segment_audits,
        unused_sources,
        diagnostics,
        evaluated_at: Utc::now(),
    }
}

/// Domain of a candidate: precomputed field, else the (redirect-unwrapped)
/// host of its uri, else its title, else "unknown".
fn resolve_domain(chunk: &Candidate) -> String {
    if let Some(domain) = chunk.domain.as_deref() {
        if !domain.is_empty() {
            return domain.to_string();
        }
    }
    if let Some(uri) = chunk.uri.as_deref() {
        if !uri.is_empty() {
            let derived = extract_domain(uri);
            if derived != "unknown" {
                return derived;
            }
        }
    }
    if let Some(title) = chunk.title.as_deref() {
        if !title.is_empty() {
            return title.to_string();
        }
    }
    "unknown".to_string()
}

/// Chunks never referenced by any support, deduplicated by domain and
/// excluding domains that did corroborate something.
fn collect_unused(
    chunks: &[Candidate],
    used_chunk_indices: &HashSet<usize>,
    used_domains: &HashSet<String>,
) -> Vec<UnusedSource> {
    let mut unused = Vec::new();
    let mut seen_domains: HashSet<String> = HashSet::new();

    for (idx, chunk) in chunks.iter().enumerate() {
        if used_chunk_indices.contains(&idx) {
            continue;
        }

        let domain = resolve_domain(chunk);
        if domain == "unknown" || used_domains.contains(&domain) {
            continue;
        }
        if !seen_domains.insert(domain.clone()) {
            continue;
        }

        unused.push(UnusedSource {
            domain,
            title: chunk
                .title
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        });
    }

    unused
}

/// Verdict thresholds on the final score.
fn verdict_for(score: f64) -> &'static str {
    if score > 0.85 {
        "High (Verified Institutional)"
    } else if score > 0.70 {
        "Medium-High (Verified News)"
    } else if score > 0.50 {
        "Medium (Mixed/Uncertain)"
    } else {
        "Low (Unverified)"
    }
}
