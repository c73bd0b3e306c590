//! Domain authority: normalization, redirect unwrapping, and the tier table.
//!
//! Authority is a property of where evidence lives, independent of how well
//! it matches a claim. The multiplier is a pure mapping of
//! `(domain, verified set) -> weight` — the verified set is loaded once at
//! process start and passed in explicitly, never read from global state.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::GroundingError;

/// Major wire/broadcast outlets scored with the `.org` tier.
const NEWS_OUTLETS: &[&str] = &["bbc.com", "bbc.co.uk", "reuters.com", "apnews.com", "npr.org"];

/// Crowd-sourced encyclopedia hosts.
const ENCYCLOPEDIA_DOMAINS: &[&str] = &["wikipedia.org", "en.wikipedia.org"];

/// Social / user-generated-content platforms, matched by containment.
const SOCIAL_DOMAINS: &[&str] = &[
    "twitter.com",
    "x.com",
    "facebook.com",
    "instagram.com",
    "tiktok.com",
    "reddit.com",
    "youtube.com",
];

/// Document/image suffixes marking user-uploaded evidence.
const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf", ".jpg", ".jpeg", ".png", ".txt", ".docx"];

/// Known search redirectors whose real target hides in the query string.
const REDIRECTOR_HOSTS: &[&str] = &["www.google.com", "google.com"];

/// Bound on redirect unwrapping; adversarial input can nest redirectors.
const MAX_REDIRECT_DEPTH: usize = 4;

/// Immutable set of verified fact-checker hostnames.
///
/// Entries are normalized at construction, so membership checks expect an
/// already-normalized domain (see [`normalize_domain`]).
#[derive(Debug, Clone, Default)]
pub struct VerifiedDomains(HashSet<String>);

impl VerifiedDomains {
    /// An empty set: every domain falls through to the suffix tiers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from a JSON array of hostnames. Intended to run once at process
    /// start, outside the pipeline.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, GroundingError> {
        let raw = fs::read_to_string(path)?;
        let domains: Vec<String> = serde_json::from_str(&raw)?;
        Ok(domains.into_iter().collect())
    }

    /// Membership check against a normalized domain.
    pub fn contains(&self, normalized_domain: &str) -> bool {
        self.0.contains(normalized_domain)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for VerifiedDomains {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self(iter.into_iter().map(|d| normalize_domain(&d)).collect())
    }
}

impl<'a> FromIterator<&'a str> for VerifiedDomains {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        Self(iter.into_iter().map(normalize_domain).collect())
    }
}

/// Normalize a domain for lookup: percent-decode, trim, lowercase, extract
/// the host when handed a full URL, strip a leading `www.`.
pub fn normalize_domain(domain: &str) -> String {
    if domain.is_empty() {
        return String::new();
    }

    let decoded = percent_decode_str(domain).decode_utf8_lossy();
    let mut normalized = decoded.trim().to_lowercase();

    if normalized.starts_with("http://") || normalized.starts_with("https://") {
        if let Some(host) = url_host(&normalized) {
            normalized = host;
        }
    }

    if let Some(stripped) = normalized.strip_prefix("www.") {
        return stripped.to_string();
    }
    normalized
}

/// Host of a URL, if it parses and has one.
pub fn url_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Extract the effective domain of a URL.
///
/// A known search-redirector URL (`/url?q=` / `?url=`) re-normalizes its
/// embedded target instead of reporting the redirector's own host. Returns
/// `"unknown"` when no host can be determined.
pub fn extract_domain(url: &str) -> String {
    extract_domain_bounded(url, 0)
}

fn extract_domain_bounded(url: &str, depth: usize) -> String {
    if url.is_empty() {
        return "unknown".to_string();
    }

    let Ok(parsed) = Url::parse(url) else {
        return "unknown".to_string();
    };
    let Some(host) = parsed.host_str() else {
        return "unknown".to_string();
    };

    if depth < MAX_REDIRECT_DEPTH
        && REDIRECTOR_HOSTS.contains(&host)
        && parsed.path().contains("/url")
    {
        let target = parsed
            .query_pairs()
            .find(|(k, _)| k == "q")
            .or_else(|| parsed.query_pairs().find(|(k, _)| k == "url"))
            .map(|(_, v)| v.into_owned());
        if let Some(target) = target {
            return extract_domain_bounded(&target, depth + 1);
        }
    }

    host.to_string()
}

/// Domain-tier authority multiplier, first match wins.
pub fn authority_multiplier(domain: &str, verified: &VerifiedDomains) -> f64 {
    let domain = normalize_domain(domain);

    if verified.contains(&domain) {
        return 1.0;
    }
    if domain.ends_with(".gov") || domain.ends_with(".edu") || domain.ends_with(".int") {
        return 1.0;
    }
    if domain.ends_with(".org") || NEWS_OUTLETS.contains(&domain.as_str()) {
        return 0.9;
    }
    if ENCYCLOPEDIA_DOMAINS.contains(&domain.as_str()) {
        return 0.8;
    }
    if SOCIAL_DOMAINS.iter().any(|sd| domain.contains(sd)) {
        return 0.4;
    }
    // A document/image suffix marks uploaded evidence used as ground truth.
    if DOCUMENT_EXTENSIONS.iter().any(|ext| domain.ends_with(ext)) {
        return 1.0;
    }

    0.7
}
