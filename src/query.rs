//! A single search term submitted to the pipeline, and its derived identity.

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

/// One query term, e.g. `BRCA1[gene] OR TP53[gene]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub content: String,
}

impl Query {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into() }
    }

    /// Stable identity for caching: `<first-term>-<6 hex chars of a content hash>`.
    ///
    /// `first-term` is extracted by `extract_first_term`; the content hash is
    /// taken over the full query content so that distinct batched queries
    /// sharing a leading term still land on distinct cache entries.
    #[must_use]
    pub fn query_id(&self) -> String {
        let prefix = extract_first_term(&self.content);
        let digest = Sha256::digest(self.content.as_bytes());
        let short_hash = hex_prefix(&digest, 6);
        format!("{prefix}-{short_hash}")
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

fn hex_prefix(bytes: &[u8], chars: usize) -> String {
    let mut s = String::with_capacity(chars);
    for b in bytes {
        if s.len() >= chars {
            break;
        }
        s.push_str(&format!("{b:02x}"));
    }
    s.truncate(chars);
    s
}

struct TermPatterns {
    gene: Regex,
    protein: Regex,
    title: Regex,
    quoted: Regex,
    word: Regex,
}

fn patterns() -> &'static TermPatterns {
    static PATTERNS: OnceLock<TermPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| TermPatterns {
        gene: Regex::new(r"(\w+)\[gene\]").unwrap(),
        protein: Regex::new(r"(\w+)\[protein\]").unwrap(),
        title: Regex::new(r"(\w+)\[title\]").unwrap(),
        quoted: Regex::new("\"([^\"]+)\"").unwrap(),
        word: Regex::new(r"(\w+)").unwrap(),
    })
}

/// Extracts a short, human-legible prefix from a query's content for use in
/// its cache key. Tries, in order, a `[gene]`/`[protein]`/`[title]`-tagged
/// term, a quoted phrase, then a bare word; falls back to the first ten
/// characters of the trimmed content (or the whole content if shorter).
#[must_use]
pub fn extract_first_term(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return "EMPTY".to_string();
    }

    let p = patterns();
    for re in [&p.gene, &p.protein, &p.title, &p.quoted, &p.word] {
        if let Some(caps) = re.captures(trimmed) {
            if let Some(m) = caps.get(1) {
                return m.as_str().to_string();
            }
        }
    }

    if trimmed.len() <= 10 {
        trimmed.to_string()
    } else {
        trimmed[..10].to_string()
    }
}
