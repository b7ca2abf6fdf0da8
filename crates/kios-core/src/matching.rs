//! # Product Matcher
//!
//! Links free-text labels from uploaded marketplace exports to catalog
//! products. Marketplace variant names are inconsistent ("Kaos Polos -
//! HITAM, XL" vs catalog "Kaos Polos Hitam"), so exact lookup alone would
//! reject most rows.
//!
//! ## Heuristic Cascade
//! ```text
//!  label ──► 1. exact match (normalized)
//!        ──► 2. substring containment, either direction
//!        ──► 3. token overlap (≥ 40% of either side's tokens pair up)
//!        ──► 4. stopword-stripped exact/substring retry
//!        ──► no match: row becomes an UndetectedProduct, batch continues
//! ```
//!
//! Strategies are tried in precedence order; within a strategy the catalog
//! is scanned in stored order and the first hit wins. Each heuristic is an
//! independent `(label, candidate) -> bool` predicate rather than a score
//! contribution, which keeps every rule testable on its own.
//!
//! Deterministic fuzzy linkage trades some false positives for usable
//! automation; every unmatched row is preserved for manual catalog fixes.

use crate::types::Product;

/// Minimum fraction of position-aligned matching characters for two tokens
/// of length ≥ 3 to be considered equal.
const TOKEN_AGREEMENT_MIN: f64 = 0.7;

/// Fraction of one side's tokens that must find an equal token on the other
/// side (ceiling-rounded) for the token-overlap heuristic to fire.
const TOKEN_OVERLAP_RATIO: f64 = 0.4;

/// Generic filler words stripped before the last-resort retry.
const STOPWORDS: &[&str] = &["product", "item", "the", "produk", "barang"];

/// Normalizes a name for comparison: trim, collapse internal whitespace,
/// case-fold.
pub fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// =============================================================================
// Heuristics
// =============================================================================

/// One matching strategy. Inputs are already normalized.
pub trait MatchHeuristic {
    /// Strategy name, for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// Whether `label` (from the upload) links to `candidate` (catalog name).
    fn matches(&self, label: &str, candidate: &str) -> bool;
}

/// 1. Exact match after normalization.
pub struct ExactMatch;

impl MatchHeuristic for ExactMatch {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn matches(&self, label: &str, candidate: &str) -> bool {
        label == candidate
    }
}

/// 2. Substring containment in either direction.
pub struct SubstringMatch;

impl MatchHeuristic for SubstringMatch {
    fn name(&self) -> &'static str {
        "substring"
    }

    fn matches(&self, label: &str, candidate: &str) -> bool {
        label.contains(candidate) || candidate.contains(label)
    }
}

/// 3. Token-overlap match.
///
/// Both strings are split into whitespace tokens (single characters are
/// dropped). A token pair counts as equal when the tokens are identical, one
/// contains the other, or — for tokens of length ≥ 3 — at least 70% of
/// position-aligned characters agree, measured against the longer token.
/// The heuristic fires when at least 40% (ceiling) of the label's tokens
/// find an equal product token, or vice versa.
pub struct TokenOverlap;

impl TokenOverlap {
    fn tokens(s: &str) -> Vec<&str> {
        s.split_whitespace()
            .filter(|t| t.chars().count() > 1)
            .collect()
    }

    fn tokens_equal(a: &str, b: &str) -> bool {
        if a == b || a.contains(b) || b.contains(a) {
            return true;
        }

        let a_len = a.chars().count();
        let b_len = b.chars().count();
        if a_len < 3 || b_len < 3 {
            return false;
        }

        let aligned = a.chars().zip(b.chars()).filter(|(x, y)| x == y).count();
        let longer = a_len.max(b_len);
        aligned as f64 / longer as f64 >= TOKEN_AGREEMENT_MIN
    }

    fn overlap_met(from: &[&str], to: &[&str]) -> bool {
        if from.is_empty() {
            return false;
        }
        let needed = ((from.len() as f64) * TOKEN_OVERLAP_RATIO).ceil() as usize;
        let hits = from
            .iter()
            .filter(|t| to.iter().any(|u| Self::tokens_equal(t, u)))
            .count();
        hits >= needed
    }
}

impl MatchHeuristic for TokenOverlap {
    fn name(&self) -> &'static str {
        "token_overlap"
    }

    fn matches(&self, label: &str, candidate: &str) -> bool {
        let label_tokens = Self::tokens(label);
        let candidate_tokens = Self::tokens(candidate);

        // Checked symmetrically: a short label against a long catalog name
        // and the reverse are both legitimate.
        Self::overlap_met(&label_tokens, &candidate_tokens)
            || Self::overlap_met(&candidate_tokens, &label_tokens)
    }
}

/// 4. Stopword-stripped retry of exact/substring comparison.
pub struct StopwordStripped;

impl StopwordStripped {
    fn strip(s: &str) -> String {
        s.split_whitespace()
            .filter(|t| !STOPWORDS.contains(t))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl MatchHeuristic for StopwordStripped {
    fn name(&self) -> &'static str {
        "stopword_stripped"
    }

    fn matches(&self, label: &str, candidate: &str) -> bool {
        let label = Self::strip(label);
        let candidate = Self::strip(candidate);
        if label.is_empty() || candidate.is_empty() {
            return false;
        }
        label == candidate || label.contains(&candidate) || candidate.contains(&label)
    }
}

// =============================================================================
// Matcher
// =============================================================================

/// The cascading product matcher.
///
/// ## Usage
/// ```rust,ignore
/// let matcher = ProductMatcher::new();
/// if let Some(product) = matcher.find_match("kaos polos HITAM", &catalog) {
///     // matched rows carry the canonical catalog id/name forward
/// }
/// ```
pub struct ProductMatcher {
    heuristics: Vec<Box<dyn MatchHeuristic + Send + Sync>>,
}

impl ProductMatcher {
    /// Creates the matcher with the standard heuristic cascade.
    pub fn new() -> Self {
        ProductMatcher {
            heuristics: vec![
                Box::new(ExactMatch),
                Box::new(SubstringMatch),
                Box::new(TokenOverlap),
                Box::new(StopwordStripped),
            ],
        }
    }

    /// Returns at most one catalog product for `label`.
    ///
    /// Strategies run in precedence order; within a strategy the catalog is
    /// scanned in stored order and the first hit wins. `None` is a normal
    /// outcome (the caller records an UndetectedProduct), never an error.
    pub fn find_match<'a>(&self, label: &str, catalog: &'a [Product]) -> Option<&'a Product> {
        let label = normalize(label);
        if label.is_empty() {
            return None;
        }

        for heuristic in &self.heuristics {
            for product in catalog {
                if heuristic.matches(&label, &normalize(&product.name)) {
                    return Some(product);
                }
            }
        }

        None
    }
}

impl Default for ProductMatcher {
    fn default() -> Self {
        ProductMatcher::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
