//! PatternMatcher - ENS name + hex address detection via Regex
//!
//! One unified, case-insensitive, Unicode-aware pass over a text blob:
//! - **Name entities**: dotted label clusters (letters, digits, marks,
//!   symbols, ZWJ/variation-selector) ending in a reserved suffix
//!   (`alice.eth`, `vault.box`, legacy `ens.xyz`)
//! - **Address entities**: word-bounded `0x` + exactly 40 hex digits
//!
//! Matching is stateless across calls: every invocation starts a fresh
//! non-overlapping, leftmost-first iteration, so a shared matcher instance
//! never leaks a cursor between blobs.
//!
//! An Aho-Corasick prefilter (`contains_any`) rejects plain text before any
//! regex work, the same fast-path shape `ReflexCortex::contains_any` uses.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use regex::Regex;
use serde::{Deserialize, Serialize};

// ==================== TYPE DEFINITIONS ====================

/// Reserved name suffixes, always active
const RESERVED_SUFFIXES: &[&str] = &["eth", "box"];

/// Legacy suffixes, active when `MatcherConfig.legacy_suffixes` is set
const LEGACY_SUFFIXES: &[&str] = &["xyz"];

/// Cluster of code points allowed inside a name label
const NAME_CLUSTER: &str = r"[\p{L}\p{N}\p{M}\p{S}\x{200D}\x{FE0F}]+";

/// Kind of entity detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Ens,
    Address,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Ens => "ens",
            EntityKind::Address => "address",
        }
    }
}

/// A single entity match over a text blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMatch {
    /// Exact matched slice
    pub raw_text: String,
    /// Matched slice with leading list decoration stripped
    pub normalized_text: String,
    pub kind: EntityKind,
    /// Byte offset of the match start in the scanned blob
    pub start: usize,
    /// Byte offset one past the match end
    pub end: usize,
}

/// Matcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Accept the legacy suffix set (`xyz`) in addition to the reserved one
    #[serde(default = "default_true")]
    pub legacy_suffixes: bool,
}

fn default_true() -> bool {
    true
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            legacy_suffixes: true,
        }
    }
}

// ==================== MAIN IMPLEMENTATION ====================

/// Stateless two-grammar entity matcher
#[derive(Debug)]
pub struct PatternMatcher {
    /// Both grammars in one alternation; earlier-starting matches win ties
    unified: Regex,
    /// Name grammar alone, for kind resolution on normalized text
    name_only: Regex,
    /// Literal fragment prefilter: cheap "could this blob match at all?"
    prefilter: AhoCorasick,
}

impl PatternMatcher {
    pub fn new(config: &MatcherConfig) -> Self {
        let mut suffixes: Vec<&str> = RESERVED_SUFFIXES.to_vec();
        if config.legacy_suffixes {
            suffixes.extend_from_slice(LEGACY_SUFFIXES);
        }
        let suffix_alt = suffixes.join("|");

        let name_source = format!(r"(?:{NAME_CLUSTER}\.)+(?:{suffix_alt})\b");
        let address_source = r"\b0x[a-fA-F0-9]{40}\b";

        let unified = Regex::new(&format!(r"(?i)(?:{name_source}|{address_source})"))
            .expect("unified entity pattern must compile");
        let name_only =
            Regex::new(&format!(r"(?i){name_source}")).expect("name pattern must compile");

        let mut fragments: Vec<String> =
            suffixes.iter().map(|suffix| format!(".{suffix}")).collect();
        fragments.push("0x".to_string());
        let prefilter = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .build(&fragments)
            .expect("prefilter automaton must build");

        Self {
            unified,
            name_only,
            prefilter,
        }
    }

    /// Quick check whether the blob can contain any entity at all
    pub fn contains_any(&self, text: &str) -> bool {
        self.prefilter.is_match(text)
    }

    /// Lazy, ordered, non-overlapping matches, earliest offset first
    pub fn iter_matches<'a>(&'a self, text: &'a str) -> impl Iterator<Item = EntityMatch> + 'a {
        self.unified.find_iter(text).map(move |found| {
            let raw = found.as_str();
            let normalized = normalize_entity(raw);
            let kind = if self.name_only.is_match(normalized) {
                EntityKind::Ens
            } else {
                EntityKind::Address
            };
            EntityMatch {
                raw_text: raw.to_string(),
                normalized_text: normalized.to_string(),
                kind,
                start: found.start(),
                end: found.end(),
            }
        })
    }

    /// Collected form of [`iter_matches`](Self::iter_matches)
    pub fn find_matches(&self, text: &str) -> Vec<EntityMatch> {
        self.iter_matches(text).collect()
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new(&MatcherConfig::default())
    }
}

/// Strip a leading run of bullet/dash/middle-dot/asterisk/whitespace
/// decoration, so list-prefixed text ("• alice.eth") exposes a clean value
pub fn normalize_entity(raw: &str) -> &str {
    raw.trim_start_matches(|c: char| {
        matches!(c, '*' | '\u{2022}' | '-' | '\u{2014}' | '\u{00B7}') || c.is_whitespace()
    })
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> PatternMatcher {
        PatternMatcher::default()
    }

    // -------------------------------------------------------------------------
    // Name grammar
    // -------------------------------------------------------------------------

    #[test]
    fn test_simple_ens_name() {
        let matches = matcher().find_matches("say hi to alice.eth today");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].normalized_text, "alice.eth");
        assert_eq!(matches[0].kind, EntityKind::Ens);
        assert_eq!(matches[0].start, 10);
        assert_eq!(matches[0].end, 19);
    }

    #[test]
    fn test_box_and_legacy_xyz_suffixes() {
        let matches = matcher().find_matches("bob.box and ens.xyz");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].normalized_text, "bob.box");
        assert_eq!(matches[1].normalized_text, "ens.xyz");
        assert!(matches.iter().all(|m| m.kind == EntityKind::Ens));
    }

    #[test]
    fn test_legacy_suffix_disabled() {
        let strict = PatternMatcher::new(&MatcherConfig {
            legacy_suffixes: false,
        });
        assert!(strict.find_matches("ens.xyz").is_empty());
        assert_eq!(strict.find_matches("alice.eth").len(), 1);
    }

    #[test]
    fn test_multi_label_name() {
        let matches = matcher().find_matches("pay sub.alice.eth now");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].normalized_text, "sub.alice.eth");
    }

    #[test]
    fn test_case_insensitive_name() {
        let matches = matcher().find_matches("Alice.ETH");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].kind, EntityKind::Ens);
    }

    #[test]
    fn test_unicode_name_with_emoji() {
        // Emoji are \p{So}; ZWJ sequences stay inside one label cluster
        let matches = matcher().find_matches("send to \u{1F680}.eth please");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].normalized_text, "\u{1F680}.eth");
    }

    #[test]
    fn test_unreserved_suffix_rejected() {
        assert!(matcher().find_matches("alice.ethereum").is_empty());
        assert!(matcher().find_matches("alice.com").is_empty());
    }

    #[test]
    fn test_normalization_strips_leading_decoration() {
        // The decoration chars sit outside the cluster class, but a caller
        // may hand a pre-sliced raw value; normalization must clean it
        assert_eq!(normalize_entity("\u{2022} alice.eth"), "alice.eth");
        assert_eq!(normalize_entity("***ens.xyz"), "ens.xyz");
        assert_eq!(normalize_entity("- \u{2014} bob.box"), "bob.box");
        assert_eq!(normalize_entity("alice.eth"), "alice.eth");
    }

    #[test]
    fn test_list_prefixed_blob() {
        let matches = matcher().find_matches("\u{2022} alice.eth");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].normalized_text, "alice.eth");
        assert_eq!(matches[0].kind, EntityKind::Ens);
    }

    // -------------------------------------------------------------------------
    // Address grammar
    // -------------------------------------------------------------------------

    const ADDR: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";

    #[test]
    fn test_address_exact_length() {
        let blob = format!("tip {ADDR} thanks");
        let matches = matcher().find_matches(&blob);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].kind, EntityKind::Address);
        assert_eq!(matches[0].normalized_text, ADDR);
    }

    #[test]
    fn test_address_39_digits_rejected() {
        let short = &ADDR[..ADDR.len() - 1];
        assert!(matcher().find_matches(short).is_empty());
    }

    #[test]
    fn test_address_41_digits_rejected() {
        let long = format!("{ADDR}f");
        assert!(matcher().find_matches(&long).is_empty());
    }

    #[test]
    fn test_address_requires_word_boundary() {
        let glued = format!("id{ADDR}");
        assert!(matcher().find_matches(&glued).is_empty());
    }

    // -------------------------------------------------------------------------
    // Unified pass
    // -------------------------------------------------------------------------

    #[test]
    fn test_ordered_mixed_matches() {
        let blob = format!("alice.eth sent funds to {ADDR} yesterday");
        let matches = matcher().find_matches(&blob);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].kind, EntityKind::Ens);
        assert_eq!(matches[1].kind, EntityKind::Address);
        assert!(matches[0].start < matches[1].start);
    }

    #[test]
    fn test_no_cursor_leak_across_calls() {
        let m = matcher();
        let blob = "x alice.eth y";
        let first = m.find_matches(blob);
        let second = m.find_matches(blob);
        assert_eq!(first, second);
        assert_eq!(first[0].start, 2);
    }

    #[test]
    fn test_matches_never_overlap() {
        let matches = matcher().find_matches("a.eth.eth");
        let mut last_end = 0;
        for m in &matches {
            assert!(m.start >= last_end);
            last_end = m.end;
        }
    }

    // -------------------------------------------------------------------------
    // Prefilter
    // -------------------------------------------------------------------------

    #[test]
    fn test_prefilter_rejects_plain_text() {
        let m = matcher();
        assert!(!m.contains_any("nothing interesting here"));
        assert!(m.contains_any("maybe alice.eth"));
        assert!(m.contains_any("raw 0xdeadbeef"));
        assert!(m.contains_any("ALICE.ETH")); // case-insensitive
    }
}
