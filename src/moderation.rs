//! Content moderation for free-text prompt values.
//!
//! Treated as a pluggable predicate (`ContentFilter`) so stricter filters can
//! be swapped in without touching state-machine code, per the design spec's
//! notes on moderation.

use std::collections::HashSet;
use std::sync::Arc;

/// A pluggable content filter. Implementations decide whether a submitted
/// prompt value is acceptable.
pub trait ContentFilter: Send + Sync {
    fn is_allowed(&self, value: &str) -> bool;
}

/// Default filter: ASCII-printable check plus whole-word blocked-term
/// matching that survives common leetspeak substitutions.
pub struct BlockedTermFilter {
    blocked: HashSet<String>,
}

impl BlockedTermFilter {
    pub fn new(blocked_terms: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            blocked: blocked_terms.into_iter().map(str::to_ascii_lowercase).collect(),
        }
    }

    pub fn with_default_terms() -> Self {
        Self::new(["fuck", "shit", "bitch", "cunt", "nigger", "asshole"])
    }
}

impl Default for BlockedTermFilter {
    fn default() -> Self {
        Self::with_default_terms()
    }
}

impl ContentFilter for BlockedTermFilter {
    fn is_allowed(&self, value: &str) -> bool {
        if !is_ascii_printable(value) {
            return false;
        }
        let folded = fold_leetspeak(value);
        !has_blocked_word(&folded, &self.blocked)
    }
}

/// Default pluggable filter used when none is configured.
pub fn default_filter() -> Arc<dyn ContentFilter> {
    Arc::new(BlockedTermFilter::with_default_terms())
}

/// ASCII printable characters are 0x20..=0x7E.
pub fn is_ascii_printable(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii() && !c.is_ascii_control())
}

fn fold_leetspeak(value: &str) -> String {
    value
        .to_ascii_lowercase()
        .chars()
        .map(|c| match c {
            '@' => 'a',
            '$' => 's',
            '0' => 'o',
            '1' => 'i',
            '3' => 'e',
            '4' => 'a',
            '5' => 's',
            '7' => 't',
            '8' => 'b',
            '9' => 'g',
            '!' => 'i',
            '+' => 't',
            other => other,
        })
        .collect()
}

/// Split into whole-word tokens on any non-alphabetic separator (whitespace
/// included), so ordinary multi-word phrases stay word-bounded instead of
/// concatenating into something that merely *contains* a blocked substring.
fn words(folded: &str) -> Vec<&str> {
    folded
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|s| !s.is_empty())
        .collect()
}

/// True if `folded` contains a blocked term, either as a standalone word or
/// as a run of single-character words that spells one out (the "f u c k"
/// spaced-evasion case). Only adjacent single-character tokens are joined,
/// so legitimate multi-word phrases like "a cat ran" never merge into one
/// blob and lose their word boundaries.
fn has_blocked_word(folded: &str, blocked: &HashSet<String>) -> bool {
    let tokens = words(folded);
    if tokens.iter().any(|word| blocked.contains(*word)) {
        return true;
    }

    let mut run = String::new();
    for token in &tokens {
        if token.len() == 1 {
            run.push_str(token);
        } else {
            run.clear();
            continue;
        }
        if blocked.contains(&run) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_ascii_printable() {
        let filter = BlockedTermFilter::with_default_terms();
        assert!(!filter.is_allowed("café\u{0007}"));
        assert!(filter.is_allowed("forest"));
    }

    #[test]
    fn blocks_whole_word_matches_only() {
        let filter = BlockedTermFilter::with_default_terms();
        assert!(!filter.is_allowed("fuck"));
        assert!(filter.is_allowed("fuchsia"));
    }

    #[test]
    fn blocks_spaced_and_leetspeak_variants() {
        let filter = BlockedTermFilter::with_default_terms();
        assert!(!filter.is_allowed("f u c k"));
        assert!(!filter.is_allowed("$h1t"));
    }

    #[test]
    fn non_ascii_lookalikes_are_rejected_as_non_printable() {
        let filter = BlockedTermFilter::with_default_terms();
        assert!(!filter.is_allowed("f\u{00fb}ck"));
    }

    #[test]
    fn allows_ordinary_words() {
        let filter = BlockedTermFilter::with_default_terms();
        assert!(filter.is_allowed("brave"));
        assert!(filter.is_allowed("squirrels"));
    }

    #[test]
    fn blocks_term_embedded_in_a_longer_phrase() {
        let filter = BlockedTermFilter::with_default_terms();
        assert!(!filter.is_allowed("fuck you"));
        assert!(filter.is_allowed("a cat ran"));
    }
}
