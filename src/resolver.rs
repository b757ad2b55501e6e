//! Partial-phrase resolution
//!
//! Transforms a user-supplied partial mnemonic into a per-position candidate
//! specification: each token is either a confirmed word, a set of prefix
//! completions, or a fully unknown position covering the whole wordlist.

use crate::error::{ConfigError, Result};
use crate::wordlist;
use crate::VALID_PHRASE_LENGTHS;

/// Sentinel token marking a fully unknown position
pub const UNKNOWN_TOKEN: &str = "*";

/// Resolution of a single phrase position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordSlot {
    /// A confirmed wordlist word
    Fixed(&'static str),
    /// Wordlist words sharing a user-supplied prefix, in wordlist order
    Prefix(Vec<&'static str>),
    /// No information; the full wordlist applies
    Unknown,
}

/// One open position: its index in the phrase and its candidate list
#[derive(Debug, Clone)]
pub struct UnknownSlot {
    /// Position in the phrase (0-based)
    pub position: usize,
    /// Candidate words, in wordlist order
    pub candidates: Vec<&'static str>,
}

/// A fully resolved partial phrase
#[derive(Debug, Clone)]
pub struct ResolvedPhrase {
    slots: Vec<WordSlot>,
    open: Vec<UnknownSlot>,
}

impl ResolvedPhrase {
    /// Resolve a space-separated partial mnemonic.
    ///
    /// Each token is either `*`, an exact wordlist word, or a prefix. A
    /// prefix matching exactly one word collapses to that word; a token
    /// matching nothing fails resolution.
    pub fn resolve(mnemonic: &str) -> Result<Self> {
        let tokens: Vec<&str> = mnemonic.split_whitespace().collect();
        Self::resolve_tokens(&tokens)
    }

    /// Resolve an already tokenized partial mnemonic
    pub fn resolve_tokens(tokens: &[&str]) -> Result<Self> {
        if !VALID_PHRASE_LENGTHS.contains(&tokens.len()) {
            return Err(ConfigError::InvalidPhraseLength(tokens.len()).into());
        }

        let mut slots = Vec::with_capacity(tokens.len());
        for token in tokens {
            if *token == UNKNOWN_TOKEN {
                slots.push(WordSlot::Unknown);
                continue;
            }
            let token = token.to_lowercase();
            let matches = wordlist::prefix_matches(&token);
            match matches.len() {
                0 => return Err(ConfigError::InvalidWord(token).into()),
                // An exact word is always the first entry of its own
                // prefix range; a single completion collapses the same way.
                1 => slots.push(WordSlot::Fixed(matches[0])),
                _ if matches[0] == token => slots.push(WordSlot::Fixed(matches[0])),
                _ => slots.push(WordSlot::Prefix(matches.to_vec())),
            }
        }

        let open = slots
            .iter()
            .enumerate()
            .filter_map(|(position, slot)| match slot {
                WordSlot::Fixed(_) => None,
                WordSlot::Prefix(candidates) => Some(UnknownSlot {
                    position,
                    candidates: candidates.clone(),
                }),
                WordSlot::Unknown => Some(UnknownSlot {
                    position,
                    candidates: wordlist::words().to_vec(),
                }),
            })
            .collect();

        Ok(Self { slots, open })
    }

    /// Phrase length in words
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All slots in phrase order
    pub fn slots(&self) -> &[WordSlot] {
        &self.slots
    }

    /// The unknown-position vector: the k-th element is the k-th open
    /// position in left-to-right order.
    pub fn open_slots(&self) -> &[UnknownSlot] {
        &self.open
    }

    /// Mixed-radix basis over the open positions
    pub fn radix(&self) -> Vec<usize> {
        self.open.iter().map(|s| s.candidates.len()).collect()
    }

    /// Number of fully unknown (`*`) positions
    pub fn unknown_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, WordSlot::Unknown))
            .count()
    }

    /// Number of prefix-candidate positions
    pub fn prefix_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, WordSlot::Prefix(_)))
            .count()
    }

    /// Number of confirmed positions
    pub fn fixed_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, WordSlot::Fixed(_)))
            .count()
    }

    /// The confirmed words, in phrase order
    pub fn fixed_words(&self) -> Vec<&'static str> {
        self.slots
            .iter()
            .filter_map(|s| match s {
                WordSlot::Fixed(w) => Some(*w),
                _ => None,
            })
            .collect()
    }

    /// Splice a tuple of fillings into the phrase.
    ///
    /// The tuple must carry one word per open position, in open-slot order.
    pub fn assemble(&self, tuple: &[&str]) -> String {
        debug_assert_eq!(tuple.len(), self.open.len());
        let mut next = 0;
        let mut words = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            match slot {
                WordSlot::Fixed(w) => words.push(*w),
                _ => {
                    words.push(tuple[next]);
                    next += 1;
                }
            }
        }
        words.join(" ")
    }

    /// Total enumeration count N.
    ///
    /// Exact when repetition is allowed. When repetition is disallowed the
    /// formula keeps the full wordlist pool for prefix candidates, so the
    /// value is an approximation used for progress and ETA only; the
    /// enumerator itself decides termination.
    pub fn search_space(&self, repeating: bool) -> u128 {
        let prefix_product: u128 = self
            .slots
            .iter()
            .filter_map(|s| match s {
                WordSlot::Prefix(c) => Some(c.len() as u128),
                _ => None,
            })
            .fold(1u128, |acc, c| acc.saturating_mul(c));

        let unknowns = self.unknown_count() as u128;
        let fixed = self.fixed_count() as u128;
        let pool = wordlist::WORDLIST_LEN as u128;

        let unknown_product = if repeating {
            (0..unknowns).fold(1u128, |acc, _| acc.saturating_mul(pool))
        } else {
            (0..unknowns).fold(1u128, |acc, j| {
                acc.saturating_mul(pool.saturating_sub(fixed + j))
            })
        };

        prefix_product.saturating_mul(unknown_product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_resolution_rules() {
        let resolved = ResolvedPhrase::resolve(
            "abandon * act zoo legal winner thank year wave sausage worth useful",
        )
        .unwrap();

        assert_eq!(resolved.len(), 12);
        assert_eq!(resolved.slots()[0], WordSlot::Fixed("abandon"));
        assert_eq!(resolved.slots()[1], WordSlot::Unknown);
        // "act" is an exact word even though other entries share the prefix
        assert_eq!(resolved.slots()[2], WordSlot::Fixed("act"));
        assert_eq!(resolved.slots()[3], WordSlot::Fixed("zoo"));

        assert_eq!(resolved.unknown_count(), 1);
        assert_eq!(resolved.prefix_count(), 0);
        assert_eq!(resolved.fixed_count(), 11);
    }

    #[test]
    fn test_prefix_candidates() {
        let resolved = ResolvedPhrase::resolve(
            "sol * abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon",
        )
        .unwrap();

        match &resolved.slots()[0] {
            WordSlot::Prefix(candidates) => {
                assert_eq!(candidates, &["solar", "soldier", "solid", "solution", "solve"])
            }
            other => panic!("expected prefix slot, got {other:?}"),
        }
        assert_eq!(resolved.prefix_count(), 1);
        assert_eq!(resolved.radix(), vec![5, 2048]);
    }

    #[test]
    fn test_single_match_prefix_collapses_to_fixed() {
        let resolved = ResolvedPhrase::resolve(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon zo",
        )
        .unwrap();
        match &resolved.slots()[11] {
            WordSlot::Prefix(candidates) => assert_eq!(candidates, &["zone", "zoo"]),
            other => panic!("unexpected {other:?}"),
        }

        let resolved = ResolvedPhrase::resolve(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon zeb",
        )
        .unwrap();
        // "zeb" completes uniquely
        assert_eq!(resolved.slots()[11], WordSlot::Fixed("zebra"));
    }

    #[test]
    fn test_invalid_word_fails() {
        let err = ResolvedPhrase::resolve(
            "qqq abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
        )
        .unwrap_err();
        assert!(err.to_string().contains("qqq"));
    }

    #[test]
    fn test_rejects_bad_lengths() {
        for n in [0, 1, 11, 13, 16, 23, 25] {
            let phrase = vec!["abandon"; n].join(" ");
            assert!(
                ResolvedPhrase::resolve(&phrase).is_err(),
                "length {n} should be rejected"
            );
        }
    }

    #[test]
    fn test_assemble_round_trip() {
        let resolved = ResolvedPhrase::resolve(
            "abandon * abandon * abandon abandon abandon abandon abandon abandon abandon about",
        )
        .unwrap();

        let phrase = resolved.assemble(&["legal", "winner"]);
        assert_eq!(
            phrase,
            "abandon legal abandon winner abandon abandon abandon abandon abandon abandon abandon about"
        );

        // Reproducing the original input for a consistent tuple
        let full = "abandon ability able abandon abandon abandon abandon abandon abandon abandon abandon about";
        let reresolved = ResolvedPhrase::resolve(full).unwrap();
        assert_eq!(reresolved.assemble(&[]), full);
    }

    #[test]
    fn test_search_space() {
        let one_unknown = ResolvedPhrase::resolve(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon *",
        )
        .unwrap();
        assert_eq!(one_unknown.search_space(true), 2048);
        // 2048 - 11 fixed slots
        assert_eq!(one_unknown.search_space(false), 2037);

        let with_prefix = ResolvedPhrase::resolve(
            "act * abandon abandon abandon abandon abandon abandon abandon abandon abandon zo",
        )
        .unwrap();
        // one unknown times the two "zo" completions
        assert_eq!(with_prefix.search_space(true), 2 * 2048);
        assert_eq!(with_prefix.search_space(false), 2 * (2048 - 10));
    }

    #[test]
    fn test_full_unknown_space_saturates() {
        let all_unknown = vec!["*"; 24].join(" ");
        let resolved = ResolvedPhrase::resolve(&all_unknown).unwrap();
        // 2048^24 saturates rather than wrapping
        assert_eq!(resolved.search_space(true), u128::MAX);
    }
}
