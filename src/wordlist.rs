//! Access to the BIP-39 English wordlist
//!
//! The list is a fixed external constant of exactly 2048 words in sorted
//! order, so membership and prefix lookups are binary searches.

use bip39::Language;

/// Number of words in the BIP-39 English wordlist
pub const WORDLIST_LEN: usize = 2048;

/// The full wordlist, indexed 0..2047 in dictionary order
pub fn words() -> &'static [&'static str] {
    Language::English.word_list()
}

/// Index of an exact wordlist entry
pub fn index_of(word: &str) -> Option<usize> {
    words().binary_search(&word).ok()
}

/// Whether a token is an exact wordlist entry
pub fn contains(word: &str) -> bool {
    index_of(word).is_some()
}

/// All wordlist entries beginning with `prefix`, in wordlist order.
///
/// The wordlist is sorted, so the matches form a contiguous range.
pub fn prefix_matches(prefix: &str) -> &'static [&'static str] {
    let all = words();
    let start = all.partition_point(|w| *w < prefix);
    let end = all[start..]
        .iter()
        .position(|w| !w.starts_with(prefix))
        .map(|off| start + off)
        .unwrap_or(all.len());
    &all[start..end]
}
