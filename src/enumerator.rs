//! Combination enumeration over the open phrase positions
//!
//! A lazy, restartable, chunked stream of tuples, one word per open
//! position. Tuples are emitted in lexicographic order over the mixed-radix
//! basis: position 0 varies slowest, the last position fastest, and every
//! candidate list iterates in wordlist order. The stream never materializes
//! the search space; state is a single odometer.

use crate::error::{EnumeratorError, Result};
use crate::resolver::ResolvedPhrase;

/// A contiguous run of tuples, identified by its start index.
///
/// The fingerprint `[start, end)` locates the chunk in the global
/// enumeration; indices count emitted tuples, so they stay meaningful when
/// the without-repetition filter prunes the raw space.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Global index of the first tuple in this chunk
    pub start: u128,
    /// The tuples, in enumeration order
    pub tuples: Vec<Vec<&'static str>>,
}

impl Chunk {
    /// Number of tuples in this chunk
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Exclusive end index of this chunk
    pub fn end(&self) -> u128 {
        self.start + self.tuples.len() as u128
    }
}

/// Streaming tuple generator with seek support
#[derive(Debug, Clone)]
pub struct CombinationEnumerator {
    /// Candidate lists, one per open position in phrase order
    candidates: Vec<Vec<&'static str>>,
    /// Confirmed words, for the without-repetition collision check
    fixed: Vec<&'static str>,
    /// Mixed-radix basis (candidate-list cardinalities)
    radix: Vec<usize>,
    /// Current odometer digits; always point at the next valid tuple
    digits: Vec<usize>,
    /// Global index of the next emitted tuple
    cursor: u128,
    /// Raw cartesian-product size, saturating
    raw_total: u128,
    repeating: bool,
    exhausted: bool,
}

impl CombinationEnumerator {
    /// Create an enumerator positioned at index 0.
    ///
    /// With `repeating` false, tuples in which any word repeats elsewhere in
    /// the assembled phrase (confirmed words included) are pruned during
    /// descent rather than generated and filtered.
    pub fn new(resolved: &ResolvedPhrase, repeating: bool) -> Self {
        let candidates: Vec<Vec<&'static str>> = resolved
            .open_slots()
            .iter()
            .map(|slot| slot.candidates.clone())
            .collect();
        let radix: Vec<usize> = candidates.iter().map(|c| c.len()).collect();
        let raw_total = radix
            .iter()
            .fold(1u128, |acc, &r| acc.saturating_mul(r as u128));

        let mut enumerator = Self {
            digits: vec![0; candidates.len()],
            fixed: resolved.fixed_words(),
            candidates,
            radix,
            cursor: 0,
            raw_total,
            repeating,
            exhausted: false,
        };
        if !repeating {
            enumerator.skip_colliding();
        }
        enumerator
    }

    /// Raw cartesian-product size (saturating at `u128::MAX`).
    ///
    /// Equals the stream length in repeating mode; an upper bound otherwise.
    pub fn raw_total(&self) -> u128 {
        self.raw_total
    }

    /// Global index of the next tuple to be emitted
    pub fn cursor(&self) -> u128 {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Produce the next tuple, or `None` when the stream has terminated
    pub fn next_tuple(&mut self) -> Option<Vec<&'static str>> {
        if self.exhausted {
            return None;
        }
        // Zero open positions: the stream is the single empty tuple.
        if self.radix.is_empty() {
            self.exhausted = true;
            self.cursor += 1;
            return Some(Vec::new());
        }

        let tuple: Vec<&'static str> = self
            .digits
            .iter()
            .enumerate()
            .map(|(position, &digit)| self.candidates[position][digit])
            .collect();

        self.cursor += 1;
        self.advance();
        if !self.repeating {
            self.skip_colliding();
        }
        Some(tuple)
    }

    /// Produce the next chunk of at most `size` tuples.
    ///
    /// Emitted chunks are never empty; the final chunk may be short.
    pub fn next_chunk(&mut self, size: usize) -> Option<Chunk> {
        debug_assert!(size > 0);
        let start = self.cursor;
        let mut tuples = Vec::with_capacity(size.min(1024));
        while tuples.len() < size {
            match self.next_tuple() {
                Some(tuple) => tuples.push(tuple),
                None => break,
            }
        }
        if tuples.is_empty() {
            None
        } else {
            Some(Chunk { start, tuples })
        }
    }

    /// Position the stream so that its next emission is the tuple at global
    /// index `start`.
    ///
    /// In repeating mode the index decodes directly into odometer digits.
    /// Under the without-repetition filter only fast-forwarding is exact, so
    /// the stream restarts and discards `start` tuples. Seeking at or past
    /// the end of the stream is not an error; the stream just terminates.
    pub fn seek(&mut self, start: u128) -> Result<()> {
        if self.repeating {
            if self.radix.is_empty() {
                self.exhausted = start >= 1;
                self.cursor = start;
                return Ok(());
            }
            if start >= self.raw_total {
                self.exhausted = true;
                self.cursor = start;
                return Ok(());
            }
            self.digits = self.decode(start)?;
            self.cursor = start;
            self.exhausted = false;
            Ok(())
        } else {
            self.reset();
            let mut remaining = start;
            while remaining > 0 {
                if self.next_tuple().is_none() {
                    break;
                }
                remaining -= 1;
            }
            Ok(())
        }
    }

    /// Rewind to index 0
    pub fn reset(&mut self) {
        self.digits.fill(0);
        self.cursor = 0;
        self.exhausted = false;
        if !self.repeating {
            self.skip_colliding();
        }
    }

    /// Decode a global index into mixed-radix digits, most significant
    /// digit at position 0.
    fn decode(&self, mut index: u128) -> Result<Vec<usize>> {
        let mut digits = vec![0usize; self.radix.len()];
        for position in (0..self.radix.len()).rev() {
            let r = self.radix[position] as u128;
            digits[position] = (index % r) as usize;
            index /= r;
        }
        if index > 0 {
            return Err(EnumeratorError::IndexOutOfRange {
                index,
                total: self.raw_total,
            }
            .into());
        }
        Ok(digits)
    }

    /// Odometer increment: the last position varies fastest; carrying out
    /// of position 0 terminates the stream.
    fn advance(&mut self) {
        for position in (0..self.digits.len()).rev() {
            self.digits[position] += 1;
            if self.digits[position] < self.radix[position] {
                return;
            }
            self.digits[position] = 0;
        }
        self.exhausted = true;
    }

    /// Move the odometer forward to the next tuple satisfying the
    /// uniqueness requirement, pruning whole subtrees at the colliding
    /// depth instead of stepping tuple by tuple.
    fn skip_colliding(&mut self) {
        'outer: while !self.exhausted && !self.digits.is_empty() {
            for depth in 0..self.digits.len() {
                let word = self.candidates[depth][self.digits[depth]];
                if self.collides(depth, word) {
                    self.bump_at(depth);
                    continue 'outer;
                }
            }
            return;
        }
    }

    /// Whether `word` already appears among the confirmed words or in the
    /// partial prefix above `depth`.
    fn collides(&self, depth: usize, word: &str) -> bool {
        self.fixed.iter().any(|f| *f == word)
            || (0..depth).any(|d| self.candidates[d][self.digits[d]] == word)
    }

    /// Advance the digit at `depth`, resetting everything deeper; carries
    /// propagate toward position 0 and may terminate the stream.
    fn bump_at(&mut self, depth: usize) {
        for d in depth + 1..self.digits.len() {
            self.digits[d] = 0;
        }
        let mut d = depth;
        loop {
            self.digits[d] += 1;
            if self.digits[d] < self.radix[d] {
                return;
            }
            self.digits[d] = 0;
            if d == 0 {
                self.exhausted = true;
                return;
            }
            d -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvedPhrase;

    fn resolve(phrase: &str) -> ResolvedPhrase {
        ResolvedPhrase::resolve(phrase).unwrap()
    }

    /// Two prefix slots ("zo" x "sol") give a small 2x5 basis.
    fn small_phrase() -> ResolvedPhrase {
        resolve("zo sol abandon ability able about above absent absorb abstract absurd abuse")
    }

    #[test]
    fn test_lexicographic_order_and_bijection() {
        let resolved = small_phrase();
        let mut enumerator = CombinationEnumerator::new(&resolved, true);
        assert_eq!(enumerator.raw_total(), 10);

        let zo = ["zone", "zoo"];
        let sol = ["solar", "soldier", "solid", "solution", "solve"];

        let mut index = 0u128;
        while let Some(tuple) = enumerator.next_tuple() {
            // Mixed-radix decoding of the index: position 0 slowest.
            let expected = vec![zo[(index / 5) as usize], sol[(index % 5) as usize]];
            assert_eq!(tuple, expected, "tuple at index {index}");
            index += 1;
        }
        assert_eq!(index, 10);
        assert!(enumerator.next_tuple().is_none());
    }

    #[test]
    fn test_chunked_delivery() {
        let resolved = small_phrase();
        let mut enumerator = CombinationEnumerator::new(&resolved, true);

        let first = enumerator.next_chunk(4).unwrap();
        assert_eq!((first.start, first.len()), (0, 4));
        assert_eq!(first.end(), 4);

        let second = enumerator.next_chunk(4).unwrap();
        assert_eq!((second.start, second.len()), (4, 4));

        // Final chunk is short but never empty.
        let last = enumerator.next_chunk(4).unwrap();
        assert_eq!((last.start, last.len()), (8, 2));
        assert!(enumerator.next_chunk(4).is_none());
    }

    #[test]
    fn test_chunk_size_one() {
        let resolved = small_phrase();
        let mut enumerator = CombinationEnumerator::new(&resolved, true);
        let mut seen = 0;
        while let Some(chunk) = enumerator.next_chunk(1) {
            assert_eq!(chunk.len(), 1);
            assert_eq!(chunk.start, seen);
            seen += 1;
        }
        assert_eq!(seen, 10);
    }

    #[test]
    fn test_seek_matches_fast_forward() {
        let resolved = small_phrase();
        let mut reference = CombinationEnumerator::new(&resolved, true);
        let all: Vec<_> = std::iter::from_fn(|| reference.next_tuple()).collect();

        for start in 0..=10u128 {
            let mut enumerator = CombinationEnumerator::new(&resolved, true);
            enumerator.seek(start).unwrap();
            let rest: Vec<_> = std::iter::from_fn(|| enumerator.next_tuple()).collect();
            assert_eq!(rest, all[start as usize..], "seek({start})");
        }
    }

    #[test]
    fn test_seek_to_last_index_emits_one_tuple() {
        let resolved = small_phrase();
        let mut enumerator = CombinationEnumerator::new(&resolved, true);
        enumerator.seek(9).unwrap();
        assert_eq!(enumerator.next_tuple().unwrap(), vec!["zoo", "solve"]);
        assert!(enumerator.next_tuple().is_none());
    }

    #[test]
    fn test_zero_open_positions_yields_one_empty_tuple() {
        let resolved = resolve(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
        );
        let mut enumerator = CombinationEnumerator::new(&resolved, true);
        assert_eq!(enumerator.raw_total(), 1);
        assert_eq!(enumerator.next_tuple().unwrap(), Vec::<&str>::new());
        assert!(enumerator.next_tuple().is_none());

        // Seeking past the single tuple terminates immediately.
        let mut enumerator = CombinationEnumerator::new(&resolved, true);
        enumerator.seek(1).unwrap();
        assert!(enumerator.next_tuple().is_none());
    }

    #[test]
    fn test_without_repetition_prunes_duplicates() {
        // Both open slots draw from {zone, zoo}; only the mixed pairs pass.
        let resolved =
            resolve("zo zo abandon ability able about above absent absorb abstract absurd abuse");
        let mut enumerator = CombinationEnumerator::new(&resolved, false);

        let tuples: Vec<_> = std::iter::from_fn(|| enumerator.next_tuple()).collect();
        assert_eq!(tuples, vec![vec!["zone", "zoo"], vec!["zoo", "zone"]]);
        assert_eq!(enumerator.cursor(), 2);
    }

    #[test]
    fn test_without_repetition_excludes_fixed_words() {
        // "solid" is confirmed, so the open "sol" slot loses it.
        let resolved =
            resolve("sol solid abandon ability able about above absent absorb abstract absurd abuse");
        let mut enumerator = CombinationEnumerator::new(&resolved, false);

        let tuples: Vec<_> = std::iter::from_fn(|| enumerator.next_tuple()).collect();
        let drawn: Vec<&str> = tuples.iter().map(|t| t[0]).collect();
        assert_eq!(drawn, vec!["solar", "soldier", "solution", "solve"]);
    }

    #[test]
    fn test_without_repetition_seek_fast_forwards() {
        let resolved =
            resolve("zo sol abandon ability able about above absent absorb abstract absurd abuse");
        let mut reference = CombinationEnumerator::new(&resolved, false);
        let all: Vec<_> = std::iter::from_fn(|| reference.next_tuple()).collect();

        let mut enumerator = CombinationEnumerator::new(&resolved, false);
        enumerator.seek(3).unwrap();
        assert_eq!(enumerator.cursor(), 3);
        let rest: Vec<_> = std::iter::from_fn(|| enumerator.next_tuple()).collect();
        assert_eq!(rest, all[3..]);
    }

    #[test]
    fn test_huge_space_streams_without_materializing() {
        let all_unknown = vec!["*"; 12].join(" ");
        let resolved = resolve(&all_unknown);
        let mut enumerator = CombinationEnumerator::new(&resolved, true);
        // 2048^12 saturates the raw total; streaming still works.
        assert_eq!(enumerator.raw_total(), u128::MAX);

        let chunk = enumerator.next_chunk(3).unwrap();
        assert_eq!(chunk.tuples[0], vec!["abandon"; 12]);
        let mut second = vec!["abandon"; 12];
        second[11] = "ability";
        assert_eq!(chunk.tuples[1], second);
        let mut third = vec!["abandon"; 12];
        third[11] = "able";
        assert_eq!(chunk.tuples[2], third);
    }

    #[test]
    fn test_resume_partition_covers_stream_exactly_once() {
        let resolved = small_phrase();
        let mut first_run = CombinationEnumerator::new(&resolved, true);
        let mut derived: Vec<Vec<&str>> = Vec::new();
        // First execution processes two chunks of 3 and crashes.
        for _ in 0..2 {
            derived.extend(first_run.next_chunk(3).unwrap().tuples);
        }

        // Second execution resumes at the committed end index.
        let mut second_run = CombinationEnumerator::new(&resolved, true);
        second_run.seek(6).unwrap();
        while let Some(chunk) = second_run.next_chunk(3) {
            derived.extend(chunk.tuples);
        }

        let mut full = CombinationEnumerator::new(&resolved, true);
        let expected: Vec<_> = std::iter::from_fn(|| full.next_tuple()).collect();
        assert_eq!(derived, expected);
    }

    #[test]
    fn test_raw_total_exact_below_saturation() {
        // 2048^11 still fits in u128; adding one more position saturates.
        let eleven: Vec<&str> = std::iter::repeat("*")
            .take(11)
            .chain(std::iter::once("abandon"))
            .collect();
        let resolved = ResolvedPhrase::resolve_tokens(&eleven).unwrap();
        let enumerator = CombinationEnumerator::new(&resolved, true);
        assert_eq!(enumerator.raw_total(), 2048u128.pow(11));
    }
}
