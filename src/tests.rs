//! Cross-module scenario tests
//!
//! Exercises the resolve -> enumerate -> derive pipeline against known
//! vectors, end to end through the coordinator where a scenario calls
//! for it.

use crate::config::{Chain, RecoveryConfig};
use crate::coordinator::Coordinator;
use crate::derive::AddressDeriver;
use crate::enumerator::CombinationEnumerator;
use crate::progress::RunStatus;
use crate::resolver::ResolvedPhrase;
use crate::wordlist;

/// A partial phrase with its known completion and target address
struct ScenarioVector {
    partial: &'static str,
    chain: &'static str,
    target: &'static str,
    completion: &'static str,
}

const SCENARIOS: &[ScenarioVector] = &[
    ScenarioVector {
        partial: "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon *",
        chain: "bitcoin",
        target: "bc1qhgv6v7jgxxpf0cpzxd9zga52mx9tuvcdnknlhn",
        completion: "about",
    },
    ScenarioVector {
        partial: "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon *",
        chain: "mainnet",
        target: "0x9858EfFD232B4033E47d90003D41EC34EcaEda94",
        completion: "about",
    },
];

#[test]
fn test_scenario_vectors_through_pipeline() {
    for scenario in SCENARIOS {
        let resolved = ResolvedPhrase::resolve(scenario.partial).unwrap();
        let chain = Chain::from_id(scenario.chain).unwrap();
        let deriver = AddressDeriver::new(&chain);
        let mut enumerator = CombinationEnumerator::new(&resolved, true);

        let mut matches = Vec::new();
        while let Some(chunk) = enumerator.next_chunk(256) {
            for (offset, tuple) in chunk.tuples.iter().enumerate() {
                let phrase = resolved.assemble(tuple);
                let derived = match deriver.derive(&phrase) {
                    Ok(derived) => derived,
                    Err(_) => continue,
                };
                if derived.matches(scenario.target).is_some() {
                    matches.push((chunk.start + offset as u128, tuple.clone()));
                }
            }
        }

        // Exactly one completion reproduces the target address.
        assert_eq!(matches.len(), 1, "chain {}", scenario.chain);
        let (_, tuple) = &matches[0];
        assert_eq!(tuple, &vec![scenario.completion], "chain {}", scenario.chain);
    }
}

#[test]
fn test_ethereum_recovery_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = &SCENARIOS[1];

    let mut config = RecoveryConfig::new(
        scenario.partial.to_string(),
        Chain::from_id(scenario.chain).unwrap(),
    );
    config.public_key = Some(scenario.target.to_string());
    config.repeating_words = true;
    config.workers = 2;
    config.chunk_size = 256;
    config.progress_path = dir.path().join("progress.json");
    config.validate().unwrap();

    let resolved = ResolvedPhrase::resolve(&config.mnemonic).unwrap();
    let outcome = Coordinator::new(config, resolved)
        .without_progress_bar()
        .run()
        .unwrap();

    let win = outcome.win.expect("expected a match");
    assert!(win.phrase.ends_with(" about"));
    assert_eq!(win.address, scenario.target);
    assert_eq!(outcome.status, RunStatus::Completed);
}

#[test]
fn test_prefix_candidates_bound_the_search() {
    // A two-letter prefix narrows one position to its dictionary range
    // rather than the whole wordlist.
    let partial =
        "ab abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon *";
    let resolved = ResolvedPhrase::resolve(partial).unwrap();

    let ab_words = wordlist::prefix_matches("ab");
    assert_eq!(resolved.radix(), vec![ab_words.len(), 2048]);
    assert_eq!(
        resolved.search_space(true),
        (ab_words.len() * 2048) as u128
    );

    match &resolved.slots()[0] {
        crate::resolver::WordSlot::Prefix(candidates) => {
            assert_eq!(candidates.as_slice(), ab_words)
        }
        other => panic!("expected prefix slot, got {other:?}"),
    }
}

#[test]
fn test_zero_unknowns_derives_once() {
    let full =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    let resolved = ResolvedPhrase::resolve(full).unwrap();
    assert_eq!(resolved.search_space(true), 1);

    let deriver = AddressDeriver::new(&Chain::Bitcoin);
    let mut enumerator = CombinationEnumerator::new(&resolved, true);

    let mut derivations = 0;
    while let Some(tuple) = enumerator.next_tuple() {
        let phrase = resolved.assemble(&tuple);
        assert_eq!(phrase, full);
        assert!(deriver.derive(&phrase).is_ok());
        derivations += 1;
    }
    assert_eq!(derivations, 1);
}

#[test]
fn test_without_repetition_never_duplicates_words() {
    // Two open positions plus a repeated fixed word: every emitted phrase
    // must use each word at most once outside the pre-existing repeats.
    let partial = "zo * abandon ability able about above absent absorb abstract absurd *";
    let resolved = ResolvedPhrase::resolve(partial).unwrap();
    let fixed = resolved.fixed_words();
    let mut enumerator = CombinationEnumerator::new(&resolved, false);

    let mut emitted = 0u32;
    for _ in 0..500 {
        let Some(tuple) = enumerator.next_tuple() else {
            break;
        };
        emitted += 1;
        // No draw equals a fixed word.
        assert!(tuple.iter().all(|w| !fixed.contains(w)));
        // No draw equals another draw.
        let mut seen = tuple.clone();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), tuple.len());
    }
    assert!(emitted > 0);
}
