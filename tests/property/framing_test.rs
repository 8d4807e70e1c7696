// tests/property/framing_test.rs

//! Property-based tests for line framing across arbitrary chunk boundaries.

use crate::test_helpers::MockSocket;
use chatrelay::connection::{ConnId, ConnectionRegistry, LineFramer, ReadOutcome};
use chatrelay::core::protocol::QuitMatch;
use proptest::prelude::*;
use std::time::{Duration, Instant};

const ID: ConnId = ConnId::new(3);

/// Splits `bytes` at the given cut points, producing only non-empty chunks.
fn split_at_cuts(bytes: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut points: Vec<usize> = cuts
        .iter()
        .map(|c| c % bytes.len())
        .filter(|&c| c > 0)
        .collect();
    points.sort_unstable();
    points.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for point in points {
        chunks.push(bytes[start..point].to_vec());
        start = point;
    }
    chunks.push(bytes[start..].to_vec());
    chunks
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_split_line_reassembles_exactly_once(
        text in "[a-pr-zA-PR-Z0-9 ,.!?]{1,200}",
        cuts in proptest::collection::vec(any::<usize>(), 0..10)
    ) {
        let now = Instant::now();
        let mut registry: ConnectionRegistry<MockSocket> =
            ConnectionRegistry::new(Duration::from_secs(10));
        registry.register(ID, MockSocket::new(), now).unwrap();
        let framer = LineFramer::new(64 * 1024, QuitMatch::Contains);

        let mut input = text.clone().into_bytes();
        input.push(b'\n');
        let chunks = split_at_cuts(&input, &cuts);
        let last = chunks.len() - 1;

        for (i, chunk) in chunks.iter().enumerate() {
            let outcome = framer.on_read(&mut registry, ID, chunk, now).unwrap();
            if i < last {
                prop_assert_eq!(outcome, ReadOutcome::Incomplete);
            } else {
                let expected = text.trim_end().as_bytes().to_vec();
                prop_assert_eq!(outcome, ReadOutcome::Line(expected.into()));
            }
        }
        prop_assert!(registry.pending(ID).is_none());
    }

    #[test]
    fn test_pending_holds_exactly_the_unterminated_prefix(
        prefix in proptest::collection::vec(any::<u8>().prop_filter("no newline", |b| *b != b'\n'), 1..300)
    ) {
        let now = Instant::now();
        let mut registry: ConnectionRegistry<MockSocket> =
            ConnectionRegistry::new(Duration::from_secs(10));
        registry.register(ID, MockSocket::new(), now).unwrap();
        let framer = LineFramer::new(64 * 1024, QuitMatch::Exact);

        for byte in &prefix {
            let outcome = framer.on_read(&mut registry, ID, &[*byte], now).unwrap();
            prop_assert_eq!(outcome, ReadOutcome::Incomplete);
        }
        prop_assert_eq!(registry.pending(ID), Some(&prefix[..]));
    }
}
