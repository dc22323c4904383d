//! Property-based tests for container decoding
//!
//! Uses proptest to check that arbitrary truncation or corruption is always
//! reported as an error, never a panic, and that selection stays ordered.

mod common;

use common::{two_saves, Fixture, Table};
use proptest::prelude::*;
use savegame_goggles::{
    ByteCursor, Container, GogglesError, Layer, PatternMatcher, Savegame, HEADER_CHAIN_SIZE,
};

proptest! {
    #[test]
    fn prop_truncation_is_reported(cut in 0usize..HEADER_CHAIN_SIZE) {
        let bytes = two_saves();
        let result = Container::decode(&bytes[..cut]);
        let is_truncated = matches!(result, Err(GogglesError::TruncatedInput { .. }));
        prop_assert!(is_truncated);
    }

    #[test]
    fn prop_tag_corruption_stops_at_layer(
        layer_idx in 1usize..8,
        byte in 0usize..4,
        xor in 1u8..=255
    ) {
        let layer = Layer::ALL[layer_idx];
        let mut bytes = two_saves();
        bytes[layer.offset() + byte] ^= xor;

        let mut cursor = ByteCursor::new(&bytes);
        let err = Container::read(&mut cursor).unwrap_err();
        prop_assert_eq!(err.layer(), Some(layer));
        prop_assert_eq!(cursor.position(), layer.offset() + layer.size());
    }

    #[test]
    fn prop_non_tag_bytes_never_fail_chain(
        pos in 0usize..HEADER_CHAIN_SIZE,
        value in any::<u8>()
    ) {
        let on_tag = Layer::ALL
            .iter()
            .filter(|l| l.magic().is_some())
            .any(|l| (l.offset()..l.offset() + 4).contains(&pos));
        prop_assume!(!on_tag);

        let mut bytes = two_saves();
        bytes[pos] = value;
        prop_assert!(Container::decode(&bytes).is_ok());
    }

    #[test]
    fn prop_random_input_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..4096)) {
        let _ = Savegame::from_bytes(bytes);
    }

    #[test]
    fn prop_selection_ordered_and_filtered(
        indices in prop::collection::btree_set(1u32..1000, 0..20),
        pattern in "[A-C*?]{0,4}"
    ) {
        let table = indices.iter().fold(Table::default(), |table, &i| {
            let name = format!("{}{}", ["A", "B", "C"][i as usize % 3], i);
            table.file(i, &name, 0, i as u64)
        });
        let save = Savegame::from_bytes(Fixture::new(table).build()).unwrap();
        prop_assert_eq!(save.index().len(), indices.len());

        let selected: Vec<_> = save.select(&pattern).collect();
        prop_assert!(selected.windows(2).all(|w| w[0].file_index < w[1].file_index));
        prop_assert!(selected.iter().all(|e| PatternMatcher::matches(&pattern, &e.name)));

        let expected = save
            .list()
            .filter(|e| PatternMatcher::matches(&pattern, &e.name))
            .count();
        prop_assert_eq!(selected.len(), expected);
    }

    #[test]
    fn prop_star_matches_everything(name in "[ -~]{0,64}") {
        prop_assert!(PatternMatcher::matches("*", &name));
        prop_assert!(PatternMatcher::matches(&name, &name));
    }
}
