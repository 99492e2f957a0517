//! Property-based tests for the trie visitors.

use proptest::prelude::*;

use super::node::Node;
use super::{MerklePatriciaTrie, EMPTY_ROOT};

/// Checks the structural invariants everywhere in a node graph:
/// extensions are non-empty and sit over branches, and every branch keeps
/// at least two live outgoing references.
fn assert_invariants(node: &Node) {
    match node {
        Node::Null | Node::Leaf { .. } => {}
        Node::Extension { path, child } => {
            assert!(!path.is_empty(), "extension with empty path");
            assert!(
                matches!(&**child, Node::Branch { .. }),
                "extension child must be a branch"
            );
            assert_invariants(child);
        }
        Node::Branch { children, value } => {
            let live = children.iter().filter(|c| !c.is_null()).count()
                + usize::from(value.is_some());
            assert!(live >= 2, "branch with {live} live references");
            for child in children.iter() {
                assert_invariants(child);
            }
        }
    }
}

fn distinct_entries() -> impl Strategy<Value = Vec<(Vec<u8>, Vec<u8>)>> {
    proptest::collection::hash_map(
        proptest::collection::vec(any::<u8>(), 1..32),
        proptest::collection::vec(any::<u8>(), 1..64),
        1..20,
    )
    .prop_map(|m| m.into_iter().collect())
}

proptest! {
    #[test]
    fn trie_insert_get(entries in distinct_entries()) {
        let mut trie = MerklePatriciaTrie::new();
        for (key, value) in &entries {
            trie.put(key, value.clone());
        }

        for (key, value) in &entries {
            prop_assert_eq!(trie.get(key), Some(value.as_slice()));
        }

        // A key never inserted is absent
        let mut absent = vec![0xFFu8; 33];
        absent.extend_from_slice(b"never");
        prop_assert_eq!(trie.get(&absent), None);

        assert_invariants(&trie.root());
    }

    #[test]
    fn trie_put_remove_all_is_empty(
        entries in distinct_entries(),
        seed in any::<u64>(),
    ) {
        let mut trie = MerklePatriciaTrie::new();
        for (key, value) in &entries {
            trie.put(key, value.clone());
        }

        // Remove in an order unrelated to insertion order
        let mut keys: Vec<_> = entries.iter().map(|(k, _)| k.clone()).collect();
        keys.sort();
        if seed % 2 == 0 {
            keys.reverse();
        }
        let rotate_len = keys.len().max(1);
        keys.rotate_left((seed as usize) % rotate_len);

        for key in &keys {
            trie.remove(key);
            assert_invariants(&trie.root());
        }

        prop_assert!(trie.is_empty());
        prop_assert_eq!(trie.root_hash(), EMPTY_ROOT);
    }

    #[test]
    fn trie_root_is_permutation_independent(entries in distinct_entries()) {
        let mut forward = MerklePatriciaTrie::new();
        for (key, value) in &entries {
            forward.put(key, value.clone());
        }

        let mut backward = MerklePatriciaTrie::new();
        for (key, value) in entries.iter().rev() {
            backward.put(key, value.clone());
        }

        prop_assert_eq!(forward.root_hash(), backward.root_hash());
    }

    #[test]
    fn trie_remove_reinsert_is_identity(entries in distinct_entries()) {
        let mut trie = MerklePatriciaTrie::new();
        for (key, value) in &entries {
            trie.put(key, value.clone());
        }
        let untouched = trie.root();

        let (key, value) = entries.last().unwrap().clone();
        trie.remove(&key);
        trie.put(&key, value);

        prop_assert_eq!(trie.root(), untouched);
    }

    #[test]
    fn trie_branches_stay_live_after_remove(entries in distinct_entries()) {
        let mut trie = MerklePatriciaTrie::new();
        for (key, value) in &entries {
            trie.put(key, value.clone());
        }

        // Remove roughly half the keys, checking the invariant as we go
        for (key, _) in entries.iter().step_by(2) {
            trie.remove(key);
            assert_invariants(&trie.root());
        }
    }
}
