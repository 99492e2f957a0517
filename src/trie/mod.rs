//! Merkle Patricia Trie over a byte store.
//!
//! Nodes form an immutable graph shared by reference counting; every
//! mutation returns a new root while old roots keep reading unchanged
//! subtrees.

mod nibbles;
mod node;
mod ops;
#[cfg(test)]
mod tests;
mod trie;

pub use nibbles::{NibblePath, LEAF_TERMINATOR};
pub use node::{Node, EMPTY_ROOT, HASH_SIZE};
pub use trie::{secure_key, MerklePatriciaTrie};

use thiserror::Error;

/// Trie errors.
///
/// `Corrupted` is the recoverable heal signal: callers must re-raise it
/// instead of folding it into a generic failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrieError {
    #[error("key not found")]
    NotFound,
    #[error("invalid node")]
    InvalidNode,
    #[error("corrupted trie: {0}")]
    Corrupted(String),
}
