//! Trie node variants, factory, and RLP encoding.

use std::rc::Rc;

use super::nibbles::{NibblePath, LEAF_TERMINATOR};
use crate::crypto::keccak256;
use crate::rlp::RlpEncoder;

/// Hash size (Keccak-256).
pub const HASH_SIZE: usize = 32;

/// The empty trie root hash (keccak of the RLP empty string).
pub const EMPTY_ROOT: [u8; HASH_SIZE] = [
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8,
    0x6e, 0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63,
    0xb4, 0x21,
];

/// A node in the Merkle Patricia Trie.
///
/// Invariants maintained by the visitors:
/// - an extension has a non-empty path and a branch child;
/// - a settled branch has at least two live outgoing references
///   (non-null children plus the optional value);
/// - a leaf path always ends with the terminator.
#[derive(Debug, PartialEq, Eq)]
pub enum Node {
    /// Empty node (null).
    Null,

    /// Leaf node: the remainder of the key and the value bound to it.
    Leaf {
        path: NibblePath,
        value: Vec<u8>,
    },

    /// Extension node: a shared path prefix and its branch child.
    Extension {
        path: NibblePath,
        child: Rc<Node>,
    },

    /// Branch node: one child per nibble plus an optional value for keys
    /// terminating here.
    Branch {
        children: [Rc<Node>; 16],
        value: Option<Vec<u8>>,
    },
}

/// Creates a null node reference.
pub(crate) fn null() -> Rc<Node> {
    Rc::new(Node::Null)
}

/// Creates a leaf node.
pub(crate) fn leaf(path: NibblePath, value: Vec<u8>) -> Rc<Node> {
    Rc::new(Node::Leaf { path, value })
}

/// Creates an extension node over a branch child.
pub(crate) fn extension(path: NibblePath, child: Rc<Node>) -> Rc<Node> {
    debug_assert!(!path.is_empty(), "extension path must be non-empty");
    Rc::new(Node::Extension { path, child })
}

/// Creates a branch from explicit children and value.
pub(crate) fn branch(children: [Rc<Node>; 16], value: Option<Vec<u8>>) -> Rc<Node> {
    Rc::new(Node::Branch { children, value })
}

/// Creates a branch holding exactly two entries.
///
/// An index equal to the leaf terminator routes that node's value into the
/// branch value slot instead of a child slot.
pub(crate) fn branch2(a_index: u8, a: Rc<Node>, b_index: u8, b: Rc<Node>) -> Rc<Node> {
    debug_assert!(a_index != b_index);
    let mut children: [Rc<Node>; 16] = std::array::from_fn(|_| null());

    if a_index == LEAF_TERMINATOR {
        children[b_index as usize] = b;
        branch(children, leaf_value(&a))
    } else if b_index == LEAF_TERMINATOR {
        children[a_index as usize] = a;
        branch(children, leaf_value(&b))
    } else {
        children[a_index as usize] = a;
        children[b_index as usize] = b;
        branch(children, None)
    }
}

fn leaf_value(node: &Node) -> Option<Vec<u8>> {
    match node {
        Node::Leaf { value, .. } => Some(value.clone()),
        _ => None,
    }
}

impl Node {
    /// Returns true for the null node.
    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    /// RLP encodes the node.
    pub fn encode(&self) -> Vec<u8> {
        let mut encoder = RlpEncoder::new();
        self.encode_to(&mut encoder);
        encoder.into_bytes()
    }

    /// RLP encodes the node to the given encoder.
    fn encode_to(&self, encoder: &mut RlpEncoder) {
        match self {
            Node::Null => {
                encoder.encode_empty();
            }
            Node::Leaf { path, value } => {
                encoder.encode_list(|e| {
                    e.encode_nibbles(path.without_terminator(), true);
                    e.encode_bytes(value);
                });
            }
            Node::Extension { path, child } => {
                encoder.encode_list(|e| {
                    e.encode_nibbles(path.as_slice(), false);
                    Self::encode_child(child, e);
                });
            }
            Node::Branch { children, value } => {
                encoder.encode_list(|e| {
                    for child in children.iter() {
                        Self::encode_child(child, e);
                    }
                    match value {
                        Some(v) => e.encode_bytes(v),
                        None => e.encode_empty(),
                    }
                });
            }
        }
    }

    /// Encodes a child reference: nodes whose RLP is 32 bytes or longer are
    /// referenced by hash, shorter ones embed inline.
    fn encode_child(child: &Node, encoder: &mut RlpEncoder) {
        if child.is_null() {
            encoder.encode_empty();
            return;
        }
        let encoded = child.encode();
        if encoded.len() >= HASH_SIZE {
            encoder.encode_bytes(&keccak256(&encoded));
        } else {
            encoder.encode_raw(&encoded);
        }
    }

    /// Computes the Keccak-256 hash of the node's RLP encoding.
    pub fn keccak(&self) -> [u8; HASH_SIZE] {
        keccak256(&self.encode())
    }
}
