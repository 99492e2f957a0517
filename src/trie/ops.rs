//! Path visitors: get, put, remove.
//!
//! Each visitor dispatches on the node variant and produces a new node
//! graph by structural sharing; untouched subtrees are reused by reference.

use std::rc::Rc;

use super::nibbles::{NibblePath, LEAF_TERMINATOR};
use super::node::{self, Node};

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Looks up the value bound to `path`.
pub(crate) fn get<'a>(node: &'a Node, path: &[u8]) -> Option<&'a [u8]> {
    match node {
        Node::Null => None,
        Node::Leaf { path: leaf_path, value } => {
            (leaf_path.as_slice() == path).then_some(value.as_slice())
        }
        Node::Extension { path: ext_path, child } => {
            let common = common_prefix(ext_path.as_slice(), path);
            if common == ext_path.len() {
                get(child, &path[common..])
            } else {
                None
            }
        }
        Node::Branch { children, value } => {
            debug_assert!(!path.is_empty(), "visiting path lost its terminator");
            let index = path[0];
            if index == LEAF_TERMINATOR {
                value.as_deref()
            } else {
                get(&children[index as usize], &path[1..])
            }
        }
    }
}

/// Binds `value` to `path`, returning the replacement node.
pub(crate) fn put(current: &Rc<Node>, path: &[u8], value: Vec<u8>) -> Rc<Node> {
    match &**current {
        Node::Null => node::leaf(NibblePath::from(path), value),

        Node::Leaf { path: leaf_path, value: leaf_value } => {
            let common = common_prefix(leaf_path.as_slice(), path);
            if common == leaf_path.len() && common == path.len() {
                // Same key: overwrite
                return node::leaf(leaf_path.clone(), value);
            }
            debug_assert!(
                common < leaf_path.len() && common < path.len(),
                "terminated paths cannot be prefixes of each other"
            );

            // Split: push both remainders below a new branch
            let updated_index = leaf_path.get(common);
            let updated_leaf =
                node::leaf(leaf_path.slice_from(common + 1), leaf_value.clone());
            let new_index = path[common];
            let new_leaf = node::leaf(NibblePath::from(&path[common + 1..]), value);

            let branch = node::branch2(updated_index, updated_leaf, new_index, new_leaf);
            if common > 0 {
                node::extension(leaf_path.slice_to(common), branch)
            } else {
                branch
            }
        }

        Node::Extension { path: ext_path, child } => {
            let common = common_prefix(ext_path.as_slice(), path);
            if common == ext_path.len() {
                let new_child = put(child, &path[common..], value);
                return node::extension(ext_path.clone(), new_child);
            }

            // The paths diverge inside the extension: split it
            let ext_index = ext_path.get(common);
            let updated_extension = if common + 1 < ext_path.len() {
                node::extension(ext_path.slice_from(common + 1), Rc::clone(child))
            } else {
                Rc::clone(child)
            };
            let new_index = path[common];
            let new_leaf = node::leaf(NibblePath::from(&path[common + 1..]), value);

            let branch = node::branch2(new_index, new_leaf, ext_index, updated_extension);
            if common > 0 {
                node::extension(ext_path.slice_to(common), branch)
            } else {
                branch
            }
        }

        Node::Branch { children, value: branch_value } => {
            debug_assert!(!path.is_empty(), "visiting path lost its terminator");
            let index = path[0];
            if index == LEAF_TERMINATOR {
                return node::branch(children.clone(), Some(value));
            }
            let new_child = put(&children[index as usize], &path[1..], value);
            let mut children = children.clone();
            children[index as usize] = new_child;
            node::branch(children, branch_value.clone())
        }
    }
}

/// Unbinds `path`, returning the replacement node. Absence is a no-op.
pub(crate) fn remove(current: &Rc<Node>, path: &[u8], allow_flatten: bool) -> Rc<Node> {
    match &**current {
        Node::Null => node::null(),

        Node::Leaf { path: leaf_path, .. } => {
            let common = common_prefix(leaf_path.as_slice(), path);
            if common == leaf_path.len() {
                node::null()
            } else {
                Rc::clone(current)
            }
        }

        Node::Extension { path: ext_path, child } => {
            let common = common_prefix(ext_path.as_slice(), path);
            if common == ext_path.len() {
                let new_child = remove(child, &path[common..], allow_flatten);
                replace_extension_child(ext_path, new_child)
            } else {
                // Diverges inside the extension: the key is absent
                Rc::clone(current)
            }
        }

        Node::Branch { children, value } => {
            debug_assert!(!path.is_empty(), "visiting path lost its terminator");
            let index = path[0];
            if index == LEAF_TERMINATOR {
                return settle_branch(children.clone(), None, allow_flatten);
            }
            let new_child = remove(&children[index as usize], &path[1..], allow_flatten);
            let mut children = children.clone();
            children[index as usize] = new_child;
            settle_branch(children, value.clone(), allow_flatten)
        }
    }
}

/// Rebuilds an extension over an updated child, merging per the node
/// invariants: extensions chain onto extensions, absorb into leaves, and
/// vanish over null.
fn replace_extension_child(ext_path: &NibblePath, child: Rc<Node>) -> Rc<Node> {
    match &*child {
        Node::Null => node::null(),
        Node::Leaf { path, value } => node::leaf(ext_path.join(path), value.clone()),
        Node::Extension { path, child: grandchild } => {
            node::extension(ext_path.join(path), Rc::clone(grandchild))
        }
        Node::Branch { .. } => node::extension(ext_path.clone(), child),
    }
}

/// Rebuilds a branch after a child or value was replaced, flattening it
/// when fewer than two live references remain.
fn settle_branch(
    children: [Rc<Node>; 16],
    value: Option<Vec<u8>>,
    allow_flatten: bool,
) -> Rc<Node> {
    if !allow_flatten {
        return node::branch(children, value);
    }

    let live: Vec<usize> = children
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_null())
        .map(|(i, _)| i)
        .collect();

    if live.is_empty() {
        return match value {
            Some(v) => node::leaf(NibblePath::from_nibbles(vec![LEAF_TERMINATOR]), v),
            None => node::null(),
        };
    }

    if live.len() == 1 && value.is_none() {
        let index = live[0] as u8;
        let only = &children[live[0]];
        return match &**only {
            Node::Leaf { path, value } => {
                node::leaf(NibblePath::prepend(index, path), value.clone())
            }
            Node::Extension { path, child } => {
                node::extension(NibblePath::prepend(index, path), Rc::clone(child))
            }
            Node::Branch { .. } => {
                node::extension(NibblePath::from_nibbles(vec![index]), Rc::clone(only))
            }
            Node::Null => unreachable!("live child cannot be null"),
        };
    }

    node::branch(children, value)
}
