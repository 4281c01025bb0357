use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use super::handle::Handle;
use super::node::Node;
use super::policy::ValuePolicy;
use super::raw_tree::RawBPlusTree;

/// State gathered while walking the tree top-down.
struct Walk {
    leaf_depth: Option<usize>,
    leaves: Vec<Handle>,
    visited: usize,
    keys: usize,
    values: usize,
    errors: Vec<String>,
}

impl<K: Ord, P: ValuePolicy> RawBPlusTree<K, P> {
    /// Validates all B+Tree invariants. Panics with a descriptive message if any are violated.
    ///
    /// A violation is a defect in the rebalancing code, never a caller error.
    pub(crate) fn validate(&self) {
        let mut walk = Walk {
            leaf_depth: None,
            leaves: Vec::new(),
            visited: 0,
            keys: 0,
            values: 0,
            errors: Vec::new(),
        };

        let root = self.root();
        let root_node = self.node(root);
        if root_node.parent().is_some() {
            walk.errors.push(format!("root {root:?} has a parent"));
        }
        if let Node::Internal(internal) = root_node
            && internal.key_count() == 0
        {
            walk.errors.push(format!("internal root {root:?} has no keys"));
        }

        // 1. Structure, occupancy, key ranges and parent links
        self.validate_node(root, 0, None, None, &mut walk);

        // 2. Leaf chain matches the in-order leaves
        self.validate_leaf_chain(&mut walk);

        // 3. Counters and arena bookkeeping
        if walk.keys != self.key_count() {
            walk.errors.push(format!("key_count mismatch: stored={}, actual={}", self.key_count(), walk.keys));
        }
        if walk.values != self.len() {
            walk.errors.push(format!("len mismatch: stored={}, actual={}", self.len(), walk.values));
        }
        if walk.visited != self.node_count() {
            walk.errors.push(format!(
                "arena holds {} nodes but {} are reachable from the root",
                self.node_count(),
                walk.visited
            ));
        }

        assert!(walk.errors.is_empty(), "B+Tree invariant violations:\n{}", walk.errors.join("\n"));
    }

    /// Every key in the subtree must lie in `[lower, upper)`.
    fn validate_node(&self, handle: Handle, depth: usize, lower: Option<&K>, upper: Option<&K>, walk: &mut Walk) {
        let order = self.order();
        let node = self.node(handle);
        let keys = node.keys();
        walk.visited += 1;

        for i in 1..keys.len() {
            if keys[i - 1] >= keys[i] {
                walk.errors.push(format!("keys not ascending at {handle:?}, indices {} and {i}", i - 1));
            }
        }
        if keys.iter().any(|k| lower.is_some_and(|lower| k < lower) || upper.is_some_and(|upper| k >= upper)) {
            walk.errors.push(format!("keys of {handle:?} fall outside the range set by its ancestors"));
        }
        if node.is_overflow(order) {
            walk.errors.push(format!("{handle:?} holds {} keys, order is {order}", keys.len()));
        }
        if node.parent().is_some() && keys.len() < node.min_keys(order) {
            walk.errors.push(format!(
                "{handle:?} holds {} keys, minimum is {}",
                keys.len(),
                node.min_keys(order)
            ));
        }

        match node {
            Node::Leaf(leaf) => {
                match walk.leaf_depth {
                    None => walk.leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        walk.errors.push(format!("leaf {handle:?} at depth {depth}, expected {expected}"));
                    }
                    Some(_) => {}
                }

                for (i, slot) in leaf.slots().iter().enumerate() {
                    let count = P::count(slot);
                    if count == 0 {
                        walk.errors.push(format!("empty slot at {handle:?} index {i}"));
                    }
                    walk.values += count;
                }
                walk.keys += leaf.key_count();
                walk.leaves.push(handle);
            }
            Node::Internal(internal) => {
                if internal.child_count() != internal.key_count() + 1 {
                    walk.errors.push(format!(
                        "{handle:?} has {} keys but {} children",
                        internal.key_count(),
                        internal.child_count()
                    ));
                    return;
                }

                for (i, &child) in internal.children().iter().enumerate() {
                    if self.node(child).parent() != Some(handle) {
                        walk.errors.push(format!(
                            "child {child:?} of {handle:?} points at parent {:?}",
                            self.node(child).parent()
                        ));
                    }
                    let child_lower = if i == 0 { lower } else { Some(internal.key(i - 1)) };
                    let child_upper = if i == internal.key_count() { upper } else { Some(internal.key(i)) };
                    self.validate_node(child, depth + 1, child_lower, child_upper, walk);
                }
            }
        }
    }

    fn validate_leaf_chain(&self, walk: &mut Walk) {
        let mut expected_prev = None;
        let mut current = Some(self.first_leaf());

        for (i, &expected) in walk.leaves.iter().enumerate() {
            if current != Some(expected) {
                walk.errors.push(format!("leaf chain position {i}: expected {expected:?}, got {current:?}"));
                return;
            }

            let leaf = self.node(expected).as_leaf();
            if leaf.prev() != expected_prev {
                walk.errors.push(format!(
                    "leaf {expected:?} prev is {:?}, expected {expected_prev:?}",
                    leaf.prev()
                ));
            }
            expected_prev = Some(expected);
            current = leaf.next();
        }

        if let Some(extra) = current {
            walk.errors.push(format!("leaf chain continues past the last leaf into {extra:?}"));
        }
    }
}
