use core::borrow::Borrow;
use core::iter::FusedIterator;
use core::marker::PhantomData;

use tracing::{debug, trace};

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Children, InternalNode, LeafNode, Node, SearchResult};
use super::policy::{Removal, Removed, ValuePolicy};
use crate::Order;

/// The B+Tree engine shared by every index flavor.
///
/// All nodes live in `nodes`; parent, child and leaf-chain links are handles into it. The
/// tree always has a root: an empty tree is a root leaf without keys.
pub(crate) struct RawBPlusTree<K, P: ValuePolicy> {
    /// Arena storing all tree nodes.
    nodes: Arena<Node<K, P::Slot>>,
    /// Handle to the root node.
    root: Handle,
    /// Maximum number of keys per node.
    order: Order,
    /// Number of distinct keys.
    key_count: usize,
    /// Number of stored values (sum of slot counts).
    len: usize,
    _policy: PhantomData<P>,
}

/// In-order iterator over the leaf chain.
pub(crate) struct Entries<'a, K, S> {
    nodes: &'a Arena<Node<K, S>>,
    leaf: Option<Handle>,
    index: usize,
}

/// Leaf-chain walk over keys in `[min, max]`.
pub(crate) struct Range<'a, 'q, K, S, Q: ?Sized> {
    entries: Entries<'a, K, S>,
    /// `None` once a key beyond the upper bound was seen (or the range is empty).
    max: Option<&'q Q>,
}

impl<K, P: ValuePolicy> RawBPlusTree<K, P> {
    /// Creates an empty tree: a single root leaf.
    pub(crate) fn new(order: Order) -> Self {
        let mut nodes = Arena::new();
        let root = nodes.alloc(Node::Leaf(LeafNode::new()));
        Self {
            nodes,
            root,
            order,
            key_count: 0,
            len: 0,
            _policy: PhantomData,
        }
    }

    pub(crate) const fn order(&self) -> Order {
        self.order
    }

    /// Number of stored values.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Number of distinct keys.
    pub(crate) const fn key_count(&self) -> usize {
        self.key_count
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// Drops every entry and starts over from an empty root leaf.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = self.nodes.alloc(Node::Leaf(LeafNode::new()));
        self.key_count = 0;
        self.len = 0;
    }

    pub(crate) fn root(&self) -> Handle {
        self.root
    }

    pub(crate) fn node(&self, handle: Handle) -> &Node<K, P::Slot> {
        self.nodes.get(handle)
    }

    /// Number of live nodes in the arena.
    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of levels, counting the leaves.
    pub(crate) fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;
        while let Node::Internal(internal) = self.nodes.get(current) {
            current = internal.child(0);
            height += 1;
        }
        height
    }

    /// Follows the first (or last) child down to a leaf.
    fn edge_leaf(&self, last: bool) -> Handle {
        let mut current = self.root;
        while let Node::Internal(internal) = self.nodes.get(current) {
            let index = if last { internal.child_count() - 1 } else { 0 };
            current = internal.child(index);
        }
        current
    }

    /// Head of the leaf chain.
    pub(crate) fn first_leaf(&self) -> Handle {
        self.edge_leaf(false)
    }

    pub(crate) fn first(&self) -> Option<(&K, &P::Slot)> {
        let leaf = self.nodes.get(self.first_leaf()).as_leaf();
        (leaf.key_count() > 0).then(|| (leaf.key(0), leaf.slot(0)))
    }

    pub(crate) fn last(&self) -> Option<(&K, &P::Slot)> {
        let leaf = self.nodes.get(self.edge_leaf(true)).as_leaf();
        let count = leaf.key_count();
        (count > 0).then(|| (leaf.key(count - 1), leaf.slot(count - 1)))
    }

    /// Iterates every entry by walking the leaf chain from its head.
    pub(crate) fn iter(&self) -> Entries<'_, K, P::Slot> {
        Entries {
            nodes: &self.nodes,
            leaf: Some(self.first_leaf()),
            index: 0,
        }
    }

    /// Re-points every child of `handle` at it after children moved in.
    fn adopt_children(&mut self, handle: Handle) {
        let children = Children::from_slice(self.nodes.get(handle).as_internal().children());
        for child in children {
            self.nodes.get_mut(child).set_parent(Some(handle));
        }
    }

    /// Position of `child` in `parent` plus its left and right siblings.
    fn siblings(&self, parent: Handle, child: Handle) -> (usize, Option<Handle>, Option<Handle>) {
        let parent = self.nodes.get(parent).as_internal();
        let index = parent.position_of(child);
        let left = index.checked_sub(1).map(|i| parent.child(i));
        let right = (index + 1 < parent.child_count()).then(|| parent.child(index + 1));
        (index, left, right)
    }
}

impl<K: Ord, P: ValuePolicy> RawBPlusTree<K, P> {
    /// Descends from the root to the leaf that owns `key`.
    pub(crate) fn find_leaf<Q>(&self, key: &Q) -> Handle
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root;
        while let Node::Internal(internal) = self.nodes.get(current) {
            current = internal.child(internal.search_child(key));
        }
        current
    }

    /// Searches for a key and returns the leaf handle and index if found.
    fn search<Q>(&self, key: &Q) -> Option<(Handle, usize)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let leaf_handle = self.find_leaf(key);
        match self.nodes.get(leaf_handle).as_leaf().search(key) {
            SearchResult::Found(idx) => Some((leaf_handle, idx)),
            SearchResult::NotFound(_) => None,
        }
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&P::Slot>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let (leaf_handle, idx) = self.search(key)?;
        Some(self.nodes.get(leaf_handle).as_leaf().slot(idx))
    }

    pub(crate) fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut P::Slot>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let (leaf_handle, idx) = self.search(key)?;
        Some(self.nodes.get_mut(leaf_handle).as_leaf_mut().slot_mut(idx))
    }

    /// Iterates the entries whose keys lie in `[min, max]`, in ascending key order.
    /// Empty without descending when `min > max`.
    pub(crate) fn range<'q, Q>(&self, min: &Q, max: &'q Q) -> Range<'_, 'q, K, P::Slot, Q>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        if min > max {
            return Range {
                entries: Entries {
                    nodes: &self.nodes,
                    leaf: None,
                    index: 0,
                },
                max: None,
            };
        }

        let leaf_handle = self.find_leaf(min);
        let index = self.nodes.get(leaf_handle).as_leaf().lower_bound(min);
        Range {
            entries: Entries {
                nodes: &self.nodes,
                leaf: Some(leaf_handle),
                index,
            },
            max: Some(max),
        }
    }
}

impl<K: Ord + Clone, P: ValuePolicy> RawBPlusTree<K, P> {
    /// Inserts a value under `key`. An existing key's slot absorbs the value according to the
    /// policy; whatever it displaces is returned.
    pub(crate) fn insert(&mut self, key: K, value: P::Value) -> Option<P::Value> {
        let leaf_handle = self.find_leaf(&key);
        let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();
        match leaf.search(&key) {
            SearchResult::Found(idx) => {
                let displaced = P::absorb(leaf.slot_mut(idx), value);
                if displaced.is_none() {
                    self.len += 1;
                }
                displaced
            }
            SearchResult::NotFound(idx) => {
                leaf.insert(idx, key, P::create(value));
                self.len += 1;
                self.key_count += 1;

                if self.nodes.get(leaf_handle).is_overflow(self.order) {
                    self.split_leaf(leaf_handle);
                }
                None
            }
        }
    }

    /// Splits an overflowing leaf and pushes a copy of the new right leaf's first key up.
    fn split_leaf(&mut self, leaf_handle: Handle) {
        let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();
        let mut right_leaf = leaf.split_off(self.order.leaf_split_point());
        let old_next = leaf.next();

        let separator = right_leaf.key(0).clone();
        right_leaf.set_prev(Some(leaf_handle));
        right_leaf.set_next(old_next);
        let right_handle = self.nodes.alloc(Node::Leaf(right_leaf));

        // Fix up the chain around the new leaf
        self.nodes.get_mut(leaf_handle).as_leaf_mut().set_next(Some(right_handle));
        if let Some(old_next) = old_next {
            self.nodes.get_mut(old_next).as_leaf_mut().set_prev(Some(right_handle));
        }

        trace!(left = ?leaf_handle, right = ?right_handle, "split leaf");
        self.insert_into_parent(leaf_handle, separator, right_handle);
    }

    /// Hooks `right` into the tree next to `left`, splitting ancestors that overflow and
    /// growing a new root when `left` was the root.
    fn insert_into_parent(&mut self, mut left: Handle, mut separator: K, mut right: Handle) {
        loop {
            let Some(parent_handle) = self.nodes.get(left).parent() else {
                let root = self.nodes.alloc(Node::Internal(InternalNode::new_root(left, separator, right)));
                self.nodes.get_mut(left).set_parent(Some(root));
                self.nodes.get_mut(right).set_parent(Some(root));
                self.root = root;
                debug!(height = self.height(), "grew a new root");
                return;
            };

            let parent = self.nodes.get_mut(parent_handle).as_internal_mut();
            let index = parent.position_of(left);
            parent.insert_child(index, separator, right);
            self.nodes.get_mut(right).set_parent(Some(parent_handle));

            if !self.nodes.get(parent_handle).is_overflow(self.order) {
                return;
            }

            // Split the parent; its median moves up rather than being copied.
            let mid = self.order.internal_split_point();
            let (median, sibling) = self.nodes.get_mut(parent_handle).as_internal_mut().split(mid);
            let sibling_handle = self.nodes.alloc(Node::Internal(sibling));
            self.adopt_children(sibling_handle);
            trace!(left = ?parent_handle, right = ?sibling_handle, "split internal node");

            left = parent_handle;
            separator = median;
            right = sibling_handle;
        }
    }

    /// Locates `key` and lets `select` decide what to take out of its slot.
    ///
    /// Nothing changes when the key is missing or `select` returns [`Removal::Absent`]. On
    /// [`Removal::Retained`] the selector removed exactly one value and the key stays. On
    /// [`Removal::Emptied`] the entry is removed and the leaf rebalanced.
    pub(crate) fn remove_with<Q, R>(
        &mut self,
        key: &Q,
        select: impl FnOnce(&mut P::Slot) -> Removal<R>,
    ) -> Option<Removed<K, P::Slot, R>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let leaf_handle = self.find_leaf(key);
        let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();
        let SearchResult::Found(idx) = leaf.search(key) else {
            return None;
        };

        match select(leaf.slot_mut(idx)) {
            Removal::Absent => None,
            Removal::Retained(removed) => {
                self.len -= 1;
                Some(Removed::Retained(removed))
            }
            Removal::Emptied => {
                let (removed_key, slot) = leaf.remove(idx);
                self.len -= P::count(&slot);
                self.key_count -= 1;

                // A root leaf may shrink to nothing; it is never deficient.
                if self.nodes.get(leaf_handle).is_deficient(self.order) {
                    self.resolve_leaf_underflow(leaf_handle);
                }
                Some(Removed::Entry(removed_key, slot))
            }
        }
    }

    /// Borrow right, borrow left, merge right, merge left - in that order.
    fn resolve_leaf_underflow(&mut self, leaf_handle: Handle) {
        let order = self.order;
        let parent_handle = self.nodes.get(leaf_handle).parent().expect("deficient leaf without a parent");
        let (index, left, right) = self.siblings(parent_handle, leaf_handle);

        if let Some(right) = right
            && self.nodes.get(right).is_leaf()
            && self.nodes.get(right).can_lend(order)
        {
            self.borrow_from_right_leaf(leaf_handle, right, parent_handle, index);
        } else if let Some(left) = left
            && self.nodes.get(left).is_leaf()
            && self.nodes.get(left).can_lend(order)
        {
            self.borrow_from_left_leaf(leaf_handle, left, parent_handle, index);
        } else if let Some(right) = right {
            self.merge_leaves(leaf_handle, right, parent_handle, index);
        } else if let Some(left) = left {
            self.merge_leaves(left, leaf_handle, parent_handle, index - 1);
        } else {
            unreachable!("non-root leaf without siblings");
        }
    }

    /// Moves the right sibling's first entry to the tail of this leaf.
    fn borrow_from_right_leaf(&mut self, leaf_handle: Handle, right_handle: Handle, parent_handle: Handle, index: usize) {
        let right = self.nodes.get_mut(right_handle).as_leaf_mut();
        let (key, slot) = right.pop_front().expect("lending leaf is empty");
        let new_first = right.key(0).clone();

        self.nodes.get_mut(leaf_handle).as_leaf_mut().push(key, slot);
        self.nodes.get_mut(parent_handle).as_internal_mut().replace_key(index, new_first);
        trace!(leaf = ?leaf_handle, lender = ?right_handle, "borrowed from right leaf");
    }

    /// Moves the left sibling's last entry to the head of this leaf.
    fn borrow_from_left_leaf(&mut self, leaf_handle: Handle, left_handle: Handle, parent_handle: Handle, index: usize) {
        let (key, slot) = self.nodes.get_mut(left_handle).as_leaf_mut().pop().expect("lending leaf is empty");
        let new_first = key.clone();

        self.nodes.get_mut(leaf_handle).as_leaf_mut().push_front(key, slot);
        self.nodes.get_mut(parent_handle).as_internal_mut().replace_key(index - 1, new_first);
        trace!(leaf = ?leaf_handle, lender = ?left_handle, "borrowed from left leaf");
    }

    /// Absorbs `right_handle` into `left_handle`, unlinks it from the chain, and drops the
    /// separator at `separator_idx` (and the child after it) from the parent.
    fn merge_leaves(&mut self, left_handle: Handle, right_handle: Handle, parent_handle: Handle, separator_idx: usize) {
        let right = self.nodes.take(right_handle).into_leaf();
        let left = self.nodes.get_mut(left_handle).as_leaf_mut();
        left.merge_with_right(right);

        if let Some(next) = left.next() {
            self.nodes.get_mut(next).as_leaf_mut().set_prev(Some(left_handle));
        }

        let (_, removed) = self.nodes.get_mut(parent_handle).as_internal_mut().remove_child(separator_idx);
        debug_assert_eq!(removed, right_handle, "merged leaf was not the separator's right child");
        trace!(survivor = ?left_handle, absorbed = ?right_handle, "merged leaves");

        self.rebalance_after_merge(parent_handle);
    }

    /// A parent that lost a key and a child is either the root (check for collapse) or an
    /// internal node that may now be deficient.
    fn rebalance_after_merge(&mut self, parent_handle: Handle) {
        let parent = self.nodes.get(parent_handle);
        if parent.parent().is_none() {
            self.collapse_root();
        } else if parent.is_deficient(self.order) {
            self.resolve_internal_underflow(parent_handle);
        }
    }

    /// Replaces an internal root that has no keys left with its only child.
    fn collapse_root(&mut self) {
        let Some(child) = self.nodes.get(self.root).as_internal().sole_child() else {
            return;
        };

        self.nodes.free(self.root);
        self.nodes.get_mut(child).set_parent(None);
        self.root = child;
        debug!(height = self.height(), "collapsed root");
    }

    /// Mirrors the leaf case, moving a key and a child at a time.
    fn resolve_internal_underflow(&mut self, node_handle: Handle) {
        let order = self.order;
        let parent_handle = self.nodes.get(node_handle).parent().expect("deficient node without a parent");
        let (index, left, right) = self.siblings(parent_handle, node_handle);

        if let Some(right) = right
            && !self.nodes.get(right).is_leaf()
            && self.nodes.get(right).can_lend(order)
        {
            self.borrow_from_right_internal(node_handle, right, parent_handle, index);
        } else if let Some(left) = left
            && !self.nodes.get(left).is_leaf()
            && self.nodes.get(left).can_lend(order)
        {
            self.borrow_from_left_internal(node_handle, left, parent_handle, index);
        } else if let Some(right) = right {
            self.merge_internals(node_handle, right, parent_handle, index);
        } else if let Some(left) = left {
            self.merge_internals(left, node_handle, parent_handle, index - 1);
        } else {
            unreachable!("non-root internal node without siblings");
        }
    }

    /// The parent separator comes down as this node's last key, the right sibling's first
    /// child moves over, and the right sibling's first key goes up in its place.
    fn borrow_from_right_internal(
        &mut self,
        node_handle: Handle,
        right_handle: Handle,
        parent_handle: Handle,
        index: usize,
    ) {
        let (child, right_key) = self
            .nodes
            .get_mut(right_handle)
            .as_internal_mut()
            .pop_child_front()
            .expect("lending node is empty");
        let separator = self.nodes.get_mut(parent_handle).as_internal_mut().replace_key(index, right_key);

        self.nodes.get_mut(node_handle).as_internal_mut().push_child(separator, child);
        self.nodes.get_mut(child).set_parent(Some(node_handle));
        trace!(node = ?node_handle, lender = ?right_handle, "borrowed from right internal node");
    }

    /// Symmetric to [`Self::borrow_from_right_internal`], prepending.
    fn borrow_from_left_internal(
        &mut self,
        node_handle: Handle,
        left_handle: Handle,
        parent_handle: Handle,
        index: usize,
    ) {
        let (left_key, child) =
            self.nodes.get_mut(left_handle).as_internal_mut().pop_child().expect("lending node is empty");
        let separator = self.nodes.get_mut(parent_handle).as_internal_mut().replace_key(index - 1, left_key);

        self.nodes.get_mut(node_handle).as_internal_mut().push_child_front(child, separator);
        self.nodes.get_mut(child).set_parent(Some(node_handle));
        trace!(node = ?node_handle, lender = ?left_handle, "borrowed from left internal node");
    }

    /// Absorbs `right_handle` into `left_handle` with the parent separator pulled down.
    fn merge_internals(&mut self, left_handle: Handle, right_handle: Handle, parent_handle: Handle, separator_idx: usize) {
        let right = self.nodes.take(right_handle).into_internal();
        let (separator, removed) = self.nodes.get_mut(parent_handle).as_internal_mut().remove_child(separator_idx);
        debug_assert_eq!(removed, right_handle, "merged node was not the separator's right child");

        self.nodes.get_mut(left_handle).as_internal_mut().merge_with_right(separator, right);
        self.adopt_children(left_handle);
        trace!(survivor = ?left_handle, absorbed = ?right_handle, "merged internal nodes");

        self.rebalance_after_merge(parent_handle);
    }
}

impl<'a, K, S> Iterator for Entries<'a, K, S> {
    type Item = (&'a K, &'a S);

    fn next(&mut self) -> Option<Self::Item> {
        let nodes = self.nodes;
        loop {
            let leaf = nodes.get(self.leaf?).as_leaf();
            if self.index < leaf.key_count() {
                let index = self.index;
                self.index += 1;
                return Some((leaf.key(index), leaf.slot(index)));
            }

            // Move to next leaf
            self.leaf = leaf.next();
            self.index = 0;
        }
    }
}

impl<K, S> FusedIterator for Entries<'_, K, S> {}

impl<K, S> Clone for Entries<'_, K, S> {
    fn clone(&self) -> Self {
        Entries {
            nodes: self.nodes,
            leaf: self.leaf,
            index: self.index,
        }
    }
}

impl<'a, K, S, Q> Iterator for Range<'a, '_, K, S, Q>
where
    K: Borrow<Q>,
    Q: ?Sized + Ord,
{
    type Item = (&'a K, &'a S);

    fn next(&mut self) -> Option<Self::Item> {
        let max = self.max?;
        let (key, slot) = self.entries.next()?;
        if key.borrow() > max {
            self.max = None;
            return None;
        }
        Some((key, slot))
    }
}

impl<K, S, Q> FusedIterator for Range<'_, '_, K, S, Q>
where
    K: Borrow<Q>,
    Q: ?Sized + Ord,
{
}
