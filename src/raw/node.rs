use core::borrow::Borrow;

use smallvec::SmallVec;

use super::handle::Handle;
use crate::Order;

/// Keys stored inline before a node spills to the heap. Orders below this size never allocate
/// per node beyond the arena slot itself.
pub(crate) const INLINE_KEYS: usize = 8;
pub(crate) const INLINE_CHILDREN: usize = INLINE_KEYS + 1;

pub(crate) type Keys<K> = SmallVec<[K; INLINE_KEYS]>;
pub(crate) type Slots<S> = SmallVec<[S; INLINE_KEYS]>;
pub(crate) type Children = SmallVec<[Handle; INLINE_CHILDREN]>;

#[allow(clippy::large_enum_variant)]
pub(crate) enum Node<K, S> {
    Internal(InternalNode<K>),
    Leaf(LeafNode<K, S>),
}

// B+Tree: internal nodes store separator keys and child handles.
// Child `i` holds keys `< keys[i]`, the last child holds keys `>= keys[last]`.
pub(crate) struct InternalNode<K> {
    parent: Option<Handle>,
    keys: Keys<K>,
    children: Children,
}

// B+Tree: leaf nodes store keys and their policy slots, chained in key order.
pub(crate) struct LeafNode<K, S> {
    parent: Option<Handle>,
    prev: Option<Handle>,
    next: Option<Handle>,
    keys: Keys<K>,
    slots: Slots<S>,
}

/// Result of searching for a key in a leaf.
pub(crate) enum SearchResult {
    /// Key was found at the given index.
    Found(usize),
    /// Key was not found; index is where it would be inserted.
    NotFound(usize),
}

impl<K, S> Node<K, S> {
    /// Returns true if this is a leaf node.
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Returns the leaf node, panicking if this is not a leaf.
    pub(crate) fn as_leaf(&self) -> &LeafNode<K, S> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the leaf node mutably, panicking if this is not a leaf.
    pub(crate) fn as_leaf_mut(&mut self) -> &mut LeafNode<K, S> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the internal node, panicking if this is not internal.
    pub(crate) fn as_internal(&self) -> &InternalNode<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    /// Returns the internal node mutably, panicking if this is not internal.
    pub(crate) fn as_internal_mut(&mut self) -> &mut InternalNode<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    pub(crate) fn into_leaf(self) -> LeafNode<K, S> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    pub(crate) fn into_internal(self) -> InternalNode<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    pub(crate) fn keys(&self) -> &[K] {
        match self {
            Node::Internal(internal) => internal.keys(),
            Node::Leaf(leaf) => leaf.keys(),
        }
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys().len()
    }

    pub(crate) fn parent(&self) -> Option<Handle> {
        match self {
            Node::Internal(internal) => internal.parent,
            Node::Leaf(leaf) => leaf.parent,
        }
    }

    pub(crate) fn set_parent(&mut self, parent: Option<Handle>) {
        match self {
            Node::Internal(internal) => internal.parent = parent,
            Node::Leaf(leaf) => leaf.parent = parent,
        }
    }

    /// Smallest key count this node may hold when it is not the root.
    pub(crate) fn min_keys(&self, order: Order) -> usize {
        match self {
            Node::Internal(_) => order.min_internal_keys(),
            Node::Leaf(_) => order.min_leaf_keys(),
        }
    }

    pub(crate) fn is_overflow(&self, order: Order) -> bool {
        self.key_count() > order.get()
    }

    /// The root is never deficient.
    pub(crate) fn is_deficient(&self, order: Order) -> bool {
        self.parent().is_some() && self.key_count() < self.min_keys(order)
    }

    /// The root never lends.
    pub(crate) fn can_lend(&self, order: Order) -> bool {
        self.parent().is_some() && self.key_count() > self.min_keys(order)
    }
}

impl<K> InternalNode<K> {
    /// Creates the two-child node that becomes a new root after the old root split.
    pub(crate) fn new_root(left: Handle, separator: K, right: Handle) -> Self {
        let mut keys = Keys::new();
        keys.push(separator);
        let mut children = Children::new();
        children.push(left);
        children.push(right);
        Self {
            parent: None,
            keys,
            children,
        }
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub(crate) fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    #[inline]
    pub(crate) fn child(&self, index: usize) -> Handle {
        self.children[index]
    }

    pub(crate) fn children(&self) -> &[Handle] {
        &self.children
    }

    /// Index of the child to descend into for `key`: the position of the first separator
    /// strictly greater than `key`, or the last child if there is none.
    #[inline]
    pub(crate) fn search_child<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.keys.partition_point(|k| k.borrow() <= key)
    }

    /// Position of `child` among this node's children.
    pub(crate) fn position_of(&self, child: Handle) -> usize {
        self.children
            .iter()
            .position(|&c| c == child)
            .expect("child handle missing from its parent")
    }

    /// Inserts `key` at `index` and `child` right after it.
    pub(crate) fn insert_child(&mut self, index: usize, key: K, child: Handle) {
        self.keys.insert(index, key);
        self.children.insert(index + 1, child);
    }

    /// Removes the key at `index` together with the child to its right.
    pub(crate) fn remove_child(&mut self, index: usize) -> (K, Handle) {
        let key = self.keys.remove(index);
        let child = self.children.remove(index + 1);
        (key, child)
    }

    /// Replaces the key at `index`, returning the previous one.
    pub(crate) fn replace_key(&mut self, index: usize, key: K) -> K {
        core::mem::replace(&mut self.keys[index], key)
    }

    /// Appends a key and the child to its right.
    pub(crate) fn push_child(&mut self, key: K, child: Handle) {
        self.keys.push(key);
        self.children.push(child);
    }

    /// Prepends a child and the key to its right.
    pub(crate) fn push_child_front(&mut self, child: Handle, key: K) {
        self.keys.insert(0, key);
        self.children.insert(0, child);
    }

    /// Pops the last key and the last child.
    pub(crate) fn pop_child(&mut self) -> Option<(K, Handle)> {
        let key = self.keys.pop()?;
        let child = self.children.pop()?;
        Some((key, child))
    }

    /// Pops the first child and the first key.
    pub(crate) fn pop_child_front(&mut self) -> Option<(Handle, K)> {
        if self.keys.is_empty() {
            return None;
        }
        let child = self.children.remove(0);
        let key = self.keys.remove(0);
        Some((child, key))
    }

    /// Splits off `keys[mid + 1..]` and `children[mid + 1..]` into a new right sibling.
    /// Returns the separator `keys[mid]`, which belongs to neither half.
    pub(crate) fn split(&mut self, mid: usize) -> (K, InternalNode<K>) {
        let right = InternalNode {
            parent: self.parent,
            keys: self.keys.drain(mid + 1..).collect(),
            children: self.children.drain(mid + 1..).collect(),
        };
        let separator = self.keys.pop().expect("split of an internal node without a median");
        (separator, right)
    }

    /// Absorbs a right sibling, with the parent's separator pulled down between the two.
    pub(crate) fn merge_with_right(&mut self, separator: K, mut right: InternalNode<K>) {
        self.keys.push(separator);
        self.keys.append(&mut right.keys);
        self.children.append(&mut right.children);
    }

    /// Detaches the only child of an emptied node.
    pub(crate) fn sole_child(&self) -> Option<Handle> {
        match (self.keys.is_empty(), self.children.as_slice()) {
            (true, [only]) => Some(*only),
            _ => None,
        }
    }
}

impl<K, S> LeafNode<K, S> {
    /// Creates an empty, unlinked leaf.
    pub(crate) fn new() -> Self {
        Self {
            parent: None,
            prev: None,
            next: None,
            keys: Keys::new(),
            slots: Slots::new(),
        }
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn prev(&self) -> Option<Handle> {
        self.prev
    }

    pub(crate) fn set_prev(&mut self, prev: Option<Handle>) {
        self.prev = prev;
    }

    pub(crate) fn next(&self) -> Option<Handle> {
        self.next
    }

    pub(crate) fn set_next(&mut self, next: Option<Handle>) {
        self.next = next;
    }

    #[inline]
    pub(crate) fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    #[inline]
    pub(crate) fn slot(&self, index: usize) -> &S {
        &self.slots[index]
    }

    #[inline]
    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut S {
        &mut self.slots[index]
    }

    pub(crate) fn slots(&self) -> &[S] {
        &self.slots
    }

    /// Searches for a key in this leaf.
    #[inline]
    pub(crate) fn search<Q>(&self, key: &Q) -> SearchResult
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match self.keys.binary_search_by(|k| k.borrow().cmp(key)) {
            Ok(idx) => SearchResult::Found(idx),
            Err(idx) => SearchResult::NotFound(idx),
        }
    }

    /// Index of the first key `>= key`.
    pub(crate) fn lower_bound<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.keys.partition_point(|k| k.borrow() < key)
    }

    pub(crate) fn insert(&mut self, index: usize, key: K, slot: S) {
        self.keys.insert(index, key);
        self.slots.insert(index, slot);
    }

    pub(crate) fn remove(&mut self, index: usize) -> (K, S) {
        let key = self.keys.remove(index);
        let slot = self.slots.remove(index);
        (key, slot)
    }

    pub(crate) fn push(&mut self, key: K, slot: S) {
        self.keys.push(key);
        self.slots.push(slot);
    }

    pub(crate) fn push_front(&mut self, key: K, slot: S) {
        self.keys.insert(0, key);
        self.slots.insert(0, slot);
    }

    pub(crate) fn pop(&mut self) -> Option<(K, S)> {
        let key = self.keys.pop()?;
        let slot = self.slots.pop()?;
        Some((key, slot))
    }

    pub(crate) fn pop_front(&mut self) -> Option<(K, S)> {
        if self.keys.is_empty() {
            return None;
        }
        Some((self.keys.remove(0), self.slots.remove(0)))
    }

    /// Moves `[at..]` into a new right sibling sharing this leaf's parent. Chain links are
    /// left to the caller, which knows the new sibling's handle.
    pub(crate) fn split_off(&mut self, at: usize) -> LeafNode<K, S> {
        LeafNode {
            parent: self.parent,
            prev: None,
            next: None,
            keys: self.keys.drain(at..).collect(),
            slots: self.slots.drain(at..).collect(),
        }
    }

    /// Appends every entry of a right sibling and takes over its `next` link.
    pub(crate) fn merge_with_right(&mut self, mut right: LeafNode<K, S>) {
        self.keys.append(&mut right.keys);
        self.slots.append(&mut right.slots);
        self.next = right.next;
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn order(n: usize) -> Order {
        Order::new(n).unwrap()
    }

    fn leaf(keys: &[i32]) -> LeafNode<i32, i32> {
        let mut leaf = LeafNode::new();
        for &key in keys {
            leaf.push(key, key * 10);
        }
        leaf
    }

    #[test]
    fn predicates_exempt_the_root() {
        let root: Node<i32, i32> = Node::Leaf(leaf(&[]));
        assert!(!root.is_deficient(order(4)));
        assert!(!root.can_lend(order(4)));

        let mut child: Node<i32, i32> = Node::Leaf(leaf(&[1]));
        child.set_parent(Some(Handle::from_index(0)));
        assert!(child.is_deficient(order(4)));
        assert!(!child.can_lend(order(4)));

        let mut full: Node<i32, i32> = Node::Leaf(leaf(&[1, 2, 3, 4, 5]));
        full.set_parent(Some(Handle::from_index(0)));
        assert!(full.is_overflow(order(4)));
        assert!(full.can_lend(order(4)));
    }

    #[test]
    fn search_child_takes_first_greater_separator() {
        let h = Handle::from_index;
        let mut node = InternalNode::new_root(h(0), 10, h(1));
        node.push_child(20, h(2));

        assert_eq!(node.search_child(&5), 0);
        assert_eq!(node.search_child(&10), 1);
        assert_eq!(node.search_child(&15), 1);
        assert_eq!(node.search_child(&20), 2);
        assert_eq!(node.search_child(&99), 2);
        assert_eq!(node.position_of(h(2)), 2);
    }

    #[test]
    fn leaf_split_off_keeps_prefix() {
        let mut left = leaf(&[5, 10, 20]);
        let right = left.split_off(order(2).leaf_split_point());
        assert_eq!(left.keys(), &[5, 10]);
        assert_eq!(right.keys(), &[20]);
        assert_eq!(right.slots(), &[200]);
    }

    #[test]
    fn internal_split_moves_median_up() {
        let h = Handle::from_index;
        let mut node = InternalNode::new_root(h(0), 10, h(1));
        node.push_child(20, h(2));
        node.push_child(30, h(3));

        let (separator, right) = node.split(order(2).internal_split_point());
        assert_eq!(separator, 20);
        assert_eq!(node.keys(), &[10]);
        assert_eq!(node.children(), &[h(0), h(1)]);
        assert_eq!(right.keys(), &[30]);
        assert_eq!(right.children(), &[h(2), h(3)]);
    }

    #[test]
    fn internal_merge_pulls_separator_down() {
        let h = Handle::from_index;
        let mut left = InternalNode::new_root(h(0), 10, h(1));
        let (_, first) = left.pop_child().unwrap();
        assert_eq!(first, h(1));
        let right = InternalNode::new_root(h(2), 40, h(3));

        left.merge_with_right(30, right);
        assert_eq!(left.keys(), &[30, 40]);
        assert_eq!(left.children(), &[h(0), h(2), h(3)]);
        assert_eq!(left.sole_child(), None);
    }

    #[test]
    fn leaf_entry_moves() {
        let mut node = leaf(&[2, 4]);
        node.push_front(1, 10);
        node.push(5, 50);
        assert_eq!(node.pop_front(), Some((1, 10)));
        assert_eq!(node.pop(), Some((5, 50)));
        let keys: Vec<i32> = node.keys().to_vec();
        assert_eq!(keys, [2, 4]);
        assert_eq!(node.lower_bound(&3), 1);
        assert!(matches!(node.search(&4), SearchResult::Found(1)));
        assert!(matches!(node.search(&3), SearchResult::NotFound(1)));
    }
}
