use alloc::vec::Vec;
use core::fmt;

use crate::raw::{Handle, Node, RawBPlusTree, ValuePolicy};

/// An owned snapshot of an index's node structure, keys only.
///
/// Useful for inspecting how the tree is currently split, and printable as an indented tree:
///
/// ```
/// use bplus_index::{MultiIndex, Shape};
///
/// let mut index = MultiIndex::new(2).unwrap();
/// for price in [10, 20, 5] {
///     index.insert(price, "item");
/// }
///
/// assert_eq!(
///     index.shape(),
///     Shape::Internal {
///         keys: vec![20],
///         children: vec![Shape::Leaf(vec![5, 10]), Shape::Leaf(vec![20])],
///     }
/// );
/// assert_eq!(index.shape().to_string(), "[20]\n├── [5, 10]\n└── [20]\n");
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Shape<K> {
    /// A leaf and its keys.
    Leaf(Vec<K>),
    /// An internal node, its separator keys and its children (one more than keys).
    Internal {
        /// Separator keys.
        keys: Vec<K>,
        /// Child subtrees, left to right.
        children: Vec<Shape<K>>,
    },
}

impl<K> Shape<K> {
    /// Returns the keys held directly by this node.
    #[must_use]
    pub fn keys(&self) -> &[K] {
        match self {
            Shape::Leaf(keys) | Shape::Internal { keys, .. } => keys,
        }
    }

    /// Returns true if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Shape::Leaf(_))
    }

    /// Number of levels below and including this node.
    #[must_use]
    pub fn height(&self) -> usize {
        match self {
            Shape::Leaf(_) => 1,
            Shape::Internal { children, .. } => 1 + children.first().map_or(0, Shape::height),
        }
    }

    /// Keys of every leaf, left to right.
    #[must_use]
    pub fn leaves(&self) -> Vec<&[K]> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a [K]>) {
        match self {
            Shape::Leaf(keys) => leaves.push(keys),
            Shape::Internal { children, .. } => {
                for child in children {
                    child.collect_leaves(leaves);
                }
            }
        }
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, prefix: &str, connector: &str) -> fmt::Result
    where
        K: fmt::Debug,
    {
        writeln!(f, "{prefix}{connector}{:?}", self.keys())?;
        if let Shape::Internal { children, .. } = self {
            let indent = match connector {
                "" => alloc::string::String::from(prefix),
                "└── " => alloc::format!("{prefix}    "),
                _ => alloc::format!("{prefix}│   "),
            };
            for (i, child) in children.iter().enumerate() {
                let connector = if i + 1 == children.len() { "└── " } else { "├── " };
                child.write_tree(f, &indent, connector)?;
            }
        }
        Ok(())
    }
}

impl<K: fmt::Debug> fmt::Display for Shape<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, "", "")
    }
}

impl<K: Clone, P: ValuePolicy> RawBPlusTree<K, P> {
    /// Snapshots the structure below the root.
    pub(crate) fn shape(&self) -> Shape<K> {
        self.shape_of(self.root())
    }

    fn shape_of(&self, handle: Handle) -> Shape<K> {
        match self.node(handle) {
            Node::Leaf(leaf) => Shape::Leaf(leaf.keys().to_vec()),
            Node::Internal(internal) => Shape::Internal {
                keys: internal.keys().to_vec(),
                children: internal.children().iter().map(|&child| self.shape_of(child)).collect(),
            },
        }
    }
}
