//! A B+Tree index holding exactly one value per key.

use core::borrow::Borrow;
use core::fmt;
use core::iter::FusedIterator;

use tracing::debug;

use crate::raw::{Entries, RawBPlusTree, Removal, Removed, Unique};
use crate::{IndexError, Order, Shape};

/// An ordered index mapping each key to a single value, backed by a B+Tree of a chosen order.
///
/// Every node holds at most `order` keys; every node except the root holds at least half of
/// that. Entries live only in the leaves, which are chained in ascending key order.
///
/// Inserting a key that is already present replaces its value, just like
/// [`BTreeMap::insert`](alloc::collections::BTreeMap::insert).
///
/// # Examples
///
/// ```
/// use bplus_index::UniqueIndex;
///
/// let mut products = UniqueIndex::new(3).unwrap();
/// products.insert(30, "Kettle");
/// products.insert(10, "Mug");
/// products.insert(20, "Teapot");
///
/// assert_eq!(products.search(&20), Some(&"Teapot"));
/// assert_eq!(products.insert(20, "Infuser"), Some("Teapot"));
/// assert!(products.delete(&10));
///
/// let keys: Vec<_> = products.iter().map(|(k, _)| *k).collect();
/// assert_eq!(keys, [20, 30]);
/// ```
pub struct UniqueIndex<K, V> {
    raw: RawBPlusTree<K, Unique<V>>,
}

/// An iterator over the entries of a `UniqueIndex`, in ascending key order.
///
/// This `struct` is created by the [`iter`] method on [`UniqueIndex`].
///
/// [`iter`]: UniqueIndex::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V> {
    entries: Entries<'a, K, V>,
    remaining: usize,
}

impl<K, V> UniqueIndex<K, V> {
    /// Makes a new, empty `UniqueIndex` whose nodes hold at most `order` keys.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidOrder`] if `order < 2`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::{IndexError, UniqueIndex};
    ///
    /// let index: UniqueIndex<u32, &str> = UniqueIndex::new(4).unwrap();
    /// assert!(index.is_empty());
    ///
    /// let err = UniqueIndex::<u32, &str>::new(1).unwrap_err();
    /// assert_eq!(err, IndexError::InvalidOrder { order: 1 });
    /// ```
    pub fn new(order: usize) -> Result<Self, IndexError> {
        Ok(Self::with_order(Order::new(order)?))
    }

    /// Makes a new, empty `UniqueIndex` from an already validated [`Order`].
    #[must_use]
    pub fn with_order(order: Order) -> Self {
        debug!(%order, "created unique index");
        Self {
            raw: RawBPlusTree::new(order),
        }
    }

    /// Returns the order this index was built with.
    #[must_use]
    pub const fn order(&self) -> Order {
        self.raw.order()
    }

    /// Returns the number of entries in the index.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::UniqueIndex;
    ///
    /// let mut index = UniqueIndex::new(2).unwrap();
    /// assert_eq!(index.len(), 0);
    /// index.insert(1, "a");
    /// index.insert(1, "b");
    /// assert_eq!(index.len(), 1);
    /// ```
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the index contains no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Clears the index, removing all entries. The order is kept.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Gets an iterator over the entries of the index, sorted by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::UniqueIndex;
    ///
    /// let mut index = UniqueIndex::new(2).unwrap();
    /// index.insert(3, "c");
    /// index.insert(1, "a");
    /// index.insert(2, "b");
    ///
    /// let entries: Vec<_> = index.iter().collect();
    /// assert_eq!(entries, [(&1, &"a"), (&2, &"b"), (&3, &"c")]);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(1) per item; the walk follows the leaf chain.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            entries: self.raw.iter(),
            remaining: self.raw.len(),
        }
    }

    /// Returns the entry with the smallest key.
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.raw.first()
    }

    /// Returns the entry with the largest key.
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.raw.last()
    }

    /// Returns a snapshot of the node structure, keys only.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::{Shape, UniqueIndex};
    ///
    /// let mut index = UniqueIndex::new(2).unwrap();
    /// for key in [10, 20, 30] {
    ///     index.insert(key, ());
    /// }
    /// assert_eq!(
    ///     index.shape(),
    ///     Shape::Internal {
    ///         keys: vec![30],
    ///         children: vec![Shape::Leaf(vec![10, 20]), Shape::Leaf(vec![30])],
    ///     }
    /// );
    /// ```
    #[must_use]
    pub fn shape(&self) -> Shape<K>
    where
        K: Clone,
    {
        self.raw.shape()
    }
}

impl<K: Ord, V> UniqueIndex<K, V> {
    /// Returns a reference to the value stored under the key.
    ///
    /// The key may be any borrowed form of the index's key type, but the ordering
    /// on the borrowed form *must* match the ordering on the key type.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::UniqueIndex;
    ///
    /// let mut index = UniqueIndex::new(2).unwrap();
    /// index.insert(String::from("sku-1"), 5);
    /// assert_eq!(index.search("sku-1"), Some(&5));
    /// assert_eq!(index.search("sku-2"), None);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn search<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.get(key)
    }

    /// Returns a mutable reference to the value stored under the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::UniqueIndex;
    ///
    /// let mut stock = UniqueIndex::new(2).unwrap();
    /// stock.insert("sku-1", 5);
    /// if let Some(count) = stock.search_mut(&"sku-1") {
    ///     *count -= 1;
    /// }
    /// assert_eq!(stock.search(&"sku-1"), Some(&4));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn search_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.get_mut(key)
    }

    /// Returns `true` if the index holds a value for the key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.get(key).is_some()
    }

    /// Walks the whole tree and checks every structural invariant.
    ///
    /// # Panics
    ///
    /// Panics with the list of violations if the tree is malformed. This never happens through
    /// the public API; it exists for tests and debugging.
    pub fn validate(&self) {
        self.raw.validate();
    }
}

impl<K: Ord + Clone, V> UniqueIndex<K, V> {
    /// Inserts a key-value pair, splitting nodes on the way back up as needed.
    ///
    /// If the key was not present, `None` is returned. If it was, the value is replaced and the
    /// old value returned; the tree structure is left as it was.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::UniqueIndex;
    ///
    /// let mut index = UniqueIndex::new(2).unwrap();
    /// assert_eq!(index.insert(37, "a"), None);
    /// assert_eq!(index.insert(37, "b"), Some("a"));
    /// assert_eq!(index.search(&37), Some(&"b"));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.raw.insert(key, value)
    }

    /// Deletes the entry for the key, rebalancing as needed.
    ///
    /// Returns `false`, leaving the index untouched, if the key was not present.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::UniqueIndex;
    ///
    /// let mut index = UniqueIndex::new(2).unwrap();
    /// index.insert(1, "a");
    /// assert!(index.delete(&1));
    /// assert!(!index.delete(&1));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.remove(key).is_some()
    }

    /// Removes the entry for the key and returns its value.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::UniqueIndex;
    ///
    /// let mut index = UniqueIndex::new(2).unwrap();
    /// index.insert(1, "a");
    /// assert_eq!(index.remove(&1), Some("a"));
    /// assert_eq!(index.remove(&1), None);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match self.raw.remove_with(key, |_| Removal::<V>::Emptied)? {
            Removed::Entry(_, value) | Removed::Retained(value) => Some(value),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for UniqueIndex<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> Default for UniqueIndex<K, V> {
    /// Creates an empty `UniqueIndex` with the default [`Order`].
    fn default() -> Self {
        Self::with_order(Order::default())
    }
}

impl<K: Ord + Clone, V> FromIterator<(K, V)> for UniqueIndex<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut index = Self::default();
        index.extend(iter);
        index
    }
}

impl<K: Ord + Clone, V> Extend<(K, V)> for UniqueIndex<K, V> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a UniqueIndex<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.next()?;
        self.remaining -= 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            entries: self.entries.clone(),
            remaining: self.remaining,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}
