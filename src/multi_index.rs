//! A B+Tree index holding an ordered list of values per key.

use alloc::vec::Vec;
use core::borrow::Borrow;
use core::fmt;
use core::iter::FusedIterator;
use core::slice;

use tracing::debug;

use crate::raw::{Entries, Multi, RawBPlusTree, Removal, Removed};
use crate::{IndexError, Order, Shape};

/// An ordered index allowing duplicate keys, backed by a B+Tree of a chosen order.
///
/// Each distinct key owns one leaf slot holding its values in insertion order; a key
/// disappears from the tree once its last value is deleted. Leaves are chained in ascending
/// key order, which makes inclusive range scans a single descent followed by a chain walk.
///
/// # Examples
///
/// ```
/// use bplus_index::MultiIndex;
///
/// let mut by_price = MultiIndex::new(2).unwrap();
/// by_price.insert(15, "p-3");
/// by_price.insert(10, "p-1");
/// by_price.insert(10, "p-2");
/// by_price.insert(40, "p-4");
///
/// assert_eq!(by_price.search_exact(&10, None), [&"p-1", &"p-2"]);
/// assert_eq!(by_price.search_exact(&10, Some(&"p-2")), [&"p-2"]);
/// assert_eq!(by_price.search_range(&10, &20), [&"p-1", &"p-2", &"p-3"]);
///
/// assert!(by_price.delete(&10, &"p-1"));
/// assert_eq!(by_price.len(), 3);
/// assert_eq!(by_price.key_count(), 3);
/// ```
pub struct MultiIndex<K, V> {
    raw: RawBPlusTree<K, Multi<V>>,
}

/// An iterator over the `(key, value)` pairs of a `MultiIndex`.
///
/// Keys come in ascending order; the values of one key come in insertion order.
///
/// This `struct` is created by the [`iter`] method on [`MultiIndex`].
///
/// [`iter`]: MultiIndex::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V> {
    entries: Entries<'a, K, Vec<V>>,
    current: Option<(&'a K, slice::Iter<'a, V>)>,
    remaining: usize,
}

impl<K, V> MultiIndex<K, V> {
    /// Makes a new, empty `MultiIndex` whose nodes hold at most `order` keys.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidOrder`] if `order < 2`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::MultiIndex;
    ///
    /// assert!(MultiIndex::<u32, u32>::new(2).is_ok());
    /// assert!(MultiIndex::<u32, u32>::new(0).is_err());
    /// ```
    pub fn new(order: usize) -> Result<Self, IndexError> {
        Ok(Self::with_order(Order::new(order)?))
    }

    /// Makes a new, empty `MultiIndex` from an already validated [`Order`].
    #[must_use]
    pub fn with_order(order: Order) -> Self {
        debug!(%order, "created multi-value index");
        Self {
            raw: RawBPlusTree::new(order),
        }
    }

    /// Returns the order this index was built with.
    #[must_use]
    pub const fn order(&self) -> Order {
        self.raw.order()
    }

    /// Returns the number of stored values, counting every duplicate.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns the number of distinct keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::MultiIndex;
    ///
    /// let mut index = MultiIndex::new(2).unwrap();
    /// index.insert(1, 'a');
    /// index.insert(1, 'b');
    /// assert_eq!(index.len(), 2);
    /// assert_eq!(index.key_count(), 1);
    /// ```
    #[must_use]
    pub const fn key_count(&self) -> usize {
        self.raw.key_count()
    }

    /// Returns `true` if the index holds no values.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Clears the index, removing all keys and values. The order is kept.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Gets an iterator over every `(key, value)` pair.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::MultiIndex;
    ///
    /// let mut index = MultiIndex::new(2).unwrap();
    /// index.insert(2, 'c');
    /// index.insert(1, 'a');
    /// index.insert(2, 'b');
    ///
    /// let pairs: Vec<_> = index.iter().collect();
    /// assert_eq!(pairs, [(&1, &'a'), (&2, &'c'), (&2, &'b')]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            entries: self.raw.iter(),
            current: None,
            remaining: self.raw.len(),
        }
    }

    /// Returns a snapshot of the node structure, keys only.
    #[must_use]
    pub fn shape(&self) -> Shape<K>
    where
        K: Clone,
    {
        self.raw.shape()
    }
}

impl<K: Ord, V> MultiIndex<K, V> {
    /// Returns the values stored under `key`, in insertion order.
    ///
    /// With `Some(value)` only the first stored value equal to it is returned, so the result
    /// holds at most one element. A missing key yields an empty `Vec`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::MultiIndex;
    ///
    /// let mut index = MultiIndex::new(3).unwrap();
    /// index.insert(10, "a");
    /// index.insert(10, "b");
    ///
    /// assert_eq!(index.search_exact(&10, None), [&"a", &"b"]);
    /// assert_eq!(index.search_exact(&10, Some(&"b")), [&"b"]);
    /// assert!(index.search_exact(&10, Some(&"z")).is_empty());
    /// assert!(index.search_exact(&99, None).is_empty());
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n + m) for m returned values.
    pub fn search_exact<Q>(&self, key: &Q, value: Option<&V>) -> Vec<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
        V: PartialEq,
    {
        let Some(values) = self.raw.get(key) else {
            return Vec::new();
        };
        match value {
            None => values.iter().collect(),
            Some(wanted) => values.iter().find(|v| *v == wanted).into_iter().collect(),
        }
    }

    /// Returns the values of every key in `[min, max]`, both ends inclusive, by ascending key
    /// and then insertion order.
    ///
    /// An inverted range (`min > max`) is empty and does not touch the tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::MultiIndex;
    ///
    /// let mut index = MultiIndex::new(2).unwrap();
    /// for (price, id) in [(5, "a"), (10, "b"), (15, "c"), (20, "d"), (10, "e")] {
    ///     index.insert(price, id);
    /// }
    /// assert_eq!(index.search_range(&10, &15), [&"b", &"e", &"c"]);
    /// assert_eq!(index.search_range(&11, &14), Vec::<&&str>::new());
    /// assert!(index.search_range(&15, &10).is_empty());
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n + m) for m returned values.
    pub fn search_range<Q>(&self, min: &Q, max: &Q) -> Vec<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.range(min, max).flat_map(|(_, values)| values).collect()
    }

    /// Returns `true` if at least one value is stored under the key.
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

impl<K: Ord + Clone, V> MultiIndex<K, V> {
    /// Adds `value` under `key`. An existing key keeps its slot and gets the value appended;
    /// only a new key can make a leaf split.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn insert(&mut self, key: K, value: V) {
        self.raw.insert(key, value);
    }

    /// Deletes the first value equal to `value` stored under `key`. The key itself goes once its
    /// last value is gone, rebalancing the tree.
    ///
    /// Returns `false`, leaving the index untouched, if the key or the value is missing.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::MultiIndex;
    ///
    /// let mut index = MultiIndex::new(2).unwrap();
    /// index.insert(7, "x");
    /// index.insert(7, "y");
    ///
    /// assert!(!index.delete(&7, &"z"));
    /// assert!(index.delete(&7, &"x"));
    /// assert!(index.contains_key(&7));
    /// assert!(index.delete(&7, &"y"));
    /// assert!(!index.contains_key(&7));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n + m) for m values under the key.
    pub fn delete<Q>(&mut self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
        V: PartialEq,
    {
        self.raw.remove_with(key, Multi::remove_first(value)).is_some()
    }

    /// Removes the key with all of its values, returning them in insertion order.
    ///
    /// # Examples
    ///
    /// ```
    /// use bplus_index::MultiIndex;
    ///
    /// let mut index = MultiIndex::new(2).unwrap();
    /// index.insert(7, "x");
    /// index.insert(7, "y");
    /// assert_eq!(index.remove_all(&7), ["x", "y"]);
    /// assert!(index.remove_all(&7).is_empty());
    /// ```
    pub fn remove_all<Q>(&mut self, key: &Q) -> Vec<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match self.raw.remove_with(key, |_| Removal::<V>::Emptied) {
            Some(Removed::Entry(_, values)) => values,
            Some(Removed::Retained(value)) => alloc::vec![value],
            None => Vec::new(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for MultiIndex<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.raw.iter()).finish()
    }
}

impl<K, V> Default for MultiIndex<K, V> {
    /// Creates an empty `MultiIndex` with the default [`Order`].
    fn default() -> Self {
        Self::with_order(Order::default())
    }
}

impl<K: Ord + Clone, V> FromIterator<(K, V)> for MultiIndex<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut index = Self::default();
        index.extend(iter);
        index
    }
}

impl<K: Ord + Clone, V> Extend<(K, V)> for MultiIndex<K, V> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a MultiIndex<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, values)) = &mut self.current
                && let Some(value) = values.next()
            {
                self.remaining -= 1;
                return Some((*key, value));
            }

            let (key, values) = self.entries.next()?;
            self.current = Some((key, values.iter()));
        }
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
            current: self.current.clone(),
            remaining: self.remaining,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}
