use core::fmt;

use crate::IndexError;

/// The order (maximum fan-out) of a B+Tree: the largest number of keys any node may hold.
///
/// An `Order` is always at least [`Order::MIN`]; building one is the only fallible step of
/// creating an index.
///
/// # Examples
///
/// ```
/// use bplus_index::{IndexError, Order};
///
/// let order = Order::new(4).unwrap();
/// assert_eq!(order.get(), 4);
/// assert_eq!(Order::new(1), Err(IndexError::InvalidOrder { order: 1 }));
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "usize", into = "usize"))]
pub struct Order(usize);

impl Order {
    /// The smallest supported order.
    pub const MIN: usize = 2;

    /// Creates an order, rejecting values below [`Order::MIN`].
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidOrder`] if `order < 2`.
    pub const fn new(order: usize) -> Result<Self, IndexError> {
        if order < Self::MIN {
            return Err(IndexError::InvalidOrder { order });
        }
        Ok(Self(order))
    }

    /// Returns the order as a plain integer.
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Minimum key count of a non-root leaf: `ceil(order / 2)`.
    #[inline]
    pub(crate) const fn min_leaf_keys(self) -> usize {
        self.0.div_ceil(2)
    }

    /// Minimum key count of a non-root internal node: `floor(order / 2)`.
    ///
    /// Identical to the leaf minimum for even orders. For odd orders an internal split of
    /// `order + 1` keys only leaves `order` keys for both halves, so the floor is the
    /// tightest bound splits and merges can both honour.
    #[inline]
    pub(crate) const fn min_internal_keys(self) -> usize {
        self.0 / 2
    }

    /// Index of the first entry moved to the new right leaf: `ceil((order + 1) / 2)`.
    #[inline]
    pub(crate) const fn leaf_split_point(self) -> usize {
        (self.0 + 1).div_ceil(2)
    }

    /// Index of the separator pushed up out of an overflowing internal node: `order / 2`.
    #[inline]
    pub(crate) const fn internal_split_point(self) -> usize {
        self.0 / 2
    }
}

impl Default for Order {
    fn default() -> Self {
        Self(32)
    }
}

impl TryFrom<usize> for Order {
    type Error = IndexError;

    fn try_from(order: usize) -> Result<Self, Self::Error> {
        Self::new(order)
    }
}

impl From<Order> for usize {
    fn from(order: Order) -> Self {
        order.0
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
