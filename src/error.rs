use thiserror::Error;

/// Errors reported when building an index.
///
/// Lookups and deletions never fail: a miss is reported as `None`, `false` or an empty
/// result. Breaking one of the tree's structural invariants is a bug in the index itself
/// and panics instead of surfacing here.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum IndexError {
    /// The requested order is below [`Order::MIN`](crate::Order::MIN).
    #[error("B+Tree order must be an integer >= {min}, got {order}", min = crate::Order::MIN)]
    InvalidOrder {
        /// The rejected order.
        order: usize,
    },
}
