//! Order-parameterized B+Tree indexes for Rust.
//!
//! This crate provides two in-memory indexes that share a single B+Tree engine and differ
//! only in what a key maps to:
//!
//! - [`UniqueIndex`] - one value per key (re-inserting a key overwrites its value)
//! - [`MultiIndex`] - an ordered list of values per key, with inclusive range scans
//!
//! The fan-out of the tree is chosen at construction time through an [`Order`]: every node
//! holds at most `order` keys, and every node except the root holds at least half of that.
//!
//! # Example
//!
//! ```
//! use bplus_index::{MultiIndex, UniqueIndex};
//!
//! let mut by_id = UniqueIndex::new(4).unwrap();
//! by_id.insert("p-002", "Desk lamp");
//! by_id.insert("p-001", "Notebook");
//! assert_eq!(by_id.search(&"p-001"), Some(&"Notebook"));
//! assert!(by_id.delete(&"p-002"));
//! assert!(!by_id.delete(&"p-002"));
//!
//! let mut by_price = MultiIndex::new(3).unwrap();
//! by_price.insert(1299, "p-001");
//! by_price.insert(1299, "p-007");
//! by_price.insert(4500, "p-002");
//! assert_eq!(by_price.search_exact(&1299, None), vec![&"p-001", &"p-007"]);
//! assert_eq!(by_price.search_range(&1000, &2000), vec![&"p-001", &"p-007"]);
//! assert!(by_price.search_range(&2000, &1000).is_empty());
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Runtime order** - Any order `>= 2`, validated once when the index is built
//! - **Arena storage** - Nodes live in a slab and refer to each other by handle, so parent,
//!   child and sibling links never own anything
//! - **`serde`** (optional) - [`Order`] (de)serializes as a plain, validated integer
//!
//! # Implementation
//!
//! The indexes are B+trees: all entries live in leaves, leaves form a doubly-linked chain in
//! ascending key order, and internal nodes only hold separator keys. Overflowing nodes are
//! split; underflowing nodes borrow from a sibling (right first, then left) and otherwise merge
//! with one, cascading up to the root, which collapses when it is left with a single child.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod error;
mod order;
mod raw;
mod shape;

pub mod multi_index;
pub mod unique_index;

pub use error::IndexError;
pub use multi_index::MultiIndex;
pub use order::Order;
pub use shape::Shape;
pub use unique_index::UniqueIndex;
