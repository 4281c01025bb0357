mod arena;
mod handle;
mod node;
mod policy;
mod raw_tree;
mod validate;

pub(crate) use handle::Handle;
pub(crate) use node::Node;
pub(crate) use policy::{Multi, Removal, Removed, Unique, ValuePolicy};
pub(crate) use raw_tree::{Entries, RawBPlusTree};
