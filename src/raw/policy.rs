use alloc::vec;
use alloc::vec::Vec;
use core::marker::PhantomData;

/// What a key maps to, and what happens when an existing key is inserted again.
///
/// This is the only axis on which the two index flavors differ; split points, underflow
/// precedence and root collapse are shared by every policy.
pub(crate) trait ValuePolicy {
    type Value;
    /// Per-key storage kept in the leaves.
    type Slot;

    /// Builds the slot for a key that is not yet present.
    fn create(value: Self::Value) -> Self::Slot;

    /// Folds `value` into the slot of an existing key, returning any value it displaces.
    fn absorb(slot: &mut Self::Slot, value: Self::Value) -> Option<Self::Value>;

    /// Number of values held by a slot. Always at least one.
    fn count(slot: &Self::Slot) -> usize;
}

/// Verdict of a removal selector run against the slot of a located key.
pub(crate) enum Removal<R> {
    /// Nothing matched; the tree must stay untouched.
    Absent,
    /// Part of the slot was removed and the key stays.
    Retained(R),
    /// The whole entry goes.
    Emptied,
}

/// What a successful removal handed back.
pub(crate) enum Removed<K, S, R> {
    Retained(R),
    Entry(K, S),
}

/// One value per key; re-inserting a key overwrites it.
pub(crate) struct Unique<V>(PhantomData<fn() -> V>);

impl<V> ValuePolicy for Unique<V> {
    type Value = V;
    type Slot = V;

    fn create(value: V) -> V {
        value
    }

    fn absorb(slot: &mut V, value: V) -> Option<V> {
        Some(core::mem::replace(slot, value))
    }

    fn count(_: &V) -> usize {
        1
    }
}

/// An insertion-ordered list of values per key.
pub(crate) struct Multi<V>(PhantomData<fn() -> V>);

impl<V> ValuePolicy for Multi<V> {
    type Value = V;
    type Slot = Vec<V>;

    fn create(value: V) -> Vec<V> {
        vec![value]
    }

    fn absorb(slot: &mut Vec<V>, value: V) -> Option<V> {
        slot.push(value);
        None
    }

    fn count(slot: &Vec<V>) -> usize {
        slot.len()
    }
}

impl<V> Multi<V> {
    /// Removal selector for the first value equal to `value`.
    pub(crate) fn remove_first<'a>(value: &'a V) -> impl FnOnce(&mut Vec<V>) -> Removal<V> + 'a
    where
        V: PartialEq,
    {
        move |values| match values.iter().position(|v| v == value) {
            None => Removal::Absent,
            Some(_) if values.len() == 1 => Removal::Emptied,
            Some(index) => Removal::Retained(values.remove(index)),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn unique_overwrites() {
        let mut slot = Unique::<i32>::create(1);
        assert_eq!(Unique::<i32>::absorb(&mut slot, 2), Some(1));
        assert_eq!(slot, 2);
        assert_eq!(Unique::<i32>::count(&slot), 1);
    }

    #[test]
    fn multi_appends_and_removes_first_match() {
        let mut slot = Multi::<&str>::create("a");
        assert_eq!(Multi::<&str>::absorb(&mut slot, "b"), None);
        assert_eq!(Multi::<&str>::absorb(&mut slot, "a"), None);
        assert_eq!(Multi::<&str>::count(&slot), 3);

        assert!(matches!(Multi::remove_first(&"z")(&mut slot), Removal::Absent));
        assert!(matches!(Multi::remove_first(&"a")(&mut slot), Removal::Retained("a")));
        assert_eq!(slot, ["b", "a"]);
        assert!(matches!(Multi::remove_first(&"a")(&mut slot), Removal::Retained("a")));
        assert!(matches!(Multi::remove_first(&"b")(&mut slot), Removal::Emptied));
        assert_eq!(slot, ["b"]);
    }
}
