use core::num::NonZero;

/// Index of a node slot in the tree's [`Arena`](super::arena::Arena).
///
/// Every link in the tree (parent, children, leaf chain) is a `Handle`. Handles never own
/// the node they point at; the arena does.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub(crate) struct Handle(NonZero<u32>);

impl Handle {
    pub(crate) const MAX: usize = (u32::MAX - 1) as usize;

    #[inline]
    pub(crate) const fn from_index(index: usize) -> Self {
        assert!(index <= Self::MAX, "`Handle::from_index()` - `index` > `Handle::MAX`!");
        #[allow(clippy::cast_possible_truncation)]
        let raw = (index + 1) as u32;
        match NonZero::new(raw) {
            Some(raw) => Self(raw),
            None => unreachable!(),
        }
    }

    #[inline]
    pub(crate) const fn to_index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use static_assertions::assert_eq_size;

    // Links are stored as `Option<Handle>` throughout, so the niche must hold.
    assert_eq_size!(Handle, Option<Handle>);
    assert_eq_size!(Handle, u32);

    #[test]
    fn handle_zero_is_index_zero() {
        assert_eq!(Handle::from_index(0).to_index(), 0);
    }

    proptest! {
        #[test]
        fn handle_round_trip(index in 0..=Handle::MAX) {
            let handle = Handle::from_index(index);
            prop_assert_eq!(handle.to_index(), index);
        }
    }
}
