use alloc::vec::Vec;

use super::handle::Handle;

/// Slab that owns every node of a tree.
///
/// Vacant entries form an intrusive free list, so a node freed by a merge or a root collapse
/// hands its handle to the next split.
pub(crate) struct Arena<T> {
    entries: Vec<Entry<T>>,
    /// Most recently vacated entry.
    free_head: Option<Handle>,
    live: usize,
}

enum Entry<T> {
    Occupied(T),
    Vacant { next_free: Option<Handle> },
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_head: None,
            live: 0,
        }
    }

    /// Number of live elements.
    pub(crate) const fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn alloc(&mut self, element: T) -> Handle {
        self.live += 1;
        if let Some(handle) = self.free_head {
            let entry = &mut self.entries[handle.to_index()];
            let Entry::Vacant { next_free } = *entry else {
                unreachable!("`Arena::alloc()` - free list points at an occupied entry");
            };
            self.free_head = next_free;
            *entry = Entry::Occupied(element);
            return handle;
        }

        assert!(
            self.entries.len() <= Handle::MAX,
            "`Arena::alloc()` - arena is at maximum capacity ({})",
            Handle::MAX
        );
        self.entries.push(Entry::Occupied(element));
        Handle::from_index(self.entries.len() - 1)
    }

    #[inline]
    pub(crate) fn get(&self, handle: Handle) -> &T {
        match self.entries.get(handle.to_index()) {
            Some(Entry::Occupied(element)) => element,
            _ => panic!("`Arena::get()` - `handle` is invalid!"),
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: Handle) -> &mut T {
        match self.entries.get_mut(handle.to_index()) {
            Some(Entry::Occupied(element)) => element,
            _ => panic!("`Arena::get_mut()` - `handle` is invalid!"),
        }
    }

    /// Removes an element, returning it and pushing its handle onto the free list.
    pub(crate) fn take(&mut self, handle: Handle) -> T {
        let vacant = Entry::Vacant {
            next_free: self.free_head,
        };
        match self.entries.get_mut(handle.to_index()).map(|entry| core::mem::replace(entry, vacant)) {
            Some(Entry::Occupied(element)) => {
                self.free_head = Some(handle);
                self.live -= 1;
                element
            }
            Some(previous) => {
                // Put the vacant entry back untouched before reporting the misuse.
                self.entries[handle.to_index()] = previous;
                panic!("`Arena::take()` - `handle` is invalid!")
            }
            None => panic!("`Arena::take()` - `handle` is invalid!"),
        }
    }

    pub(crate) fn free(&mut self, handle: Handle) {
        drop(self.take(handle));
    }

    /// Drops every element. Handles issued before are invalid afterwards.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.free_head = None;
        self.live = 0;
    }
}
