//! Handle allocation and weak lookup.

use std::collections::HashMap;

use compsync_types::Handle;

/// Arena of live values keyed by [`Handle`].
///
/// Handles are allocated from a monotonically increasing counter and are never
/// handed out twice, so a handle to a removed value simply misses on lookup.
#[derive(Debug)]
pub struct NodeRegistry<T> {
    next: u64,
    entries: HashMap<Handle, T>,
}

impl<T> NodeRegistry<T> {
    pub fn new() -> Self {
        Self {
            next: 0,
            entries: HashMap::new(),
        }
    }

    /// Allocate a handle and store the value built for it.
    pub fn insert_with(&mut self, build: impl FnOnce(Handle) -> T) -> Handle {
        let handle = Handle::new(self.next);
        self.next += 1;
        self.entries.insert(handle, build(handle));
        handle
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.entries.get(&handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.entries.get_mut(&handle)
    }

    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        self.entries.remove(&handle)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All live handles in allocation order.
    pub fn handles(&self) -> Vec<Handle> {
        let mut handles: Vec<Handle> = self.entries.keys().copied().collect();
        handles.sort();
        handles
    }
}

impl<T> Default for NodeRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
