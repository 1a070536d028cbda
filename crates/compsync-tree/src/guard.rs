//! Scoped suppression of renderer notifications.

use std::ops::{Deref, DerefMut};

use compsync_types::Handle;

use crate::tree::ComponentTree;

/// Blocks frontend updates for one node while alive.
///
/// Guards nest: the node is unblocked when the last guard drops, on every
/// exit path including early returns with `?`.
pub struct UpdateGuard<'a> {
    tree: &'a mut ComponentTree,
    handle: Handle,
}

impl<'a> UpdateGuard<'a> {
    pub(crate) fn new(tree: &'a mut ComponentTree, handle: Handle) -> Self {
        if let Some(node) = tree.registry.get_mut(handle) {
            node.update_block += 1;
        }
        Self { tree, handle }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }
}

impl Deref for UpdateGuard<'_> {
    type Target = ComponentTree;

    fn deref(&self) -> &ComponentTree {
        self.tree
    }
}

impl DerefMut for UpdateGuard<'_> {
    fn deref_mut(&mut self) -> &mut ComponentTree {
        self.tree
    }
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        if let Some(node) = self.tree.registry.get_mut(self.handle) {
            node.update_block = node.update_block.saturating_sub(1);
        }
    }
}
