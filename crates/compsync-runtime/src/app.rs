//! App sessions: save, load, and hot reload of a whole tree.

use compsync_sync::{dump_recursive, dump_storage, load_recursive, load_storage};
use compsync_tree::{lifecycle, ComponentTree, NullFrontend, TreeResult};
use compsync_types::{Document, Handle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RuntimeError, RuntimeResult};

/// State and storage documents of one save.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    pub data: Document,
    pub storage: Document,
}

/// A live component tree with its root and default-state baseline.
pub struct App {
    tree: ComponentTree,
    root: Handle,
    defaults: Document,
}

impl App {
    /// Adopt a freshly built tree. Its current state becomes the baseline
    /// for exclude-default saves.
    pub fn new(mut tree: ComponentTree, root: Handle) -> RuntimeResult<Self> {
        tree.set_root(root)?;
        let defaults = dump_recursive(&mut tree, root, None)?;
        debug!(%root, components = tree.len(), "app created");
        Ok(Self {
            tree,
            root,
            defaults,
        })
    }

    /// Build a tree with `factory` on `tree` and adopt it.
    pub fn build(
        mut tree: ComponentTree,
        factory: impl FnOnce(&mut ComponentTree) -> TreeResult<Handle>,
    ) -> RuntimeResult<Self> {
        let root = factory(&mut tree)?;
        Self::new(tree, root)
    }

    pub fn tree(&self) -> &ComponentTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ComponentTree {
        &mut self.tree
    }

    pub fn root(&self) -> Handle {
        self.root
    }

    pub fn defaults(&self) -> &Document {
        &self.defaults
    }

    /// Broadcast `mounted` over the whole tree.
    pub fn mount(&mut self) -> RuntimeResult<()> {
        self.tree
            .emit_recursive(self.root, lifecycle::MOUNTED, None)?;
        Ok(())
    }

    /// Run `before_save` and `save` (which flushes storage) over the tree,
    /// then dump state and storage.
    pub fn save(&mut self, exclude_defaults: bool, include_storage_data: bool) -> RuntimeResult<SavedState> {
        self.capture(exclude_defaults, include_storage_data, true)
    }

    fn capture(
        &mut self,
        exclude_defaults: bool,
        include_storage_data: bool,
        flush: bool,
    ) -> RuntimeResult<SavedState> {
        self.tree
            .emit_recursive(self.root, lifecycle::BEFORE_SAVE, None)?;
        if flush {
            let outcome = self.tree.emit_recursive(self.root, lifecycle::SAVE, None)?;
            if !outcome.is_ok() {
                return Err(RuntimeError::SaveFailed {
                    failures: outcome.failures,
                });
            }
        }
        let exclude = exclude_defaults.then_some(&self.defaults);
        let data = dump_recursive(&mut self.tree, self.root, exclude)?;
        let storage = dump_storage(&mut self.tree, self.root, include_storage_data)?;
        Ok(SavedState { data, storage })
    }

    /// Restore storage metadata, then state, then broadcast `load`.
    pub fn load(&mut self, saved: &SavedState) -> RuntimeResult<()> {
        load_storage(&mut self.tree, self.root, &saved.storage)?;
        load_recursive(&mut self.tree, self.root, &saved.data, true)?;
        self.tree.emit_recursive(self.root, lifecycle::LOAD, None)?;
        Ok(())
    }

    /// Replace the tree with one built by `factory`, carrying state over.
    ///
    /// The old tree is captured (state diffed against its defaults, storage
    /// including unflushed data) before the new tree is built. If building or
    /// loading the new tree fails, the old tree stays in place.
    pub fn reload(
        &mut self,
        factory: impl FnOnce(&mut ComponentTree) -> TreeResult<Handle>,
    ) -> RuntimeResult<()> {
        let captured = self.capture(true, true, false)?;

        let mut tree = ComponentTree::new(self.tree.persistence().clone());
        let status = self.tree.status();
        let (capture_events, capture_call_stack) = (status.capture_events, status.capture_call_stack);
        tree.status_mut().capture_events = capture_events;
        tree.status_mut().capture_call_stack = capture_call_stack;

        let mut next = App::build(tree, factory)?;
        next.load(&captured)?;

        let frontend = self.tree.replace_frontend(Box::new(NullFrontend));
        next.tree.set_frontend(frontend);
        let mut old = std::mem::replace(self, next);
        old.tree.unmount(old.root)?;

        self.tree.reset_frontend(self.root);
        self.mount()?;
        info!(root = %self.root, components = self.tree.len(), "app reloaded");
        Ok(())
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root)
            .field("tree", &self.tree)
            .finish_non_exhaustive()
    }
}
