//! Topology, identity resolution, and traversal.

use std::collections::HashSet;
use std::ops::ControlFlow;

use compsync_store::{
    ContentStore, FlushReport, Persistence, StorageMetadata, StoreResult, StoredValue,
};
use compsync_types::{join_full_id, validate_local_id, Document, Handle};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::dispatch::lifecycle;
use crate::error::{TreeError, TreeResult};
use crate::event::Handler;
use crate::frontend::{Frontend, FrontendUpdate, NullFrontend};
use crate::guard::UpdateGuard;
use crate::node::{Node, NodeSpec, Slot, SlotItem, DEFAULT_SLOT};
use crate::registry::NodeRegistry;
use crate::state::ComponentState;
use crate::status::AppStatus;

/// Visit order for [`ComponentTree::recurse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    /// Pre-order.
    ParentFirst,
    /// Post-order.
    ChildrenFirst,
}

type Visit<'f> = dyn FnMut(&mut ComponentTree, Handle) -> TreeResult<()> + 'f;
type VisitWith<'f, A, E> = dyn FnMut(&mut ComponentTree, Handle, A) -> Result<ControlFlow<(), A>, E> + 'f;

/// A tree of components plus everything shared by its nodes.
pub struct ComponentTree {
    pub(crate) registry: NodeRegistry<Node>,
    pub(crate) status: AppStatus,
    pub(crate) frontend: Box<dyn Frontend>,
    persistence: Persistence,
    root: Option<Handle>,
}

impl ComponentTree {
    pub fn new(persistence: Persistence) -> Self {
        Self::with_frontend(persistence, Box::new(NullFrontend))
    }

    pub fn with_frontend(persistence: Persistence, frontend: Box<dyn Frontend>) -> Self {
        Self {
            registry: NodeRegistry::new(),
            status: AppStatus::new(),
            frontend,
            persistence,
            root: None,
        }
    }

    pub fn set_frontend(&mut self, frontend: Box<dyn Frontend>) {
        self.frontend = frontend;
    }

    /// Swap in `frontend` and return the previous one.
    pub fn replace_frontend(&mut self, frontend: Box<dyn Frontend>) -> Box<dyn Frontend> {
        std::mem::replace(&mut self.frontend, frontend)
    }

    /// Mark `handle` as the root: its scope is empty and it needs no parent.
    pub fn set_root(&mut self, handle: Handle) -> TreeResult<()> {
        self.node(handle)?;
        self.root = Some(handle);
        Ok(())
    }

    pub fn root(&self) -> Option<Handle> {
        self.root
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    pub fn status(&self) -> &AppStatus {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut AppStatus {
        &mut self.status
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.registry.contains(handle)
    }

    pub fn node(&self, handle: Handle) -> TreeResult<&Node> {
        self.registry.get(handle).ok_or(TreeError::UnknownNode(handle))
    }

    pub fn node_mut(&mut self, handle: Handle) -> TreeResult<&mut Node> {
        self.registry
            .get_mut(handle)
            .ok_or(TreeError::UnknownNode(handle))
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    pub fn create(&mut self, spec: NodeSpec) -> TreeResult<Handle> {
        self.create_with(spec, |_, _| Ok(()))
    }

    /// Construct a node and run `init` on it with frontend updates blocked.
    ///
    /// If `init` fails the node is removed again and its children are detached.
    pub fn create_with(
        &mut self,
        spec: NodeSpec,
        init: impl FnOnce(&mut ComponentTree, Handle) -> TreeResult<()>,
    ) -> TreeResult<Handle> {
        validate_local_id(&spec.id)?;
        let NodeSpec {
            component,
            id,
            namespace,
            children,
            mut slots,
            props,
            state,
        } = spec;

        let handle = self
            .registry
            .insert_with(|h| Node::new(h, component, id, namespace));
        {
            let node = self.node_mut(handle)?;
            node.props = props;
            node.state = state;
            if !children.is_empty() || !slots.contains_key(DEFAULT_SLOT) {
                slots.insert(DEFAULT_SLOT.to_string(), Slot::Items(children));
            }
            node.slots = slots;
        }

        let result = {
            let mut guard = UpdateGuard::new(self, handle);
            guard.construct(handle, init)
        };
        if let Err(err) = result {
            self.discard(handle);
            return Err(err);
        }

        let node = self.node(handle)?;
        debug!(%handle, component = %node.component, local_id = %node.local_id, "created component");
        Ok(handle)
    }

    fn construct(
        &mut self,
        handle: Handle,
        init: impl FnOnce(&mut ComponentTree, Handle) -> TreeResult<()>,
    ) -> TreeResult<()> {
        self.on(handle, [lifecycle::SAVE], Handler::event(flush_own_storage))?;
        for child in self.node(handle)?.child_handles() {
            self.attach(child, handle)?;
        }
        init(self, handle)
    }

    fn discard(&mut self, handle: Handle) {
        let Some(node) = self.registry.remove(handle) else {
            return;
        };
        if let Some(full_id) = node.cached_full_id() {
            self.status.unregister(&full_id, handle);
        }
        for child in node.child_handles() {
            if let Some(child) = self.registry.get_mut(child) {
                if child.parent == Some(handle) {
                    child.parent = None;
                }
            }
        }
    }

    /// Set `parent` as the parent of `child` and adopt its whole subtree.
    pub fn attach(&mut self, child: Handle, parent: Handle) -> TreeResult<()> {
        self.node(parent)?;
        self.node_mut(child)?.parent = Some(parent);
        self.recurse(child, Order::ParentFirst, |_, _| Ok(()))
    }

    // -----------------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------------

    /// Resolve, cache, and register the full id of `handle`.
    pub fn full_id(&mut self, handle: Handle) -> TreeResult<String> {
        self.resolve_scope(handle)?;
        let node = self.node(handle)?;
        Ok(node.cached_full_id().unwrap_or_default())
    }

    fn resolve_scope(&mut self, handle: Handle) -> TreeResult<String> {
        let node = self.node(handle)?;
        if let Some(scope) = &node.scope {
            return Ok(scope.clone());
        }
        let parent = node.parent;
        let local_id = node.local_id.clone();

        let scope = if self.root == Some(handle) {
            String::new()
        } else {
            let parent = parent.ok_or(TreeError::MissingParent { handle })?;
            let parent_scope = self.resolve_scope(parent)?;
            let parent_node = self.node(parent)?;
            if parent_node.namespace {
                join_full_id(&parent_scope, &parent_node.local_id)
            } else {
                parent_scope
            }
        };

        let full_id = join_full_id(&scope, &local_id);
        if !full_id.is_empty() {
            self.status.register(&full_id, handle)?;
        }
        let node = self.node_mut(handle)?;
        node.scope = Some(scope.clone());
        node.storage.set_owner(full_id);
        Ok(scope)
    }

    /// Drop cached ids of the subtree at `root` so they are resolved again
    /// against the current parent chain.
    pub fn invalidate_identity(&mut self, root: Handle) -> TreeResult<()> {
        self.recurse(root, Order::ParentFirst, |tree, handle| {
            let node = tree.node_mut(handle)?;
            let full_id = node.cached_full_id();
            node.scope = None;
            if let Some(full_id) = full_id {
                tree.status.unregister(&full_id, handle);
            }
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Traversal
    // -----------------------------------------------------------------------

    /// Visit the subtree at `root`, skipping lazy slots.
    ///
    /// Each node is visited at most once even if it appears in several slots.
    /// Children are adopted (their parent set) as they are reached.
    pub fn recurse(
        &mut self,
        root: Handle,
        order: Order,
        mut visit: impl FnMut(&mut ComponentTree, Handle) -> TreeResult<()>,
    ) -> TreeResult<()> {
        let mut visited = HashSet::new();
        self.recurse_inner(root, order, &mut visit, &mut visited)
    }

    fn recurse_inner(
        &mut self,
        handle: Handle,
        order: Order,
        visit: &mut Visit<'_>,
        visited: &mut HashSet<Handle>,
    ) -> TreeResult<()> {
        if !self.registry.contains(handle) || !visited.insert(handle) {
            return Ok(());
        }
        if order == Order::ParentFirst {
            visit(self, handle)?;
        }
        for child in self.adopt_children(handle) {
            self.recurse_inner(child, order, visit, visited)?;
        }
        if order == Order::ChildrenFirst {
            visit(self, handle)?;
        }
        Ok(())
    }

    /// Pre-order walk that threads a value from parent to children.
    ///
    /// `visit` returns `Continue(arg)` to descend with `arg` or `Break(())`
    /// to skip the node's subtree. The error type is the caller's.
    pub fn recurse_with<A: Clone, E>(
        &mut self,
        root: Handle,
        arg: A,
        mut visit: impl FnMut(&mut ComponentTree, Handle, A) -> Result<ControlFlow<(), A>, E>,
    ) -> Result<(), E> {
        let mut visited = HashSet::new();
        self.recurse_with_inner(root, arg, &mut visit, &mut visited)
    }

    fn recurse_with_inner<A: Clone, E>(
        &mut self,
        handle: Handle,
        arg: A,
        visit: &mut VisitWith<'_, A, E>,
        visited: &mut HashSet<Handle>,
    ) -> Result<(), E> {
        if !self.registry.contains(handle) || !visited.insert(handle) {
            return Ok(());
        }
        let ControlFlow::Continue(child_arg) = visit(self, handle, arg)? else {
            return Ok(());
        };
        for child in self.adopt_children(handle) {
            self.recurse_with_inner(child, child_arg.clone(), visit, visited)?;
        }
        Ok(())
    }

    fn adopt_children(&mut self, handle: Handle) -> Vec<Handle> {
        let children = self
            .registry
            .get(handle)
            .map(Node::child_handles)
            .unwrap_or_default();
        for child in &children {
            if let Some(node) = self.registry.get_mut(*child) {
                node.parent = Some(handle);
            }
        }
        children
    }

    /// Handles of the subtree at `root` in pre-order.
    pub fn subtree(&mut self, root: Handle) -> TreeResult<Vec<Handle>> {
        let mut handles = Vec::new();
        self.recurse(root, Order::ParentFirst, |_, handle| {
            handles.push(handle);
            Ok(())
        })?;
        Ok(handles)
    }

    // -----------------------------------------------------------------------
    // Props, slots, notifications
    // -----------------------------------------------------------------------

    pub fn set_prop(&mut self, handle: Handle, key: &str, value: impl Into<Value>) -> TreeResult<()> {
        let value = value.into();
        self.node_mut(handle)?
            .props
            .insert(key.to_string(), value.clone());
        let mut update = Document::new();
        update.insert(key.to_string(), value);
        self.notify(handle, FrontendUpdate::Props(update))
    }

    pub fn prop(&self, handle: Handle, key: &str) -> TreeResult<Option<&Value>> {
        Ok(self.node(handle)?.props.get(key))
    }

    /// Replace a slot's children, attach them, and notify the renderer.
    pub fn set_slot(&mut self, handle: Handle, name: &str, items: Vec<SlotItem>) -> TreeResult<()> {
        for child in items.iter().filter_map(SlotItem::handle) {
            self.attach(child, handle)?;
        }
        let refs: Vec<Value> = items.iter().map(SlotItem::to_frontend_ref).collect();
        self.node_mut(handle)?
            .slots
            .insert(name.to_string(), Slot::Items(items));
        let mut update = Document::new();
        update.insert(name.to_string(), Value::Array(refs));
        self.notify(handle, FrontendUpdate::Slots(update))
    }

    pub fn set_children(&mut self, handle: Handle, items: Vec<SlotItem>) -> TreeResult<()> {
        self.set_slot(handle, DEFAULT_SLOT, items)
    }

    /// Materialized children across all slots.
    pub fn children(&self, handle: Handle) -> TreeResult<Vec<Handle>> {
        Ok(self.node(handle)?.child_handles())
    }

    /// Send `update` to the renderer unless the node's updates are blocked.
    pub fn notify(&mut self, handle: Handle, update: FrontendUpdate) -> TreeResult<()> {
        if self.node(handle)?.is_update_blocked() {
            return Ok(());
        }
        self.frontend.update_component(handle, update);
        Ok(())
    }

    pub fn refresh(&mut self, handle: Handle) -> TreeResult<()> {
        self.notify(handle, FrontendUpdate::Refresh)
    }

    /// Ask the renderer to rebuild from `root`.
    pub fn reset_frontend(&mut self, root: Handle) {
        self.frontend.reset_app(root);
    }

    pub fn block_updates(&mut self, handle: Handle) -> UpdateGuard<'_> {
        UpdateGuard::new(self, handle)
    }

    // -----------------------------------------------------------------------
    // Declared state
    // -----------------------------------------------------------------------

    /// The node's persisted state: its component state, or its props if it
    /// has an id and no component state.
    pub fn dump_node(&self, handle: Handle) -> TreeResult<Option<Value>> {
        let node = self.node(handle)?;
        let value = match &node.state {
            Some(state) => state.dump(),
            None if !node.local_id.is_empty() && !node.props.is_empty() => {
                Some(Value::Object(node.props.clone()))
            }
            None => None,
        };
        Ok(value)
    }

    pub fn load_node(&mut self, handle: Handle, data: Value) -> TreeResult<()> {
        let node = self.node_mut(handle)?;
        match &mut node.state {
            Some(state) => state.load(data),
            None => {
                if let Value::Object(props) = data {
                    node.props = props;
                }
            }
        }
        Ok(())
    }

    pub fn state<T: ComponentState>(&self, handle: Handle) -> Option<&T> {
        self.registry
            .get(handle)?
            .state
            .as_deref()?
            .as_any()
            .downcast_ref::<T>()
    }

    pub fn state_mut<T: ComponentState>(&mut self, handle: Handle) -> Option<&mut T> {
        self.registry
            .get_mut(handle)?
            .state
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    // -----------------------------------------------------------------------
    // Storage
    // -----------------------------------------------------------------------

    /// Storage of `handle`, bound to the tree's persistence.
    ///
    /// Resolves the node's full id first, since it scopes content hashes.
    pub fn storage(&mut self, handle: Handle) -> TreeResult<StorageView<'_>> {
        self.full_id(handle)?;
        let persistence = &self.persistence;
        let node = self
            .registry
            .get_mut(handle)
            .ok_or(TreeError::UnknownNode(handle))?;
        Ok(StorageView {
            store: &mut node.storage,
            persistence,
        })
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Broadcast `before_unmount` over the subtree, then remove it.
    pub fn unmount(&mut self, root: Handle) -> TreeResult<()> {
        self.emit_recursive(root, lifecycle::BEFORE_UNMOUNT, None)?;
        let handles = self.subtree(root)?;
        if let Some(parent) = self.node(root)?.parent {
            if let Some(parent) = self.registry.get_mut(parent) {
                for slot in parent.slots.values_mut() {
                    if let Slot::Items(items) = slot {
                        items.retain(|item| item.handle() != Some(root));
                    }
                }
            }
        }
        for handle in &handles {
            self.discard(*handle);
        }
        if self.root == Some(root) {
            self.root = None;
            self.status.clear();
        }
        debug!(%root, removed = handles.len(), "unmounted subtree");
        Ok(())
    }
}

impl std::fmt::Debug for ComponentTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentTree")
            .field("nodes", &self.registry.len())
            .field("root", &self.root)
            .field("persistence", &self.persistence)
            .finish_non_exhaustive()
    }
}

fn flush_own_storage(tree: &mut ComponentTree, event: &crate::event::Event) -> crate::event::HandlerResult {
    if !tree.node(event.component)?.storage.is_dirty() {
        return Ok(None);
    }
    tree.storage(event.component)?.flush()?;
    Ok(None)
}

/// A node's [`ContentStore`] paired with the tree's [`Persistence`].
pub struct StorageView<'a> {
    store: &'a mut ContentStore,
    persistence: &'a Persistence,
}

impl StorageView<'_> {
    pub fn get(&mut self, key: &str) -> StoreResult<Option<StoredValue>> {
        self.store.get(key, self.persistence)
    }

    pub fn get_opaque<T: DeserializeOwned>(&mut self, key: &str) -> StoreResult<Option<T>> {
        self.store.get_opaque(key, self.persistence)
    }

    pub fn set(&mut self, key: &str, value: impl Into<StoredValue>) -> StoreResult<bool> {
        self.store.set(key, value)
    }

    pub fn set_opaque<T: Serialize>(&mut self, key: &str, value: &T) -> StoreResult<bool> {
        self.store.set_opaque(key, value)
    }

    pub fn delete(&mut self, key: &str) {
        self.store.delete(key);
    }

    pub fn flush(&mut self) -> StoreResult<FlushReport> {
        self.store.flush(self.persistence)
    }

    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    pub fn metadata(&self) -> &StorageMetadata {
        self.store.metadata()
    }

    pub fn load_metadata(&mut self, metadata: StorageMetadata) {
        self.store.load_metadata(metadata);
    }

    pub fn dump_data(&self) -> std::collections::BTreeMap<String, String> {
        self.store.dump_data()
    }

    pub fn load_data(&mut self, data: std::collections::BTreeMap<String, String>) -> StoreResult<()> {
        self.store.load_data(data, self.persistence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::RecordingFrontend;
    use crate::state::FieldState;
    use compsync_store::LocalCache;
    use proptest::prelude::*;
    use serde_json::json;

    fn local_tree() -> (tempfile::TempDir, ComponentTree) {
        let dir = tempfile::tempdir().unwrap();
        let tree = ComponentTree::new(Persistence::local(LocalCache::new(dir.path())));
        (dir, tree)
    }

    /// root -> form (namespace) -> [length, group -> [width]]
    fn form_tree(tree: &mut ComponentTree) -> (Handle, Handle, Handle, Handle) {
        let length = tree
            .create(NodeSpec::new("QInput").id("length").state(FieldState::new().with("value", 5)))
            .unwrap();
        let width = tree.create(NodeSpec::new("QInput").id("width")).unwrap();
        let group = tree.create(NodeSpec::new("div").child(width)).unwrap();
        let form = tree
            .create(NodeSpec::new("QForm").id("form").namespace().children([length, group]))
            .unwrap();
        let root = tree.create(NodeSpec::new("App").child(form)).unwrap();
        tree.set_root(root).unwrap();
        (root, form, length, width)
    }

    // -----------------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------------

    #[test]
    fn full_ids_follow_namespaces() {
        let (_dir, mut tree) = local_tree();
        let (root, form, length, width) = form_tree(&mut tree);
        assert_eq!(tree.full_id(root).unwrap(), "");
        assert_eq!(tree.full_id(form).unwrap(), "form");
        assert_eq!(tree.full_id(length).unwrap(), "form.length");
        assert_eq!(tree.full_id(width).unwrap(), "form.width");
        assert_eq!(tree.status().component("form.width"), Some(width));
    }

    #[test]
    fn full_id_is_cached() {
        let (_dir, mut tree) = local_tree();
        let (_, _, length, _) = form_tree(&mut tree);
        assert_eq!(tree.full_id(length).unwrap(), "form.length");
        let other = tree.create(NodeSpec::new("div").id("other")).unwrap();
        tree.node_mut(length).unwrap().parent = Some(other);
        assert_eq!(tree.full_id(length).unwrap(), "form.length");
    }

    #[test]
    fn detached_node_has_no_identity() {
        let (_dir, mut tree) = local_tree();
        let lone = tree.create(NodeSpec::new("div").id("lone")).unwrap();
        assert!(matches!(
            tree.full_id(lone),
            Err(TreeError::MissingParent { handle }) if handle == lone
        ));
    }

    #[test]
    fn dotted_id_rejected_at_construction() {
        let (_dir, mut tree) = local_tree();
        let err = tree.create(NodeSpec::new("div").id("a.b")).unwrap_err();
        assert!(matches!(err, TreeError::InvalidIdentifier(id) if id == "a.b"));
        assert!(tree.is_empty());
    }

    #[test]
    fn duplicate_ids_detected_on_resolution() {
        let (_dir, mut tree) = local_tree();
        let a = tree.create(NodeSpec::new("QInput").id("x")).unwrap();
        let b = tree.create(NodeSpec::new("QInput").id("x")).unwrap();
        let root = tree.create(NodeSpec::new("App").children([a, b])).unwrap();
        tree.set_root(root).unwrap();
        tree.full_id(a).unwrap();
        assert!(matches!(
            tree.full_id(b),
            Err(TreeError::DuplicateIdentifier { ref full_id, existing, requested })
                if full_id == "x" && existing == a && requested == b
        ));
    }

    #[test]
    fn invalidation_re_resolves() {
        let (_dir, mut tree) = local_tree();
        let (root, form, length, _) = form_tree(&mut tree);
        tree.full_id(length).unwrap();
        tree.node_mut(form).unwrap().namespace = false;
        tree.invalidate_identity(root).unwrap();
        assert_eq!(tree.full_id(length).unwrap(), "length");
        assert_eq!(tree.status().component("form.length"), None);
    }

    proptest! {
        #[test]
        fn nested_namespaces_join_ids(ids in proptest::collection::vec("[a-z]{1,6}", 1..6)) {
            let dir = tempfile::tempdir().unwrap();
            let mut tree = ComponentTree::new(Persistence::local(LocalCache::new(dir.path())));
            let leaf = tree.create(NodeSpec::new("QInput").id("leaf")).unwrap();
            let mut child = leaf;
            for id in ids.iter().rev() {
                child = tree.create(NodeSpec::new("div").id(id.clone()).namespace().child(child)).unwrap();
            }
            let root = tree.create(NodeSpec::new("App").child(child)).unwrap();
            tree.set_root(root).unwrap();

            let expected = format!("{}.leaf", ids.join("."));
            prop_assert_eq!(tree.full_id(leaf).unwrap(), expected.clone());
            prop_assert_eq!(tree.full_id(leaf).unwrap(), expected);
        }
    }

    // -----------------------------------------------------------------------
    // Construction and traversal
    // -----------------------------------------------------------------------

    #[test]
    fn failed_init_removes_node() {
        let (_dir, mut tree) = local_tree();
        let child = tree.create(NodeSpec::new("div")).unwrap();
        let err = tree
            .create_with(NodeSpec::new("Broken").child(child), |_, _| {
                Err(TreeError::Construction {
                    component: "Broken".into(),
                    reason: "boom".into(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, TreeError::Construction { .. }));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.node(child).unwrap().parent(), None);
    }

    #[test]
    fn construction_blocks_updates() {
        let recorder = RecordingFrontend::new();
        let dir = tempfile::tempdir().unwrap();
        let mut tree = ComponentTree::with_frontend(
            Persistence::local(LocalCache::new(dir.path())),
            Box::new(recorder.clone()),
        );
        let handle = tree
            .create_with(NodeSpec::new("div"), |tree, handle| {
                tree.set_prop(handle, "label", "during init")
            })
            .unwrap();
        assert!(recorder.updates().is_empty());
        assert!(!tree.node(handle).unwrap().is_update_blocked());

        tree.set_prop(handle, "label", "after").unwrap();
        assert_eq!(recorder.updates_for(handle).len(), 1);
    }

    #[test]
    fn guard_blocks_until_dropped() {
        let recorder = RecordingFrontend::new();
        let dir = tempfile::tempdir().unwrap();
        let mut tree = ComponentTree::with_frontend(
            Persistence::local(LocalCache::new(dir.path())),
            Box::new(recorder.clone()),
        );
        let handle = tree.create(NodeSpec::new("div")).unwrap();
        {
            let mut guard = tree.block_updates(handle);
            guard.set_prop(handle, "a", 1).unwrap();
            let mut inner = guard.block_updates(handle);
            inner.set_prop(handle, "b", 2).unwrap();
        }
        assert!(recorder.updates().is_empty());
        tree.refresh(handle).unwrap();
        assert_eq!(recorder.updates_for(handle), vec![FrontendUpdate::Refresh]);
    }

    #[test]
    fn traversal_orders() {
        let (_dir, mut tree) = local_tree();
        let (root, form, length, width) = form_tree(&mut tree);
        let group = tree.node(width).unwrap().parent().unwrap();

        let pre = tree.subtree(root).unwrap();
        assert_eq!(pre, vec![root, form, length, group, width]);

        let mut post = Vec::new();
        tree.recurse(root, Order::ChildrenFirst, |_, h| {
            post.push(h);
            Ok(())
        })
        .unwrap();
        assert_eq!(post, vec![length, width, group, form, root]);
    }

    #[test]
    fn traversal_visits_shared_child_once() {
        let (_dir, mut tree) = local_tree();
        let shared = tree.create(NodeSpec::new("span")).unwrap();
        let root = tree
            .create(NodeSpec::new("App").child(shared).slot("extra", vec![shared.into()]))
            .unwrap();
        assert_eq!(tree.subtree(root).unwrap(), vec![root, shared]);
    }

    #[test]
    fn traversal_skips_lazy_slots() {
        let (_dir, mut tree) = local_tree();
        let root = tree
            .create(NodeSpec::new("QExpansionItem").lazy_slot(
                "body",
                std::rc::Rc::new(
                    |tree: &mut ComponentTree, _: Option<&Value>| -> TreeResult<Vec<SlotItem>> {
                        Ok(vec![SlotItem::Node(tree.create(NodeSpec::new("span"))?)])
                    },
                ),
            ))
            .unwrap();
        assert_eq!(tree.subtree(root).unwrap(), vec![root]);
    }

    #[test]
    fn recurse_with_break_skips_subtree() {
        let (_dir, mut tree) = local_tree();
        let (root, form, _, _) = form_tree(&mut tree);
        let mut seen = Vec::new();
        tree.recurse_with(root, 0usize, |_, h, depth| {
            seen.push((h, depth));
            if h == form {
                Ok::<_, TreeError>(ControlFlow::Break(()))
            } else {
                Ok(ControlFlow::Continue(depth + 1))
            }
        })
        .unwrap();
        assert_eq!(seen, vec![(root, 0), (form, 1)]);
    }

    #[test]
    fn set_slot_attaches_and_notifies() {
        let recorder = RecordingFrontend::new();
        let dir = tempfile::tempdir().unwrap();
        let mut tree = ComponentTree::with_frontend(
            Persistence::local(LocalCache::new(dir.path())),
            Box::new(recorder.clone()),
        );
        let parent = tree.create(NodeSpec::new("div")).unwrap();
        let child = tree.create(NodeSpec::new("span")).unwrap();
        tree.set_children(parent, vec![child.into(), "label".into()])
            .unwrap();

        assert_eq!(tree.node(child).unwrap().parent(), Some(parent));
        assert_eq!(tree.children(parent).unwrap(), vec![child]);
        let mut slots = Document::new();
        slots.insert(
            "default".into(),
            json!([{"compId": child.get()}, {"compId": "label"}]),
        );
        assert_eq!(
            recorder.updates_for(parent),
            vec![FrontendUpdate::Slots(slots)]
        );
    }

    // -----------------------------------------------------------------------
    // State and storage
    // -----------------------------------------------------------------------

    #[test]
    fn dump_falls_back_to_props() {
        let (_dir, mut tree) = local_tree();
        let anonymous = tree.create(NodeSpec::new("div").prop("label", "x")).unwrap();
        let named = tree
            .create(NodeSpec::new("div").id("named").prop("label", "x"))
            .unwrap();
        assert_eq!(tree.dump_node(anonymous).unwrap(), None);
        assert_eq!(tree.dump_node(named).unwrap(), Some(json!({"label": "x"})));

        tree.load_node(named, json!({"label": "y"})).unwrap();
        assert_eq!(tree.prop(named, "label").unwrap(), Some(&json!("y")));
    }

    #[test]
    fn typed_state_access() {
        let (_dir, mut tree) = local_tree();
        let (_, _, length, width) = form_tree(&mut tree);
        tree.state_mut::<FieldState>(length).unwrap().set("value", 9);
        assert_eq!(
            tree.state::<FieldState>(length).unwrap().get("value"),
            Some(&json!(9))
        );
        assert!(tree.state::<FieldState>(width).is_none());
    }

    #[test]
    fn storage_is_scoped_to_full_id() {
        let (dir, mut tree) = local_tree();
        let (_, _, length, _) = form_tree(&mut tree);
        let mut storage = tree.storage(length).unwrap();
        storage.set("blob", b"abc".as_slice()).unwrap();
        let report = storage.flush().unwrap();
        assert_eq!(report.written, 1);

        let hash = tree.node(length).unwrap().storage().metadata().get("blob").unwrap().hash;
        assert_eq!(
            hash,
            compsync_store::ContentHasher::STORAGE.hash("form.length", b"abc")
        );
        assert!(dir.path().join(hash.to_hex()).exists());
    }

    #[test]
    fn unmount_removes_subtree() {
        let (_dir, mut tree) = local_tree();
        let (root, form, length, _) = form_tree(&mut tree);
        tree.full_id(length).unwrap();
        tree.unmount(form).unwrap();
        assert!(!tree.contains(length));
        assert!(tree.children(root).unwrap().is_empty());
        assert_eq!(tree.status().component("form.length"), None);
    }
}
