//! Per-node event registration and synchronous dispatch.

use compsync_types::Handle;
use serde_json::Value;
use tracing::warn;

use crate::error::TreeResult;
use crate::event::{EmitOutcome, Event, Handler, HandlerFailure};
use crate::tree::{ComponentTree, Order};

/// Event names with reserved meaning.
pub mod lifecycle {
    /// Node attached to a live, rendered tree.
    pub const MOUNTED: &str = "mounted";
    /// About to be serialized.
    pub const BEFORE_SAVE: &str = "before_save";
    /// Storage flush point.
    pub const SAVE: &str = "save";
    /// State restore point.
    pub const LOAD: &str = "load";
    /// About to be detached.
    pub const BEFORE_UNMOUNT: &str = "before_unmount";
}

impl ComponentTree {
    /// Append `handler` to each of `events` on `handle`.
    pub fn on<S: AsRef<str>>(
        &mut self,
        handle: Handle,
        events: impl IntoIterator<Item = S>,
        handler: Handler,
    ) -> TreeResult<()> {
        let node = self.node_mut(handle)?;
        for event in events {
            node.callbacks
                .entry(event.as_ref().to_string())
                .or_default()
                .push(handler.clone());
        }
        Ok(())
    }

    /// Like [`ComponentTree::on`], but discards earlier handlers for each event first.
    pub fn replace_handlers<S: AsRef<str>>(
        &mut self,
        handle: Handle,
        events: impl IntoIterator<Item = S>,
        handler: Handler,
    ) -> TreeResult<()> {
        let node = self.node_mut(handle)?;
        for event in events {
            node.callbacks
                .insert(event.as_ref().to_string(), vec![handler.clone()]);
        }
        Ok(())
    }

    pub fn on_mounted(&mut self, handle: Handle, handler: Handler) -> TreeResult<()> {
        self.on(handle, [lifecycle::MOUNTED], handler)
    }

    pub fn on_before_save(&mut self, handle: Handle, handler: Handler) -> TreeResult<()> {
        self.on(handle, [lifecycle::BEFORE_SAVE], handler)
    }

    pub fn on_save(&mut self, handle: Handle, handler: Handler) -> TreeResult<()> {
        self.on(handle, [lifecycle::SAVE], handler)
    }

    pub fn on_load(&mut self, handle: Handle, handler: Handler) -> TreeResult<()> {
        self.on(handle, [lifecycle::LOAD], handler)
    }

    pub fn on_before_unmount(&mut self, handle: Handle, handler: Handler) -> TreeResult<()> {
        self.on(handle, [lifecycle::BEFORE_UNMOUNT], handler)
    }

    /// Run every handler registered for `name` on `handle`, in registration order.
    ///
    /// A failing handler is logged and recorded in the outcome; the remaining
    /// handlers still run.
    pub fn emit(&mut self, handle: Handle, name: &str, value: Option<Value>) -> TreeResult<EmitOutcome> {
        let node = self.node(handle)?;
        let handlers = node.callbacks.get(name).cloned().unwrap_or_default();
        let component_type = node.component.clone();
        let component_id = node
            .cached_full_id()
            .unwrap_or_else(|| node.local_id.clone());

        self.status
            .capture(name, component_id.clone(), handle, &component_type);

        let event = Event::new(name, handle, value);
        let mut outcome = EmitOutcome::default();
        for handler in handlers {
            outcome.invoked += 1;
            match handler.call(self, &event) {
                Ok(Some(value)) => outcome.value = Some(value),
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        %handle,
                        component_id = %component_id,
                        component_type = %component_type,
                        event = name,
                        error = %err,
                        "event handler failed"
                    );
                    outcome.failures.push(HandlerFailure {
                        event: name.to_string(),
                        handle,
                        component_id: component_id.clone(),
                        component_type: component_type.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(outcome)
    }

    /// Emit `name` on every node of the subtree at `root`, children first.
    pub fn emit_recursive(
        &mut self,
        root: Handle,
        name: &str,
        value: Option<Value>,
    ) -> TreeResult<EmitOutcome> {
        let mut total = EmitOutcome::default();
        self.recurse(root, Order::ChildrenFirst, |tree, handle| {
            total.merge(tree.emit(handle, name, value.clone())?);
            Ok(())
        })?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use compsync_store::{LocalCache, Persistence};
    use serde_json::json;

    use super::*;
    use crate::node::NodeSpec;

    fn tree() -> (tempfile::TempDir, ComponentTree) {
        let dir = tempfile::tempdir().unwrap();
        let tree = ComponentTree::new(Persistence::local(LocalCache::new(dir.path())));
        (dir, tree)
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let (_dir, mut tree) = tree();
        let node = tree.create(NodeSpec::new("QBtn")).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = Rc::clone(&log);
            tree.on(
                node,
                ["click"],
                Handler::plain(move |_| {
                    log.borrow_mut().push(i);
                    Ok(None)
                }),
            )
            .unwrap();
        }
        let outcome = tree.emit(node, "click", None).unwrap();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert_eq!(outcome.invoked, 3);
    }

    #[test]
    fn failing_handler_does_not_stop_dispatch() {
        let (_dir, mut tree) = tree();
        let node = tree
            .create(NodeSpec::new("QBtn").id("ok_button"))
            .unwrap();
        let reached = Rc::new(RefCell::new(false));
        tree.on(node, ["click"], Handler::plain(|_| Err("boom".into())))
            .unwrap();
        let flag = Rc::clone(&reached);
        tree.on(
            node,
            ["click"],
            Handler::plain(move |_| {
                *flag.borrow_mut() = true;
                Ok(Some(json!("done")))
            }),
        )
        .unwrap();

        let outcome = tree.emit(node, "click", None).unwrap();
        assert!(*reached.borrow());
        assert_eq!(outcome.value, Some(json!("done")));
        assert_eq!(outcome.failures.len(), 1);
        let failure = &outcome.failures[0];
        assert_eq!(failure.event, "click");
        assert_eq!(failure.component_id, "ok_button");
        assert_eq!(failure.component_type, "QBtn");
        assert_eq!(failure.message, "boom");
    }

    #[test]
    fn event_handlers_receive_value() {
        let (_dir, mut tree) = tree();
        let node = tree.create(NodeSpec::new("QInput")).unwrap();
        tree.on(
            node,
            ["update:model-value"],
            Handler::event(|tree, event| {
                let value = event.value.clone().unwrap_or(Value::Null);
                tree.set_prop(event.component, "model-value", value)?;
                Ok(None)
            }),
        )
        .unwrap();
        tree.emit(node, "update:model-value", Some(json!(42)))
            .unwrap();
        assert_eq!(tree.prop(node, "model-value").unwrap(), Some(&json!(42)));
    }

    #[test]
    fn bound_arg_overrides_event_arg() {
        let (_dir, mut tree) = tree();
        let node = tree.create(NodeSpec::new("QBtn")).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second"] {
            let seen = Rc::clone(&seen);
            tree.on(
                node,
                ["click"],
                Handler::bound(tag.to_string(), move |_, event| {
                    seen.borrow_mut()
                        .push(event.arg::<String>().cloned().unwrap_or_default());
                    Ok(None)
                }),
            )
            .unwrap();
        }
        tree.emit(node, "click", None).unwrap();
        assert_eq!(*seen.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn replace_handlers_clears_existing() {
        let (_dir, mut tree) = tree();
        let node = tree.create(NodeSpec::new("QBtn")).unwrap();
        tree.on(node, ["click"], Handler::plain(|_| Ok(Some(json!(1)))))
            .unwrap();
        tree.replace_handlers(node, ["click"], Handler::plain(|_| Ok(Some(json!(2)))))
            .unwrap();
        let outcome = tree.emit(node, "click", None).unwrap();
        assert_eq!(outcome.invoked, 1);
        assert_eq!(outcome.value, Some(json!(2)));
    }

    #[test]
    fn emit_recursive_is_post_order() {
        let (_dir, mut tree) = tree();
        let log = Rc::new(RefCell::new(Vec::new()));
        let leaf = tree.create(NodeSpec::new("span")).unwrap();
        let mid = tree.create(NodeSpec::new("div").child(leaf)).unwrap();
        let root = tree.create(NodeSpec::new("App").child(mid)).unwrap();
        for handle in [root, mid, leaf] {
            let log = Rc::clone(&log);
            tree.on_before_save(
                handle,
                Handler::plain(move |_| {
                    log.borrow_mut().push(handle);
                    Ok(None)
                }),
            )
            .unwrap();
        }
        tree.emit_recursive(root, lifecycle::BEFORE_SAVE, None)
            .unwrap();
        assert_eq!(*log.borrow(), vec![leaf, mid, root]);
    }

    #[test]
    fn failing_node_does_not_stop_broadcast() {
        let (_dir, mut tree) = tree();
        let broken = tree.create(NodeSpec::new("QInput").id("broken")).unwrap();
        let sibling = tree.create(NodeSpec::new("QInput").id("sibling")).unwrap();
        let root = tree
            .create(NodeSpec::new("App").children([broken, sibling]))
            .unwrap();
        tree.set_root(root).unwrap();

        tree.on_before_save(broken, Handler::plain(|_| Err("cannot stage".into())))
            .unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        for handle in [sibling, root] {
            let log = Rc::clone(&log);
            tree.on_before_save(
                handle,
                Handler::plain(move |_| {
                    log.borrow_mut().push(handle);
                    Ok(None)
                }),
            )
            .unwrap();
        }

        let outcome = tree
            .emit_recursive(root, lifecycle::BEFORE_SAVE, None)
            .unwrap();
        assert_eq!(*log.borrow(), vec![sibling, root]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].handle, broken);
        assert_eq!(outcome.failures[0].message, "cannot stage");
        assert!(!outcome.is_ok());
    }

    #[test]
    fn save_broadcast_flushes_storage() {
        let (dir, mut tree) = tree();
        let child = tree.create(NodeSpec::new("QInput").id("mesh")).unwrap();
        let root = tree.create(NodeSpec::new("App").child(child)).unwrap();
        tree.set_root(root).unwrap();
        tree.storage(child).unwrap().set("blob", "abc").unwrap();

        let outcome = tree.emit_recursive(root, lifecycle::SAVE, None).unwrap();
        assert!(outcome.is_ok());
        assert!(!tree.node(child).unwrap().storage().is_dirty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn captured_events_when_enabled() {
        let (_dir, mut tree) = tree();
        let node = tree.create(NodeSpec::new("QBtn")).unwrap();
        tree.emit(node, "click", None).unwrap();
        assert!(tree.status().captured_events().is_empty());

        tree.status_mut().update(&json!({"capture_events": true}));
        tree.emit(node, "click", None).unwrap();
        let captured = tree.status().captured_events();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].event, "click");
        assert_eq!(captured[0].handle, node);
    }
}
