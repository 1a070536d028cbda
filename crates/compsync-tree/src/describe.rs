//! Renderer init descriptors and lazy slot materialization.

use std::rc::Rc;

use compsync_types::Handle;
use serde_json::{json, Map, Value};

use crate::error::TreeResult;
use crate::event::{Event, Handler, HandlerResult};
use crate::node::{Slot, SlotFactory, SlotItem};
use crate::tree::ComponentTree;

/// Prefix of the event that asks for a lazy slot's children.
pub const CREATE_SLOT_PREFIX: &str = "create_slot_";

impl ComponentTree {
    /// Descriptor the renderer needs to instantiate `handle`:
    /// `{"type", "props", "slots", "events"}`.
    ///
    /// Lazy slots are described by their own name, and a `create_slot_<name>`
    /// handler is (re)registered that builds the slot's children on request.
    pub fn describe(&mut self, handle: Handle) -> TreeResult<Value> {
        let node = self.node(handle)?;
        let mut slots = Map::new();
        let mut lazy: Vec<(String, SlotFactory)> = Vec::new();
        for (name, slot) in node.slots() {
            match slot {
                Slot::Items(items) => {
                    let refs = items.iter().map(SlotItem::to_frontend_ref).collect();
                    slots.insert(name.clone(), Value::Array(refs));
                }
                Slot::Lazy(factory) => {
                    slots.insert(name.clone(), Value::String(name.clone()));
                    lazy.push((name.clone(), Rc::clone(factory)));
                }
            }
        }

        for (name, factory) in lazy {
            self.replace_handlers(
                handle,
                [format!("{CREATE_SLOT_PREFIX}{name}")],
                Handler::bound(factory, materialize_slot),
            )?;
        }

        let node = self.node(handle)?;
        Ok(json!({
            "type": node.component(),
            "props": node.props(),
            "slots": slots,
            "events": node.registered_events(),
        }))
    }
}

fn materialize_slot(tree: &mut ComponentTree, event: &Event) -> HandlerResult {
    let Some(factory) = event.arg::<SlotFactory>().cloned() else {
        return Err("create_slot handler called without a slot factory".into());
    };
    let items = factory(tree, event.value.as_ref())?;
    for child in items.iter().filter_map(SlotItem::handle) {
        tree.attach(child, event.component)?;
    }
    let refs = items.iter().map(SlotItem::to_frontend_ref).collect();
    Ok(Some(Value::Array(refs)))
}

#[cfg(test)]
mod tests {
    use compsync_store::{LocalCache, Persistence};

    use super::*;
    use crate::node::NodeSpec;

    #[test]
    fn describes_materialized_children() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = ComponentTree::new(Persistence::local(LocalCache::new(dir.path())));
        let child = tree.create(NodeSpec::new("span")).unwrap();
        let node = tree
            .create(NodeSpec::new("div").child(child).child("text").prop("label", "L"))
            .unwrap();

        let desc = tree.describe(node).unwrap();
        assert_eq!(desc["type"], json!("div"));
        assert_eq!(desc["props"], json!({"label": "L"}));
        assert_eq!(
            desc["slots"]["default"],
            json!([{"compId": child.get()}, {"compId": "text"}])
        );
        assert_eq!(desc["events"], json!(["save"]));
    }

    #[test]
    fn lazy_slot_registers_factory_handler() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = ComponentTree::new(Persistence::local(LocalCache::new(dir.path())));
        let factory: SlotFactory = Rc::new(
            |tree: &mut ComponentTree, value: Option<&Value>| -> TreeResult<Vec<SlotItem>> {
                let label = value.and_then(Value::as_str).unwrap_or("none").to_string();
                let child = tree.create(NodeSpec::new("span").prop("label", label))?;
                Ok(vec![SlotItem::Node(child)])
            },
        );
        let node = tree
            .create(NodeSpec::new("QExpansionItem").lazy_slot("body", factory))
            .unwrap();

        let desc = tree.describe(node).unwrap();
        assert_eq!(desc["slots"]["body"], json!("body"));
        assert_eq!(desc["events"], json!(["create_slot_body", "save"]));

        // Describing twice must not stack handlers.
        tree.describe(node).unwrap();
        let outcome = tree
            .emit(node, "create_slot_body", Some(json!("opened")))
            .unwrap();
        assert_eq!(outcome.invoked, 1);

        let refs = outcome.value.unwrap();
        let child = Handle::new(refs[0]["compId"].as_u64().unwrap());
        assert_eq!(tree.node(child).unwrap().parent(), Some(node));
        assert_eq!(tree.prop(child, "label").unwrap(), Some(&json!("opened")));
    }
}
