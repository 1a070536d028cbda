//! Component nodes and their construction spec.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use compsync_store::ContentStore;
use compsync_types::{Document, Handle};
use serde_json::{json, Value};

use crate::error::TreeResult;
use crate::event::Handler;
use crate::state::ComponentState;
use crate::tree::ComponentTree;

/// Name of the slot holding direct UI children.
pub const DEFAULT_SLOT: &str = "default";

/// Deferred child construction for a slot. Called with the value sent by the
/// renderer when it asks for the slot's content.
pub type SlotFactory = Rc<dyn Fn(&mut ComponentTree, Option<&Value>) -> TreeResult<Vec<SlotItem>>>;

/// One entry of a materialized slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotItem {
    /// A child component.
    Node(Handle),
    /// Literal text rendered in place.
    Text(String),
}

impl SlotItem {
    /// Reference sent to the renderer: `{"compId": <handle>}` or `{"compId": "<text>"}`.
    pub fn to_frontend_ref(&self) -> Value {
        match self {
            Self::Node(handle) => json!({ "compId": handle.get() }),
            Self::Text(text) => json!({ "compId": text }),
        }
    }

    pub fn handle(&self) -> Option<Handle> {
        match self {
            Self::Node(handle) => Some(*handle),
            Self::Text(_) => None,
        }
    }
}

impl From<Handle> for SlotItem {
    fn from(handle: Handle) -> Self {
        Self::Node(handle)
    }
}

impl From<&str> for SlotItem {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// A named slot: either materialized items or a lazy factory.
#[derive(Clone)]
pub enum Slot {
    Items(Vec<SlotItem>),
    Lazy(SlotFactory),
}

impl Slot {
    /// Handles of materialized children; empty for lazy slots.
    pub fn child_handles(&self) -> impl Iterator<Item = Handle> + '_ {
        let items: &[SlotItem] = match self {
            Self::Items(items) => items,
            Self::Lazy(_) => &[],
        };
        items.iter().filter_map(SlotItem::handle)
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::Lazy(_))
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Items(items) => f.debug_tuple("Items").field(items).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// A live component instance.
pub struct Node {
    pub(crate) handle: Handle,
    pub(crate) component: String,
    pub(crate) local_id: String,
    pub(crate) namespace: bool,
    pub(crate) parent: Option<Handle>,
    /// Inherited namespace scope; `None` until identity is resolved.
    pub(crate) scope: Option<String>,
    pub(crate) props: Document,
    pub(crate) slots: BTreeMap<String, Slot>,
    pub(crate) state: Option<Box<dyn ComponentState>>,
    pub(crate) storage: ContentStore,
    pub(crate) callbacks: HashMap<String, Vec<Handler>>,
    /// Nesting depth of active update guards.
    pub(crate) update_block: u32,
}

impl Node {
    pub(crate) fn new(handle: Handle, component: String, local_id: String, namespace: bool) -> Self {
        Self {
            handle,
            component,
            local_id,
            namespace,
            parent: None,
            scope: None,
            props: Document::new(),
            slots: BTreeMap::new(),
            state: None,
            storage: ContentStore::new(),
            callbacks: HashMap::new(),
            update_block: 0,
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Renderer component type, e.g. `"QInput"`.
    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn is_namespace(&self) -> bool {
        self.namespace
    }

    pub fn parent(&self) -> Option<Handle> {
        self.parent
    }

    pub fn props(&self) -> &Document {
        &self.props
    }

    pub fn slots(&self) -> &BTreeMap<String, Slot> {
        &self.slots
    }

    pub fn storage(&self) -> &ContentStore {
        &self.storage
    }

    /// Full id if it has already been resolved.
    pub fn cached_full_id(&self) -> Option<String> {
        self.scope
            .as_deref()
            .map(|scope| compsync_types::join_full_id(scope, &self.local_id))
    }

    /// Event names with at least one registered handler, sorted.
    pub fn registered_events(&self) -> Vec<String> {
        let mut events: Vec<String> = self.callbacks.keys().cloned().collect();
        events.sort();
        events
    }

    pub fn is_update_blocked(&self) -> bool {
        self.update_block > 0
    }

    /// Handles of all materialized children, slot by slot.
    pub(crate) fn child_handles(&self) -> Vec<Handle> {
        self.slots.values().flat_map(Slot::child_handles).collect()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("handle", &self.handle)
            .field("component", &self.component)
            .field("local_id", &self.local_id)
            .field("namespace", &self.namespace)
            .field("parent", &self.parent)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

/// Everything needed to construct a node.
pub struct NodeSpec {
    pub(crate) component: String,
    pub(crate) id: String,
    pub(crate) namespace: bool,
    pub(crate) children: Vec<SlotItem>,
    pub(crate) slots: BTreeMap<String, Slot>,
    pub(crate) props: Document,
    pub(crate) state: Option<Box<dyn ComponentState>>,
}

impl NodeSpec {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            id: String::new(),
            namespace: false,
            children: Vec::new(),
            slots: BTreeMap::new(),
            props: Document::new(),
            state: None,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Make the node a namespace boundary for its descendants.
    pub fn namespace(mut self) -> Self {
        self.namespace = true;
        self
    }

    pub fn child(mut self, item: impl Into<SlotItem>) -> Self {
        self.children.push(item.into());
        self
    }

    pub fn children(mut self, items: impl IntoIterator<Item = Handle>) -> Self {
        self.children.extend(items.into_iter().map(SlotItem::Node));
        self
    }

    pub fn slot(mut self, name: impl Into<String>, items: Vec<SlotItem>) -> Self {
        self.slots.insert(name.into(), Slot::Items(items));
        self
    }

    pub fn lazy_slot(mut self, name: impl Into<String>, factory: SlotFactory) -> Self {
        self.slots.insert(name.into(), Slot::Lazy(factory));
        self
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn style(self, style: impl Into<String>) -> Self {
        self.prop("style", style.into())
    }

    /// Inline style from key/value pairs, joined as `k:v;k:v`.
    pub fn style_map<'a>(self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let style = pairs
            .into_iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect::<Vec<_>>()
            .join(";");
        self.style(style)
    }

    pub fn class<'a>(self, classes: impl IntoIterator<Item = &'a str>) -> Self {
        let class = classes.into_iter().collect::<Vec<_>>().join(" ");
        self.prop("class", class)
    }

    pub fn state(mut self, state: impl ComponentState) -> Self {
        self.state = Some(Box::new(state));
        self
    }
}
