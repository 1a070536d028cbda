//! Outgoing notifications to the renderer.

use std::cell::RefCell;
use std::rc::Rc;

use compsync_types::{Document, Handle};
use serde_json::{json, Value};

/// A per-node update message.
#[derive(Clone, Debug, PartialEq)]
pub enum FrontendUpdate {
    /// Re-read the whole component.
    Refresh,
    /// Partial prop map.
    Props(Document),
    /// Partial slot map; children are `{"compId": ..}` references.
    Slots(Document),
}

impl FrontendUpdate {
    /// Wire form of the message.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Refresh => json!({}),
            Self::Props(props) => json!({ "props": props }),
            Self::Slots(slots) => json!({ "slots": slots }),
        }
    }
}

/// Sink for renderer notifications.
pub trait Frontend {
    fn update_component(&mut self, handle: Handle, update: FrontendUpdate);

    /// The renderer should discard its tree and re-initialize from `root`.
    fn reset_app(&mut self, _root: Handle) {}
}

/// Drops every notification.
#[derive(Debug, Default)]
pub struct NullFrontend;

impl Frontend for NullFrontend {
    fn update_component(&mut self, _handle: Handle, _update: FrontendUpdate) {}
}

/// Records notifications in a shared log; clones observe the same log.
#[derive(Clone, Debug, Default)]
pub struct RecordingFrontend {
    updates: Rc<RefCell<Vec<(Handle, FrontendUpdate)>>>,
    resets: Rc<RefCell<Vec<Handle>>>,
}

impl RecordingFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<(Handle, FrontendUpdate)> {
        self.updates.borrow().clone()
    }

    pub fn updates_for(&self, handle: Handle) -> Vec<FrontendUpdate> {
        self.updates
            .borrow()
            .iter()
            .filter(|(h, _)| *h == handle)
            .map(|(_, u)| u.clone())
            .collect()
    }

    pub fn resets(&self) -> Vec<Handle> {
        self.resets.borrow().clone()
    }

    pub fn clear(&self) {
        self.updates.borrow_mut().clear();
        self.resets.borrow_mut().clear();
    }
}

impl Frontend for RecordingFrontend {
    fn update_component(&mut self, handle: Handle, update: FrontendUpdate) {
        self.updates.borrow_mut().push((handle, update));
    }

    fn reset_app(&mut self, root: Handle) {
        self.resets.borrow_mut().push(root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_is_shared_between_clones() {
        let recorder = RecordingFrontend::new();
        let mut sink = recorder.clone();
        sink.update_component(Handle::new(1), FrontendUpdate::Refresh);
        sink.reset_app(Handle::new(0));
        assert_eq!(recorder.updates_for(Handle::new(1)), vec![FrontendUpdate::Refresh]);
        assert_eq!(recorder.resets(), vec![Handle::new(0)]);
        recorder.clear();
        assert!(recorder.updates().is_empty());
    }

    #[test]
    fn wire_form() {
        let mut props = Document::new();
        props.insert("label".into(), json!("Length"));
        assert_eq!(
            FrontendUpdate::Props(props).to_json(),
            json!({"props": {"label": "Length"}})
        );
    }
}
