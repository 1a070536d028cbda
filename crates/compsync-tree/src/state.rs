//! Component-specific persisted state.

use std::any::Any;

use compsync_types::Document;
use serde_json::Value;

/// Dump/load capability of a component.
///
/// The tree never looks inside the payload; it only cares whether `dump`
/// returned something and, for diffing, whether fields compare equal.
pub trait ComponentState: 'static {
    /// Current state as a JSON value, or `None` if there is nothing to persist.
    fn dump(&self) -> Option<Value>;

    /// Restore from a value previously returned by `dump`.
    fn load(&mut self, data: Value);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A flat field map, the state of most input-like components.
///
/// `dump` returns the map as an object (or `None` when empty) and `load`
/// merges the incoming fields over the current ones, so a diffed document
/// that omits default-valued fields restores correctly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldState {
    fields: Document,
}

impl FieldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field initializer.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn fields(&self) -> &Document {
        &self.fields
    }
}

impl ComponentState for FieldState {
    fn dump(&self) -> Option<Value> {
        if self.fields.is_empty() {
            None
        } else {
            Some(Value::Object(self.fields.clone()))
        }
    }

    fn load(&mut self, data: Value) {
        if let Value::Object(fields) = data {
            self.fields.extend(fields);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
