//! Per-tree id index and debug capture.

use std::backtrace::Backtrace;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use compsync_types::Handle;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{TreeError, TreeResult};

/// One dispatched event recorded while capture is enabled.
#[derive(Clone, Debug, Serialize)]
pub struct CapturedEvent {
    pub timestamp: DateTime<Utc>,
    pub event: String,
    pub component_id: String,
    pub handle: Handle,
    pub component_type: String,
    pub stack_trace: Option<String>,
}

/// State shared by every node of one tree.
///
/// Created with the tree and cleared when the tree is replaced.
#[derive(Debug, Default)]
pub struct AppStatus {
    pub capture_events: bool,
    pub capture_call_stack: bool,
    components_by_id: HashMap<String, Handle>,
    captured: Vec<CapturedEvent>,
}

impl AppStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` under `full_id`. Re-registering the same handle is a no-op.
    pub fn register(&mut self, full_id: &str, handle: Handle) -> TreeResult<()> {
        match self.components_by_id.get(full_id) {
            Some(existing) if *existing == handle => Ok(()),
            Some(existing) => Err(TreeError::DuplicateIdentifier {
                full_id: full_id.to_string(),
                existing: *existing,
                requested: handle,
            }),
            None => {
                debug!(%handle, full_id, "registered component");
                self.components_by_id.insert(full_id.to_string(), handle);
                Ok(())
            }
        }
    }

    /// Drop the entry for `full_id` if it belongs to `handle`.
    pub fn unregister(&mut self, full_id: &str, handle: Handle) {
        if self.components_by_id.get(full_id) == Some(&handle) {
            self.components_by_id.remove(full_id);
        }
    }

    /// Look up a component by full id.
    pub fn component(&self, full_id: &str) -> Option<Handle> {
        self.components_by_id.get(full_id).copied()
    }

    pub fn component_count(&self) -> usize {
        self.components_by_id.len()
    }

    /// Apply debug options sent by the renderer, e.g. `{"capture_events": true}`.
    /// Unknown keys and non-boolean values are ignored.
    pub fn update(&mut self, options: &Value) {
        if let Some(flag) = options.get("capture_events").and_then(Value::as_bool) {
            self.capture_events = flag;
        }
        if let Some(flag) = options.get("capture_call_stack").and_then(Value::as_bool) {
            self.capture_call_stack = flag;
        }
    }

    pub(crate) fn capture(
        &mut self,
        event: &str,
        component_id: String,
        handle: Handle,
        component_type: &str,
    ) {
        if !self.capture_events {
            return;
        }
        let stack_trace = self
            .capture_call_stack
            .then(|| Backtrace::force_capture().to_string());
        self.captured.push(CapturedEvent {
            timestamp: Utc::now(),
            event: event.to_string(),
            component_id,
            handle,
            component_type: component_type.to_string(),
            stack_trace,
        });
    }

    pub fn captured_events(&self) -> &[CapturedEvent] {
        &self.captured
    }

    pub fn take_captured_events(&mut self) -> Vec<CapturedEvent> {
        std::mem::take(&mut self.captured)
    }

    /// Forget every registration and captured event; flags are kept.
    pub fn clear(&mut self) {
        self.components_by_id.clear();
        self.captured.clear();
    }
}
