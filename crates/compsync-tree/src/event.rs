//! Events and event handlers.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use compsync_types::Handle;
use serde_json::Value;

use crate::tree::ComponentTree;

/// Error type returned by a failing handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// What a handler returns: an optional value for the emitter, or a failure.
pub type HandlerResult = Result<Option<Value>, HandlerError>;

type PlainFn = Rc<dyn Fn(&mut ComponentTree) -> HandlerResult>;
type EventFn = Rc<dyn Fn(&mut ComponentTree, &Event) -> HandlerResult>;

/// A dispatched event.
#[derive(Clone)]
pub struct Event {
    pub name: String,
    /// Component the event was emitted on.
    pub component: Handle,
    /// Registration-bound context; overwritten per handler for bound handlers.
    pub arg: Option<Rc<dyn Any>>,
    /// Payload from the emitting side.
    pub value: Option<Value>,
}

impl Event {
    pub fn new(name: impl Into<String>, component: Handle, value: Option<Value>) -> Self {
        Self {
            name: name.into(),
            component,
            arg: None,
            value,
        }
    }

    /// Bound argument downcast to `T`, if present and of that type.
    pub fn arg<T: 'static>(&self) -> Option<&T> {
        self.arg.as_deref().and_then(|arg| arg.downcast_ref::<T>())
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("component", &self.component)
            .field("arg", &self.arg.as_ref().map(|_| ".."))
            .field("value", &self.value)
            .finish()
    }
}

/// A registered callback. The variant is chosen at registration time.
#[derive(Clone)]
pub enum Handler {
    /// Called without the event.
    Plain(PlainFn),
    /// Called with the event as emitted.
    Event(EventFn),
    /// Called with the event after `arg` is replaced by the bound value.
    Bound { arg: Rc<dyn Any>, func: EventFn },
}

impl Handler {
    pub fn plain(f: impl Fn(&mut ComponentTree) -> HandlerResult + 'static) -> Self {
        Self::Plain(Rc::new(f))
    }

    pub fn event(f: impl Fn(&mut ComponentTree, &Event) -> HandlerResult + 'static) -> Self {
        Self::Event(Rc::new(f))
    }

    pub fn bound<A: Any>(
        arg: A,
        f: impl Fn(&mut ComponentTree, &Event) -> HandlerResult + 'static,
    ) -> Self {
        Self::Bound {
            arg: Rc::new(arg),
            func: Rc::new(f),
        }
    }

    pub(crate) fn call(&self, tree: &mut ComponentTree, event: &Event) -> HandlerResult {
        match self {
            Self::Plain(f) => f(tree),
            Self::Event(f) => f(tree, event),
            Self::Bound { arg, func } => {
                let mut bound = event.clone();
                bound.arg = Some(Rc::clone(arg));
                func(tree, &bound)
            }
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("Handler::Plain"),
            Self::Event(_) => f.write_str("Handler::Event"),
            Self::Bound { .. } => f.write_str("Handler::Bound"),
        }
    }
}

/// A handler that returned an error during dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerFailure {
    pub event: String,
    pub handle: Handle,
    /// Full id if resolvable, otherwise empty.
    pub component_id: String,
    pub component_type: String,
    pub message: String,
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "handler for {:?} on {} ({} {:?}) failed: {}",
            self.event, self.handle, self.component_type, self.component_id, self.message
        )
    }
}

/// Result of dispatching one event to one or more nodes.
#[derive(Debug, Default)]
pub struct EmitOutcome {
    /// Last non-`None` value returned by a successful handler.
    pub value: Option<Value>,
    pub failures: Vec<HandlerFailure>,
    /// Number of handlers invoked.
    pub invoked: usize,
}

impl EmitOutcome {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn merge(&mut self, other: EmitOutcome) {
        if other.value.is_some() {
            self.value = other.value;
        }
        self.failures.extend(other.failures);
        self.invoked += other.invoked;
    }
}
