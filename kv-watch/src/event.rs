use kv_core::prelude::*;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum EventKind {
    Added,
    Updated,
    Deleted,
    Heartbeat,
}

impl EventKind {
    // The event names the browser's EventSource listens for
    pub fn wire_name(&self) -> &'static str {
        match self {
            EventKind::Added => "add",
            EventKind::Updated => "update",
            EventKind::Deleted => "delete",
            EventKind::Heartbeat => "ping",
        }
    }
}

// A CanonicalEvent is immutable once it's been created; the broker wraps it in an Arc and every
// client outbox shares the same copy.
#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalEvent {
    pub kind: EventKind,
    pub obj: Option<DynamicObject>,
}

impl CanonicalEvent {
    pub fn added(obj: DynamicObject) -> CanonicalEvent {
        CanonicalEvent { kind: EventKind::Added, obj: Some(obj) }
    }

    pub fn updated(obj: DynamicObject) -> CanonicalEvent {
        CanonicalEvent { kind: EventKind::Updated, obj: Some(obj) }
    }

    pub fn deleted(obj: DynamicObject) -> CanonicalEvent {
        CanonicalEvent { kind: EventKind::Deleted, obj: Some(obj) }
    }

    pub fn heartbeat() -> CanonicalEvent {
        CanonicalEvent { kind: EventKind::Heartbeat, obj: None }
    }

    pub fn namespaced_name(&self) -> Option<String> {
        self.obj.as_ref().map(|o| o.namespaced_name())
    }
}
