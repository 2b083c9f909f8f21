//! Event bus: typed pub/sub with `publish`/`publishAndTrack` (spec.md §4.F).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::value::TypedValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Created,
    Updated,
    Deleted,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Created => "created",
            ChangeType::Updated => "updated",
            ChangeType::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DomainEvent {
    pub event_type: String,
    pub payload: IndexMap<String, TypedValue>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RepositoryChangedEvent {
    pub repository_name: String,
    pub change_type: ChangeType,
    pub entity_id: Option<String>,
    pub new_value: Option<TypedValue>,
    pub old_value: Option<TypedValue>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StateTransitionEvent {
    pub field_name: String,
    pub object_name: String,
    pub from_state: String,
    pub to_state: String,
    pub entity_id: Option<String>,
    pub entity: TypedValue,
    pub timestamp: DateTime<Utc>,
}

/// Service lifecycle and message events (spec.md §3 Events: "plus service
/// lifecycle and message events"). `kind` carries the specific name
/// (`MessageSentEvent`, `NotificationSentEvent`, `BroadcastRequestedEvent`,
/// `VariablePublishedEvent`, …) since the spec doesn't enumerate a closed set.
#[derive(Debug, Clone)]
pub struct ServiceEvent {
    pub kind: String,
    pub payload: IndexMap<String, TypedValue>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum Event {
    Domain(DomainEvent),
    RepositoryChanged(RepositoryChangedEvent),
    StateTransition(StateTransitionEvent),
    Service(ServiceEvent),
}

impl Event {
    pub fn domain(event_type: impl Into<String>, payload: IndexMap<String, TypedValue>) -> Self {
        Event::Domain(DomainEvent {
            event_type: event_type.into(),
            payload,
            timestamp: Utc::now(),
        })
    }

    pub fn service(kind: impl Into<String>, payload: IndexMap<String, TypedValue>) -> Self {
        Event::Service(ServiceEvent {
            kind: kind.into(),
            payload,
            timestamp: Utc::now(),
        })
    }

    /// The dispatch tag used for exact subscriber matching.
    pub fn tag(&self) -> String {
        match self {
            Event::Domain(_) => "DomainEvent".to_string(),
            Event::RepositoryChanged(_) => "RepositoryChangedEvent".to_string(),
            Event::StateTransition(_) => "StateTransitionEvent".to_string(),
            Event::Service(e) => e.kind.clone(),
        }
    }
}

#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &Event);
}

/// Process-wide pub/sub. Subscribers are keyed by event-type tag; `DomainEvent`
/// additionally routes through a wildcard keyed by business activity
/// `"<name> Handler"` (spec.md §4.F, GLOSSARY "Domain event").
pub struct EventBus {
    subscribers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribes a handler under a tag: either an exact event-type tag
    /// (`"RepositoryChangedEvent"`) or a business-activity wildcard key
    /// (`"Order Handler"`) for `DomainEvent` routing.
    pub fn subscribe(&self, tag: impl Into<String>, handler: Arc<dyn EventHandler>) {
        self.subscribers
            .write()
            .unwrap()
            .entry(tag.into())
            .or_default()
            .push(handler);
    }

    fn matching(&self, event: &Event) -> Vec<Arc<dyn EventHandler>> {
        let subs = self.subscribers.read().unwrap();
        let mut matched: Vec<Arc<dyn EventHandler>> = Vec::new();
        if let Some(v) = subs.get(event.tag().as_str()) {
            matched.extend(v.iter().cloned());
        }
        if let Event::Domain(d) = event {
            let wildcard_key = format!("{} Handler", d.event_type);
            if let Some(v) = subs.get(wildcard_key.as_str()) {
                matched.extend(v.iter().cloned());
            }
        }
        matched
    }

    /// Fire-and-forget: subscribers run on spawned tasks, no ordering
    /// guarantee with the caller's subsequent statements (spec.md §5).
    pub fn publish(&self, event: Event) {
        for handler in self.matching(&event) {
            let event = event.clone();
            tokio::spawn(async move {
                handler.handle(&event).await;
            });
        }
    }

    /// Awaits every matched subscriber before returning, giving a
    /// happens-before with whatever the caller does next (spec.md §5).
    pub async fn publish_and_track(&self, event: Event) {
        let handlers = self.matching(&event);
        let futures = handlers.into_iter().map(|handler| {
            let event = event.clone();
            async move { handler.handle(&event).await }
        });
        futures::future::join_all(futures).await;
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
