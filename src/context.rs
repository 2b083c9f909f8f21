//! `ExecutionContext`: variable bindings, clause auxiliaries, service lookup,
//! event emission and response capture for one feature-set activation
//! (spec.md §4.B).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptors::Span;
use crate::error::{ActionError, Result};
use crate::events::EventBus;
use crate::repository::RepositoryStore;
use crate::value::TypedValue;

/// Type-erased service map, one entry per concrete service type. The type IS
/// the key, mirroring the rest of this ecosystem's dependency-injection idiom.
struct ServiceMap(HashMap<TypeId, Box<dyn Any + Send + Sync>>);

impl ServiceMap {
    fn new() -> Self {
        Self(HashMap::new())
    }

    fn insert<S: Send + Sync + 'static>(&mut self, svc: S) {
        self.0.insert(TypeId::of::<S>(), Box::new(svc));
    }

    fn get<S: Send + Sync + 'static>(&self) -> Option<&S> {
        self.0.get(&TypeId::of::<S>()).and_then(|b| b.downcast_ref())
    }
}

/// A single context entry (spec.md §3 Binding).
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub value: TypedValue,
    pub mutable: bool,
    pub defined_at: Span,
}

/// Output formatting mode consulted by `Log` and other response-shaping
/// actions (spec.md §4.B).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputContext {
    Machine,
    Human,
    Developer,
}

/// The reserved auxiliary binding names the executor writes before invoking
/// an action (spec.md §3, §4.E step 2). Always rebindable, cleared at the
/// start of every statement.
pub const RESERVED_NAMES: &[&str] = &[
    "_literal_",
    "_expression_",
    "_with_",
    "_to_",
    "_from_",
    "_where_field_",
    "_where_op_",
    "_where_value_",
    "_by_pattern_",
    "_by_flags_",
    "_aggregation_type_",
    "_aggregation_field_",
    "_result_expression_",
    "_expression_name_",
    "_object_",
];

fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// The terminal status/reason/data triple produced by `Return` (spec.md §3).
#[derive(Debug, Clone)]
pub struct Response {
    pub status: String,
    pub reason: String,
    pub data: indexmap::IndexMap<String, TypedValue>,
}

/// Owns variable bindings, clause auxiliaries, service lookup, event
/// emission and response capture for exactly one feature-set activation.
/// Never shared across activations (spec.md §5).
pub struct ExecutionContext {
    bindings: HashMap<String, Binding>,
    services: ServiceMap,
    event_bus: Option<Arc<EventBus>>,
    repository: Option<Arc<RepositoryStore>>,
    response: Option<Response>,
    waiting: bool,
    pub output_context: OutputContext,
    pub is_compiled: bool,
    pub business_activity: String,
    pub feature_set_name: String,
}

impl ExecutionContext {
    pub fn new(business_activity: impl Into<String>, feature_set_name: impl Into<String>) -> Self {
        Self {
            bindings: HashMap::new(),
            services: ServiceMap::new(),
            event_bus: None,
            repository: None,
            response: None,
            waiting: false,
            output_context: OutputContext::Machine,
            is_compiled: false,
            business_activity: business_activity.into(),
            feature_set_name: feature_set_name.into(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn with_repository(mut self, repo: Arc<RepositoryStore>) -> Self {
        self.repository = Some(repo);
        self
    }

    /// Fork a child context seeded with the current bindings, for `When`'s
    /// nested feature-set invocation (spec.md §4.D Test family).
    pub fn fork_child(&self, feature_set_name: impl Into<String>) -> Self {
        let mut child = Self::new(self.business_activity.clone(), feature_set_name);
        child.event_bus = self.event_bus.clone();
        child.repository = self.repository.clone();
        child.output_context = self.output_context;
        child.is_compiled = self.is_compiled;
        for (name, binding) in &self.bindings {
            if !is_reserved(name) {
                child.bindings.insert(name.clone(), binding.clone());
            }
        }
        child
    }

    /// `bind(name, value, allowRebind=false)` (spec.md §4.B).
    pub fn bind(&mut self, name: &str, value: TypedValue, allow_rebind: bool) -> Result<()> {
        self.bind_at(name, value, allow_rebind, Span::default())
    }

    pub fn bind_at(
        &mut self,
        name: &str,
        value: TypedValue,
        allow_rebind: bool,
        span: Span,
    ) -> Result<()> {
        if !is_reserved(name) && self.bindings.contains_key(name) && !allow_rebind {
            return Err(ActionError::ImmutabilityViolation(name.to_string()));
        }
        self.bindings.insert(
            name.to_string(),
            Binding {
                name: name.to_string(),
                value,
                mutable: allow_rebind,
                defined_at: span,
            },
        );
        Ok(())
    }

    /// `resolve(name) -> TypedValue?`. Does not resolve nested dot paths.
    pub fn resolve(&self, name: &str) -> Option<&TypedValue> {
        self.bindings.get(name).map(|b| &b.value)
    }

    /// Kept distinct from `resolve` per spec.md §4.B to emphasize that
    /// consumers reason about variants rather than a plain lookup.
    pub fn resolve_typed(&self, name: &str) -> Option<&TypedValue> {
        self.resolve(name)
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Clears every reserved `_..._` auxiliary at statement boundary
    /// (spec.md §4.E step 1).
    pub fn clear_auxiliaries(&mut self) {
        for name in RESERVED_NAMES {
            self.bindings.remove(*name);
        }
    }

    pub fn register<S: Send + Sync + 'static>(&mut self, svc: S) {
        self.services.insert(svc);
    }

    pub fn service<S: Send + Sync + 'static>(&self) -> Option<&S> {
        self.services.get::<S>()
    }

    pub fn require_service<S: Send + Sync + 'static>(&self, name: &str) -> Result<&S> {
        self.service::<S>()
            .ok_or_else(|| ActionError::MissingService(name.to_string()))
    }

    pub fn event_bus(&self) -> Option<&Arc<EventBus>> {
        self.event_bus.as_ref()
    }

    pub fn repository(&self) -> Option<&Arc<RepositoryStore>> {
        self.repository.as_ref()
    }

    /// Fire-and-forget publish (spec.md §4.B `emit`).
    pub fn emit(&self, event: crate::events::Event) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }

    /// Awaits subscribers before returning; gives a happens-before with
    /// subsequent statements (spec.md §5 Ordering guarantees).
    pub async fn emit_and_track(&self, event: crate::events::Event) {
        if let Some(bus) = &self.event_bus {
            bus.publish_and_track(event).await;
        }
    }

    /// First call wins; subsequent calls are ignored (spec.md §4.B).
    pub fn set_response(&mut self, response: Response) {
        if self.response.is_none() {
            self.response = Some(response);
        }
    }

    pub fn response_captured(&self) -> bool {
        self.response.is_some()
    }

    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn enter_wait_state(&mut self) {
        self.waiting = true;
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_then_resolve_round_trips() {
        let mut ctx = ExecutionContext::new("Orders", "Place-Order");
        ctx.bind("x", TypedValue::Integer(1), false).unwrap();
        assert_eq!(ctx.resolve("x"), Some(&TypedValue::Integer(1)));
    }

    #[test]
    fn rebind_without_allow_fails() {
        let mut ctx = ExecutionContext::new("Orders", "Place-Order");
        ctx.bind("x", TypedValue::Integer(1), false).unwrap();
        let err = ctx.bind("x", TypedValue::Integer(2), false).unwrap_err();
        assert!(matches!(err, ActionError::ImmutabilityViolation(n) if n == "x"));
    }

    #[test]
    fn reserved_names_always_rebindable() {
        let mut ctx = ExecutionContext::new("Orders", "Place-Order");
        ctx.bind("_literal_", TypedValue::Integer(1), false).unwrap();
        ctx.bind("_literal_", TypedValue::Integer(2), false).unwrap();
        assert_eq!(ctx.resolve("_literal_"), Some(&TypedValue::Integer(2)));
    }

    #[test]
    fn clear_auxiliaries_removes_only_reserved() {
        let mut ctx = ExecutionContext::new("Orders", "Place-Order");
        ctx.bind("x", TypedValue::Integer(1), false).unwrap();
        ctx.bind("_literal_", TypedValue::Integer(2), false).unwrap();
        ctx.clear_auxiliaries();
        assert_eq!(ctx.resolve("x"), Some(&TypedValue::Integer(1)));
        assert_eq!(ctx.resolve("_literal_"), None);
    }

    #[test]
    fn set_response_first_call_wins() {
        let mut ctx = ExecutionContext::new("Orders", "Place-Order");
        ctx.set_response(Response {
            status: "OK".into(),
            reason: "a".into(),
            data: indexmap::IndexMap::new(),
        });
        ctx.set_response(Response {
            status: "Ignored".into(),
            reason: "b".into(),
            data: indexmap::IndexMap::new(),
        });
        assert_eq!(ctx.response().unwrap().status, "OK");
    }

    #[test]
    fn service_lookup_is_type_keyed() {
        let mut ctx = ExecutionContext::new("Orders", "Place-Order");
        ctx.register(42u32);
        assert_eq!(ctx.service::<u32>(), Some(&42));
        assert_eq!(ctx.service::<i64>(), None);
    }
}
