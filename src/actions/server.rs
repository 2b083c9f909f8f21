//! Server/lifecycle family (spec.md §4.D): `Start`, `Stop`, `Listen`,
//! `Connect`, `Broadcast`, `Close`, `Wait`/`Keepalive`/`Block`.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::events::Event;
use crate::registry::ActionImpl;
use crate::services::messaging::MessagingService;
use crate::services::server::{ServerKind, ServerService};
use crate::shutdown::ShutdownCoordinator;
use crate::value::TypedValue;

fn server_kind(base: &str) -> Result<ServerKind> {
    match base {
        "http-server" => Ok(ServerKind::Http),
        "socket-server" => Ok(ServerKind::Socket),
        "file-monitor" => Ok(ServerKind::FileMonitor),
        other => Err(ActionError::InvalidInput {
            message: "Start/Stop target must be http-server, socket-server, or file-monitor".to_string(),
            received: other.to_string(),
        }),
    }
}

/// `_with_` (map `{port}` or bare integer) / specifier-as-int / `_literal_`
/// (same shapes) / digits in `object.base` / the kind's default (spec.md §4.D).
fn resolve_descriptor(ctx: &ExecutionContext, object: &ObjectDescriptor, kind: ServerKind) -> String {
    let from_value = |v: &TypedValue| -> Option<String> {
        match v {
            TypedValue::Map(m) => m.get("port").and_then(|p| p.to_plain_string()),
            TypedValue::Integer(_) | TypedValue::Float(_) => v.to_plain_string(),
            _ => None,
        }
    };
    if let Some(value) = ctx.resolve("_with_").and_then(from_value) {
        return value;
    }
    if let Some(specifier) = object.specifiers.first() {
        if specifier.parse::<i64>().is_ok() {
            return specifier.clone();
        }
    }
    if let Some(value) = ctx.resolve("_literal_").and_then(from_value) {
        return value;
    }
    let digits: String = object.base.chars().filter(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        return digits;
    }
    kind.default_descriptor().to_string()
}

pub struct Start;

#[async_trait::async_trait]
impl ActionImpl for Start {
    fn role(&self) -> ActionRole {
        ActionRole::Server
    }

    fn verbs(&self) -> &[&'static str] {
        &["start"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::With, Preposition::At]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let kind = server_kind(&result.base)?;
        let descriptor = resolve_descriptor(ctx, object, kind);
        let server = ctx.require_service::<Arc<dyn ServerService>>("ServerService")?;
        let handle = server.start(kind, &descriptor).await?;

        let mut map = IndexMap::new();
        map.insert("kind".to_string(), TypedValue::String(result.base.clone()));
        map.insert("descriptor".to_string(), TypedValue::String(handle.descriptor));
        map.insert("running".to_string(), TypedValue::Boolean(handle.running));
        Ok(TypedValue::Map(map))
    }
}

pub struct Stop;

#[async_trait::async_trait]
impl ActionImpl for Stop {
    fn role(&self) -> ActionRole {
        ActionRole::Server
    }

    fn verbs(&self) -> &[&'static str] {
        &["stop"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::With, Preposition::At]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let kind = server_kind(&result.base)?;
        let descriptor = resolve_descriptor(ctx, object, kind);
        let server = ctx.require_service::<Arc<dyn ServerService>>("ServerService")?;
        server.stop(kind, &descriptor).await?;

        let mut map = IndexMap::new();
        map.insert("kind".to_string(), TypedValue::String(result.base.clone()));
        map.insert("descriptor".to_string(), TypedValue::String(descriptor));
        map.insert("running".to_string(), TypedValue::Boolean(false));
        Ok(TypedValue::Map(map))
    }
}

pub struct Listen;

#[async_trait::async_trait]
impl ActionImpl for Listen {
    fn role(&self) -> ActionRole {
        ActionRole::Server
    }

    fn verbs(&self) -> &[&'static str] {
        &["listen"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::On, Preposition::For]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let kind = server_kind(&result.base).unwrap_or(ServerKind::Http);
        let descriptor = resolve_descriptor(ctx, object, kind);
        let tag = object.specifiers.first().cloned().unwrap_or_else(|| "port".to_string());

        let mut map = IndexMap::new();
        map.insert("tag".to_string(), TypedValue::String(tag));
        map.insert("descriptor".to_string(), TypedValue::String(descriptor));
        Ok(TypedValue::Map(map))
    }
}

pub struct Connect;

#[async_trait::async_trait]
impl ActionImpl for Connect {
    fn role(&self) -> ActionRole {
        ActionRole::Server
    }

    fn verbs(&self) -> &[&'static str] {
        &["connect"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::To]
    }

    async fn execute(
        &self,
        _result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let host = object.base.clone();
        let port = object
            .specifiers
            .first()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(9000);
        let messaging = ctx.require_service::<Arc<dyn MessagingService>>("MessagingService")?;
        let outcome = messaging.connect(&host, port).await?;

        let mut map = IndexMap::new();
        map.insert("connectionId".to_string(), TypedValue::String(outcome.connection_id));
        map.insert("host".to_string(), TypedValue::String(outcome.host));
        map.insert("port".to_string(), TypedValue::Integer(outcome.port as i64));
        map.insert("success".to_string(), TypedValue::Boolean(outcome.success));
        Ok(TypedValue::Map(map))
    }
}

pub struct Broadcast;

#[async_trait::async_trait]
impl ActionImpl for Broadcast {
    fn role(&self) -> ActionRole {
        ActionRole::Server
    }

    fn verbs(&self) -> &[&'static str] {
        &["broadcast"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::With]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let data = ctx
            .resolve("_literal_")
            .or_else(|| ctx.resolve(&result.base))
            .or_else(|| ctx.resolve(&object.base))
            .cloned()
            .unwrap_or(TypedValue::Null);

        if let Some(service) = ctx.service::<Arc<dyn MessagingService>>() {
            let sent = service.broadcast(&data).await?;
            return Ok(TypedValue::Integer(sent as i64));
        }

        let mut payload = IndexMap::new();
        payload.insert("data".to_string(), data.clone());
        ctx.emit_and_track(Event::service("BroadcastRequestedEvent", payload)).await;
        Ok(data)
    }
}

pub struct Close;

#[async_trait::async_trait]
impl ActionImpl for Close {
    fn role(&self) -> ActionRole {
        ActionRole::Server
    }

    fn verbs(&self) -> &[&'static str] {
        &["close"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::With]
    }

    async fn execute(
        &self,
        _result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        if let Some(messaging) = ctx.service::<Arc<dyn MessagingService>>() {
            messaging.close(&object.base).await?;
        }
        if let Some(kind) = server_kind(&object.base).ok() {
            if let Some(server) = ctx.service::<Arc<dyn ServerService>>() {
                let descriptor = object.specifiers.first().cloned().unwrap_or_default();
                server.stop(kind, &descriptor).await?;
            }
        }
        Ok(TypedValue::String(object.base.clone()))
    }
}

pub struct Wait;

#[async_trait::async_trait]
impl ActionImpl for Wait {
    fn role(&self) -> ActionRole {
        ActionRole::Server
    }

    fn verbs(&self) -> &[&'static str] {
        &["wait", "keepalive", "block"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::For]
    }

    async fn execute(
        &self,
        _result: &ResultDescriptor,
        _object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let coordinator = ctx
            .require_service::<Arc<ShutdownCoordinator>>("ShutdownCoordinator")?
            .clone();
        coordinator.install_signal_hooks().await;
        ctx.enter_wait_state();
        coordinator.wait().await;
        Ok(TypedValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::ObjectDescriptor as OD;
    use crate::services::server::NativeServerService;

    #[tokio::test]
    async fn start_http_server_resolves_literal_port() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.register::<Arc<dyn ServerService>>(Arc::new(NativeServerService::new()));
        let mut port_map = IndexMap::new();
        port_map.insert("port".to_string(), TypedValue::Integer(0));
        ctx.bind("_with_", TypedValue::Map(port_map), false).unwrap();
        let result = ResultDescriptor::new("http-server");
        let object = OD::new("api", Preposition::With);
        let outcome = Start.execute(&result, &object, &mut ctx).await.unwrap();
        match outcome {
            TypedValue::Map(m) => assert_eq!(m.get("running"), Some(&TypedValue::Boolean(true))),
            _ => panic!("expected map"),
        }
    }

    #[tokio::test]
    async fn start_unknown_kind_is_rejected() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.register::<Arc<dyn ServerService>>(Arc::new(NativeServerService::new()));
        let result = ResultDescriptor::new("smtp-server");
        let object = OD::new("mail", Preposition::With);
        let err = Start.execute(&result, &object, &mut ctx).await.unwrap_err();
        assert!(matches!(err, ActionError::InvalidInput { .. }));
    }
}
