//! Response family (spec.md §4.D): `Return`, `Throw`, `Log`, `Send`, `Store`,
//! `Write`, `Publish`, `Emit`, `Notify`.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::actions::support::flatten_dot_paths;
use crate::context::{ExecutionContext, OutputContext, Response, RESERVED_NAMES};
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::events::{ChangeType, Event, RepositoryChangedEvent};
use crate::registry::ActionImpl;
use crate::services::fs::FileSystemService;
use crate::services::logging::{LogTarget, LoggingService};
use crate::services::messaging::MessagingService;
use crate::value::TypedValue;

pub struct Return;

#[async_trait::async_trait]
impl ActionImpl for Return {
    fn role(&self) -> ActionRole {
        ActionRole::Response
    }

    fn verbs(&self) -> &[&'static str] {
        &["return"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::With, Preposition::To]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let mut data = IndexMap::new();
        if let Some(source) = ctx
            .resolve("_expression_")
            .or_else(|| ctx.resolve("_literal_"))
            .cloned()
            .or_else(|| ctx.resolve(&object.base).cloned())
        {
            assemble(&source, &mut data);
        }
        for specifier in &object.specifiers {
            if let Some(value) = ctx.resolve(specifier) {
                flatten_dot_paths(specifier, &value.clone(), &mut data);
            }
        }
        if data.is_empty() {
            for probe in ["greeting", "message", "result", "data", "output", "value"] {
                if let Some(value) = ctx.resolve(probe) {
                    data.insert("value".to_string(), value.clone());
                    break;
                }
            }
        }

        ctx.set_response(Response {
            status: result.base.clone(),
            reason: object.base.clone(),
            data: data.clone(),
        });
        Ok(TypedValue::Map(data))
    }
}

/// `_expression_`/`_literal_` source assembly: map flattens, list JSON-stringifies
/// under `value`, a JSON-object string re-parses under its own keys, any
/// other scalar lands under `value` (spec.md §4.D Return).
fn assemble(source: &TypedValue, out: &mut IndexMap<String, TypedValue>) {
    match source {
        TypedValue::Map(_) => flatten_dot_paths("", source, out),
        TypedValue::List(_) => {
            out.insert("value".to_string(), TypedValue::String(source.to_canonical_json()));
        }
        TypedValue::String(s) if s.trim_start().starts_with('{') => {
            match serde_json::from_str::<serde_json::Value>(s) {
                Ok(json) => flatten_dot_paths("", &TypedValue::from(json), out),
                Err(_) => {
                    out.insert("value".to_string(), source.clone());
                }
            }
        }
        other => {
            out.insert("value".to_string(), other.clone());
        }
    }
}

pub struct Throw;

#[async_trait::async_trait]
impl ActionImpl for Throw {
    fn role(&self) -> ActionRole {
        ActionRole::Response
    }

    fn verbs(&self) -> &[&'static str] {
        &["throw", "raise", "fail"]
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
        Err(ActionError::Thrown {
            r#type: result.base.clone(),
            reason: object.full_name(),
            context: ctx.feature_set_name.clone(),
        })
    }
}

pub struct Log;

#[async_trait::async_trait]
impl ActionImpl for Log {
    fn role(&self) -> ActionRole {
        ActionRole::Response
    }

    fn verbs(&self) -> &[&'static str] {
        &["log", "print", "output", "debug"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::To]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let message = ctx
            .resolve("_result_expression_")
            .or_else(|| ctx.resolve("_literal_"))
            .or_else(|| ctx.resolve("_expression_"))
            .or_else(|| ctx.resolve(&result.base))
            .map(|v| v.display_string())
            .unwrap_or_else(|| result_full_name(result));

        let target = match object.specifiers.first().map(String::as_str) {
            Some("error") => LogTarget::Error,
            _ => LogTarget::Output,
        };

        let line = format_log_line(ctx, &message, &target);

        if let Some(service) = ctx.service::<Arc<dyn LoggingService>>() {
            service.write(target, &line);
        } else {
            match target {
                LogTarget::Output => println!("{line}"),
                LogTarget::Error => eprintln!("{line}"),
            }
        }
        Ok(TypedValue::String(line))
    }
}

fn result_full_name(result: &ResultDescriptor) -> String {
    match result.specifiers.first() {
        Some(s) => format!("{}: {}", result.base, s),
        None => result.base.clone(),
    }
}

fn format_log_line(ctx: &ExecutionContext, message: &str, target: &LogTarget) -> String {
    let target_name = match target {
        LogTarget::Output => "output",
        LogTarget::Error => "error",
    };
    match ctx.output_context {
        OutputContext::Machine => format!(
            "{{\"level\":\"info\",\"source\":\"{}\",\"message\":\"{message}\"}}",
            ctx.feature_set_name
        ),
        OutputContext::Human if ctx.is_compiled => message.to_string(),
        OutputContext::Human => format!("[{}] {message}", ctx.feature_set_name),
        OutputContext::Developer => format!("LOG[{target_name}] {}: {message}", ctx.feature_set_name),
    }
}

pub struct Send;

#[async_trait::async_trait]
impl ActionImpl for Send {
    fn role(&self) -> ActionRole {
        ActionRole::Response
    }

    fn verbs(&self) -> &[&'static str] {
        &["send"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::To]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let data = ctx
            .resolve(&result.base)
            .cloned()
            .ok_or_else(|| ActionError::UndefinedVariable(result.base.clone()))?;

        if let Some(service) = ctx.service::<Arc<dyn MessagingService>>() {
            service.send(&object.base, &data).await?;
        } else {
            let mut payload = IndexMap::new();
            payload.insert("destination".to_string(), TypedValue::String(object.base.clone()));
            payload.insert("data".to_string(), data.clone());
            ctx.emit_and_track(Event::service("MessageSentEvent", payload)).await;
        }
        Ok(data)
    }
}

pub struct Store;

#[async_trait::async_trait]
impl ActionImpl for Store {
    fn role(&self) -> ActionRole {
        ActionRole::Response
    }

    fn verbs(&self) -> &[&'static str] {
        &["store", "save", "persist"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::To, Preposition::Into]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let value = ctx
            .resolve(&result.base)
            .cloned()
            .ok_or_else(|| ActionError::UndefinedVariable(result.base.clone()))?;
        let repo = ctx
            .repository()
            .cloned()
            .ok_or_else(|| ActionError::MissingService("RepositoryStore".to_string()))?;

        if let TypedValue::List(items) = &value {
            for item in items {
                let store_result = repo.store_with_change_info(item.clone(), &object.base, &ctx.business_activity);
                emit_store_event(ctx, &object.base, &store_result).await;
            }
            return Ok(value);
        }

        let store_result = repo.store_with_change_info(value, &object.base, &ctx.business_activity);
        emit_store_event(ctx, &object.base, &store_result).await;
        Ok(store_result.stored_value)
    }
}

async fn emit_store_event(ctx: &ExecutionContext, repo: &str, store_result: &crate::repository::StoreResult) {
    let change_type = if store_result.is_update { ChangeType::Updated } else { ChangeType::Created };
    ctx.emit_and_track(Event::RepositoryChanged(RepositoryChangedEvent {
        repository_name: repo.to_string(),
        change_type,
        entity_id: store_result.entity_id.clone(),
        new_value: Some(store_result.stored_value.clone()),
        old_value: store_result.old_value.clone(),
        timestamp: chrono::Utc::now(),
    }))
    .await;
}

pub struct Write;

#[async_trait::async_trait]
impl ActionImpl for Write {
    fn role(&self) -> ActionRole {
        ActionRole::Response
    }

    fn verbs(&self) -> &[&'static str] {
        &["write"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::To]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let value = ctx
            .resolve(&result.base)
            .cloned()
            .ok_or_else(|| ActionError::UndefinedVariable(result.base.clone()))?;
        let path = crate::actions::support::resolve_path(ctx, &object.specifiers, &object.base);
        if path.is_empty() {
            return Err(ActionError::runtime("Write requires a path"));
        }

        let bytes = encode_by_extension(&path, &value, ctx);
        let fs = ctx.require_service::<Arc<dyn FileSystemService>>("FileSystemService")?;
        fs.write(&path, &bytes).await?;
        Ok(value)
    }
}

fn encode_by_extension(path: &str, value: &TypedValue, ctx: &ExecutionContext) -> Vec<u8> {
    let extension = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match extension.as_str() {
        "json" => value.to_canonical_json().into_bytes(),
        "yaml" | "yml" => serde_yaml::to_string(&serde_json::Value::from(value))
            .unwrap_or_else(|_| value.display_string())
            .into_bytes(),
        "toml" => serde_json::Value::from(value)
            .as_object()
            .and_then(|_| toml::to_string(&serde_json::Value::from(value)).ok())
            .unwrap_or_else(|| value.display_string())
            .into_bytes(),
        "csv" | "tsv" => encode_csv(value, delimiter(ctx, &extension)).into_bytes(),
        _ => value.to_plain_string().unwrap_or_else(|| value.display_string()).into_bytes(),
    }
}

fn delimiter(ctx: &ExecutionContext, extension: &str) -> u8 {
    ctx.resolve("_literal_")
        .and_then(|v| match v {
            TypedValue::Map(m) => m.get("delimiter").and_then(|d| d.to_plain_string()),
            _ => None,
        })
        .and_then(|s| s.bytes().next())
        .unwrap_or(if extension == "tsv" { b'\t' } else { b',' })
}

fn encode_csv(value: &TypedValue, delimiter: u8) -> String {
    let TypedValue::List(rows) = value else {
        return value.display_string();
    };
    let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_writer(Vec::new());
    let mut header_written = false;
    for row in rows {
        if let TypedValue::Map(m) = row {
            if !header_written {
                let _ = writer.write_record(m.keys());
                header_written = true;
            }
            let _ = writer.write_record(m.values().map(|v| v.display_string()));
        }
    }
    String::from_utf8(writer.into_inner().unwrap_or_default()).unwrap_or_default()
}

pub struct Publish;

#[async_trait::async_trait]
impl ActionImpl for Publish {
    fn role(&self) -> ActionRole {
        ActionRole::Export
    }

    fn verbs(&self) -> &[&'static str] {
        &["publish"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::Into]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let value = ctx
            .resolve(&object.base)
            .cloned()
            .ok_or_else(|| ActionError::UndefinedVariable(object.base.clone()))?;
        ctx.bind(&result.base, value.clone(), true)?;

        let mut payload = IndexMap::new();
        payload.insert("name".to_string(), TypedValue::String(result.base.clone()));
        payload.insert("value".to_string(), value.clone());
        ctx.emit_and_track(Event::service("VariablePublishedEvent", payload)).await;
        Ok(value)
    }
}

pub struct Emit;

#[async_trait::async_trait]
impl ActionImpl for Emit {
    fn role(&self) -> ActionRole {
        ActionRole::Export
    }

    fn verbs(&self) -> &[&'static str] {
        &["emit"]
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
        let value = ctx
            .resolve(&object.base)
            .cloned()
            .or_else(|| ctx.resolve("_literal_").cloned())
            .unwrap_or(TypedValue::Null);

        let payload_key = ctx
            .resolve("_expression_name_")
            .and_then(|v| v.to_plain_string())
            .or_else(|| (!RESERVED_NAMES.contains(&object.base.as_str())).then(|| object.base.clone()))
            .unwrap_or_else(|| "data".to_string());

        let mut payload = IndexMap::new();
        payload.insert(payload_key, value.clone());
        let event = Event::domain(result.base.clone(), payload);
        if ctx.event_bus().is_some() {
            ctx.emit_and_track(event).await;
        }
        Ok(value)
    }
}

pub struct Notify;

#[async_trait::async_trait]
impl ActionImpl for Notify {
    fn role(&self) -> ActionRole {
        ActionRole::Response
    }

    fn verbs(&self) -> &[&'static str] {
        &["notify"]
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
        let message = ctx
            .resolve(&object.base)
            .cloned()
            .ok_or_else(|| ActionError::UndefinedVariable(object.base.clone()))?;
        if let Some(service) = ctx.service::<Arc<dyn MessagingService>>() {
            service.notify(&message).await?;
        } else {
            let mut payload = IndexMap::new();
            payload.insert("message".to_string(), message.clone());
            ctx.emit_and_track(Event::service("NotificationSentEvent", payload)).await;
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::ObjectDescriptor as OD;

    #[tokio::test]
    async fn return_flattens_map_and_sets_response() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.bind(
            "_literal_",
            TypedValue::Map(vec![("total".to_string(), TypedValue::Integer(10))].into_iter().collect()),
            false,
        )
        .unwrap();
        let result = ResultDescriptor::new("OK");
        let object = OD::new("order accepted", Preposition::With);
        Return.execute(&result, &object, &mut ctx).await.unwrap();
        let response = ctx.response().unwrap();
        assert_eq!(response.status, "OK");
        assert_eq!(response.data.get("total"), Some(&TypedValue::Integer(10)));
    }

    #[tokio::test]
    async fn return_probes_default_keys_when_data_is_empty() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.bind("message", TypedValue::String("hi".into()), false).unwrap();
        let result = ResultDescriptor::new("OK");
        let object = OD::new("greeting", Preposition::With);
        Return.execute(&result, &object, &mut ctx).await.unwrap();
        let response = ctx.response().unwrap();
        assert_eq!(response.data.get("value"), Some(&TypedValue::String("hi".into())));
    }

    #[tokio::test]
    async fn throw_raises_thrown_error() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        let result = ResultDescriptor::new("ValidationError");
        let object = OD::new("order", Preposition::With).with_specifiers(vec!["total"]);
        let err = Throw.execute(&result, &object, &mut ctx).await.unwrap_err();
        assert!(matches!(err, ActionError::Thrown { .. }));
    }
}
