//! `Request` / `Call` / `Execute` (spec.md §4.D Source-read family).

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::Result;
use crate::registry::ActionImpl;
use crate::services::callable::CallableRegistry;
use crate::services::http::{HttpClientService, HttpMethod};
use crate::services::shell::{ExecConfig, ExecResult, ShellService};
use crate::value::TypedValue;

pub struct Request;

#[async_trait::async_trait]
impl ActionImpl for Request {
    fn role(&self) -> ActionRole {
        ActionRole::Request
    }

    fn verbs(&self) -> &[&'static str] {
        &["request"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::From, Preposition::To, Preposition::Via]
    }

    async fn execute(
        &self,
        _result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let url = ctx
            .resolve(&object.base)
            .and_then(|v| v.to_plain_string())
            .unwrap_or_else(|| object.base.clone());

        let config = ctx
            .resolve("_with_")
            .or_else(|| ctx.resolve("_expression_"))
            .cloned();

        let config_map = match &config {
            Some(TypedValue::Map(m)) => Some(m),
            _ => None,
        };

        let method = config_map
            .and_then(|m| m.get("method"))
            .and_then(|v| v.to_plain_string())
            .and_then(|s| HttpMethod::from_name(&s))
            .or_else(|| match object.preposition {
                Preposition::From => Some(HttpMethod::Get),
                Preposition::To => Some(HttpMethod::Post),
                Preposition::Via => object
                    .specifiers
                    .first()
                    .and_then(|s| HttpMethod::from_name(s)),
                _ => None,
            })
            .unwrap_or(HttpMethod::Get);

        let body = config_map
            .and_then(|m| m.get("body"))
            .map(|v| v.display_string());

        let headers: HashMap<String, String> = config_map
            .and_then(|m| m.get("headers"))
            .and_then(|v| match v {
                TypedValue::Map(h) => Some(
                    h.iter()
                        .filter_map(|(k, v)| v.to_plain_string().map(|s| (k.clone(), s)))
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default();

        let http = ctx.require_service::<Arc<dyn HttpClientService>>("HttpClientService")?;
        let response = http.request(method, &url, body, &headers).await?;

        let mut m = IndexMap::new();
        m.insert("status".to_string(), TypedValue::Integer(response.status as i64));
        m.insert("body".to_string(), TypedValue::String(response.body));
        m.insert(
            "headers".to_string(),
            TypedValue::Map(
                response
                    .headers
                    .into_iter()
                    .map(|(k, v)| (k, TypedValue::String(v)))
                    .collect(),
            ),
        );
        Ok(TypedValue::Map(m))
    }
}

pub struct Call;

#[async_trait::async_trait]
impl ActionImpl for Call {
    fn role(&self) -> ActionRole {
        ActionRole::Request
    }

    fn verbs(&self) -> &[&'static str] {
        &["call"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::From, Preposition::Via, Preposition::With]
    }

    async fn execute(
        &self,
        _result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let args = ctx
            .resolve("_with_")
            .or_else(|| ctx.resolve("_expression_"))
            .or_else(|| ctx.resolve("_literal_"))
            .cloned()
            .unwrap_or(TypedValue::Null);
        let registry = ctx.require_service::<Arc<dyn CallableRegistry>>("CallableRegistry")?;
        registry.call(&object.base, &args).await
    }
}

pub struct Execute;

#[async_trait::async_trait]
impl ActionImpl for Execute {
    fn role(&self) -> ActionRole {
        ActionRole::Request
    }

    fn verbs(&self) -> &[&'static str] {
        &["execute"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::With, Preposition::Via]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let config_value = ctx
            .resolve("_with_")
            .or_else(|| ctx.resolve("_literal_"))
            .cloned();

        let mut config = ExecConfig::default();
        match config_value {
            Some(TypedValue::Map(m)) => {
                config.command = m
                    .get("command")
                    .and_then(|v| v.to_plain_string())
                    .unwrap_or_else(|| object.base.clone());
                config.working_directory = m.get("workingDirectory").and_then(|v| v.to_plain_string());
                if let Some(TypedValue::Map(env)) = m.get("environment") {
                    for (k, v) in env {
                        if let Some(s) = v.to_plain_string() {
                            config.environment.insert(k.clone(), s);
                        }
                    }
                }
                config.timeout_ms = m.get("timeout").and_then(|v| v.to_i64()).map(|n| n as u64);
                config.shell = m.get("shell").and_then(|v| v.to_plain_string());
                config.capture_stderr = m
                    .get("captureStderr")
                    .and_then(|v| v.to_bool())
                    .unwrap_or(false);
            }
            Some(TypedValue::String(args)) => {
                let bin = result
                    .specifiers
                    .first()
                    .cloned()
                    .unwrap_or_else(|| object.base.clone());
                config.command = format!("{bin} {args}");
            }
            _ => {
                config.command = result
                    .specifiers
                    .first()
                    .cloned()
                    .unwrap_or_else(|| object.base.clone());
            }
        }

        let shell = ctx.require_service::<Arc<dyn ShellService>>("ShellService")?;
        let outcome = shell.execute(config).await;
        Ok(exec_result_to_typed(outcome))
    }
}

fn exec_result_to_typed(outcome: ExecResult) -> TypedValue {
    let mut m = IndexMap::new();
    m.insert("error".to_string(), TypedValue::Boolean(outcome.error));
    m.insert("message".to_string(), TypedValue::String(outcome.message));
    m.insert("output".to_string(), TypedValue::String(outcome.output));
    m.insert("exitCode".to_string(), TypedValue::Integer(outcome.exit_code as i64));
    m.insert("command".to_string(), TypedValue::String(outcome.command));
    TypedValue::Map(m)
}
