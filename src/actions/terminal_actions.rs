//! Terminal family (spec.md §4.D): `Prompt`, `Select`, `Clear`. Named
//! `terminal_actions` to avoid clashing with `services::terminal`.

use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::Result;
use crate::registry::ActionImpl;
use crate::services::terminal::TerminalService;
use crate::value::TypedValue;

pub struct Prompt;

#[async_trait::async_trait]
impl ActionImpl for Prompt {
    fn role(&self) -> ActionRole {
        ActionRole::Request
    }

    fn verbs(&self) -> &[&'static str] {
        &["prompt", "ask"]
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
        let message = ctx
            .resolve("_with_")
            .and_then(|v| v.to_plain_string())
            .unwrap_or_else(|| object.base.clone());
        let hidden = object.specifiers.iter().any(|s| s == "hidden");

        let terminal = ctx
            .service::<Arc<dyn TerminalService>>()
            .cloned()
            .unwrap_or_else(|| Arc::new(crate::services::terminal::NullTerminalService));
        let answer = terminal.prompt(&message, hidden).await;
        Ok(TypedValue::String(answer))
    }
}

pub struct Select;

#[async_trait::async_trait]
impl ActionImpl for Select {
    fn role(&self) -> ActionRole {
        ActionRole::Request
    }

    fn verbs(&self) -> &[&'static str] {
        &["select", "choose"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::From, Preposition::With]
    }

    async fn execute(
        &self,
        _result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let message = ctx
            .resolve("_with_")
            .and_then(|v| v.to_plain_string())
            .unwrap_or_else(|| object.base.clone());
        let options: Vec<String> = match ctx.resolve(&object.base) {
            Some(TypedValue::List(items)) => items.iter().filter_map(|v| v.to_plain_string()).collect(),
            _ => object.specifiers.iter().filter(|s| *s != "multi-select").cloned().collect(),
        };
        let multi = object.specifiers.iter().any(|s| s == "multi-select");

        let terminal = ctx
            .service::<Arc<dyn TerminalService>>()
            .cloned()
            .unwrap_or_else(|| Arc::new(crate::services::terminal::NullTerminalService));
        let chosen = terminal.select(&message, &options, multi).await;

        if multi {
            Ok(TypedValue::List(chosen.into_iter().map(TypedValue::String).collect()))
        } else {
            Ok(TypedValue::String(chosen.into_iter().next().unwrap_or_default()))
        }
    }
}

pub struct Clear;

#[async_trait::async_trait]
impl ActionImpl for Clear {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["clear"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::With]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        _object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let mode = if result.base.is_empty() { "screen" } else { &result.base };
        if let Some(terminal) = ctx.service::<Arc<dyn TerminalService>>() {
            terminal.clear(mode);
        }
        Ok(TypedValue::String(mode.to_string()))
    }
}
