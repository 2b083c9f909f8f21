//! `Read` (spec.md §4.D Source-read family).

use std::sync::Arc;

use indexmap::IndexMap;

use crate::actions::support::resolve_path;
use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::registry::ActionImpl;
use crate::services::fs::FileSystemService;
use crate::value::TypedValue;

pub struct Read;

#[async_trait::async_trait]
impl ActionImpl for Read {
    fn role(&self) -> ActionRole {
        ActionRole::Request
    }

    fn verbs(&self) -> &[&'static str] {
        &["read"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::From]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let path = resolve_path(ctx, &object.specifiers, &object.base);
        if path.is_empty() {
            return Err(ActionError::RuntimeError("Read requires a path".to_string()));
        }
        let fs = ctx.require_service::<Arc<dyn FileSystemService>>("FileSystemService")?;
        let bytes = fs.read(&path).await?;

        let wants_raw_string = result
            .specifiers
            .iter()
            .any(|s| s == "string" || s == "as string");
        if wants_raw_string {
            return Ok(TypedValue::String(String::from_utf8_lossy(&bytes).to_string()));
        }

        let text = String::from_utf8_lossy(&bytes).to_string();
        Ok(decode_by_extension(&path, &text, ctx))
    }
}

fn decode_by_extension(path: &str, text: &str, ctx: &ExecutionContext) -> TypedValue {
    let extension = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match extension.as_str() {
        "json" => serde_json::from_str::<serde_json::Value>(text)
            .map(TypedValue::from)
            .unwrap_or_else(|_| TypedValue::String(text.to_string())),
        "yaml" | "yml" => serde_yaml::from_str::<serde_json::Value>(text)
            .map(TypedValue::from)
            .unwrap_or_else(|_| TypedValue::String(text.to_string())),
        "toml" => text
            .parse::<toml::Value>()
            .ok()
            .and_then(|v| serde_json::to_value(v).ok())
            .map(TypedValue::from)
            .unwrap_or_else(|| TypedValue::String(text.to_string())),
        "csv" | "tsv" => decode_csv(text, &delimiter_for(ctx, extension.as_str())),
        _ => TypedValue::String(text.to_string()),
    }
}

fn delimiter_for(ctx: &ExecutionContext, extension: &str) -> u8 {
    let configured = ctx
        .resolve("_literal_")
        .and_then(|v| match v {
            TypedValue::Map(m) => m.get("delimiter").and_then(|d| d.to_plain_string()),
            _ => None,
        })
        .and_then(|s| s.bytes().next());
    configured.unwrap_or(if extension == "tsv" { b'\t' } else { b',' })
}

fn decode_csv(text: &str, delimiter: &u8) -> TypedValue {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(*delimiter)
        .from_reader(text.as_bytes());
    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(_) => return TypedValue::String(text.to_string()),
    };
    let mut rows = Vec::new();
    for record in reader.records().flatten() {
        let mut row = IndexMap::new();
        for (key, value) in headers.iter().zip(record.iter()) {
            row.insert(key.to_string(), TypedValue::String(value.to_string()));
        }
        rows.push(TypedValue::Map(row));
    }
    TypedValue::List(rows)
}
