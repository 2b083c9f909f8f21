//! `Extract` (spec.md §4.D Source-read family).

use std::sync::Arc;

use indexmap::IndexMap;

use crate::actions::support::{apply_list_specifier, date_property};
use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::registry::ActionImpl;
use crate::services::ParameterStorage;
use crate::value::TypedValue;

const DATE_PROPERTIES: &[&str] = &[
    "year", "month", "day", "hour", "minute", "second", "weekday", "timezone", "days", "start",
    "end", "pattern", "next", "all", "years", "months", "hours", "minutes", "seconds",
];

pub struct Extract;

#[async_trait::async_trait]
impl ActionImpl for Extract {
    fn role(&self) -> ActionRole {
        ActionRole::Request
    }

    fn verbs(&self) -> &[&'static str] {
        &["extract"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::From, Preposition::Via]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        if object.base == "env" {
            return match object.specifiers.first() {
                Some(name) => std::env::var(name)
                    .map(TypedValue::String)
                    .map_err(|_| ActionError::UndefinedVariable(format!("env:{name}"))),
                None => Err(ActionError::UndefinedVariable("env".to_string())),
            };
        }

        if object.base == "parameter" {
            let storage = ctx.require_service::<Arc<dyn ParameterStorage>>("ParameterStorage")?;
            return match object.specifiers.first() {
                Some(name) => storage
                    .get(name)
                    .ok_or_else(|| ActionError::UndefinedVariable(format!("parameter:{name}"))),
                None => Ok(TypedValue::Map(storage.get_all())),
            };
        }

        let root = ctx
            .resolve(&object.base)
            .cloned()
            .ok_or_else(|| ActionError::UndefinedVariable(object.base.clone()))?;

        let mut current = walk(root, &object.specifiers)?;

        for specifier in &result.specifiers {
            current = apply_result_specifier(&current, specifier)?;
        }

        Ok(current)
    }
}

fn walk(root: TypedValue, specifiers: &[String]) -> Result<TypedValue> {
    let mut current = root;
    for specifier in specifiers {
        current = step(current, specifier)?;
    }
    Ok(current)
}

fn step(current: TypedValue, specifier: &str) -> Result<TypedValue> {
    match &current {
        TypedValue::Map(m) => m.get(specifier).cloned().ok_or_else(|| ActionError::PropertyNotFound {
            property: specifier.to_string(),
            on: "object".to_string(),
        }),
        TypedValue::List(items) => specifier
            .parse::<i64>()
            .ok()
            .and_then(|idx| TypedValue::reverse_index(items.len(), idx))
            .map(|i| items[i].clone())
            .ok_or_else(|| ActionError::PropertyNotFound {
                property: specifier.to_string(),
                on: "list".to_string(),
            }),
        TypedValue::String(s) => {
            let parsed = parse_string_node(s);
            if matches!(&parsed, TypedValue::String(p) if p == s) {
                return Err(ActionError::PropertyNotFound {
                    property: specifier.to_string(),
                    on: "string".to_string(),
                });
            }
            step(parsed, specifier)
        }
        TypedValue::Opaque(tag, _) => Err(ActionError::PropertyNotFound {
            property: specifier.to_string(),
            on: tag.clone(),
        }),
        other => Err(ActionError::PropertyNotFound {
            property: specifier.to_string(),
            on: other.type_name().to_string(),
        }),
    }
}

/// Priority order (spec.md §4.D Extract): JSON, then form-urlencoded, then
/// multi-line key-value, then the string passes through unchanged.
fn parse_string_node(s: &str) -> TypedValue {
    let trimmed = s.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
            return TypedValue::from(v);
        }
    }
    if trimmed.contains('=') && !trimmed.contains(':') {
        let mut map = IndexMap::new();
        for pair in trimmed.split('&') {
            if let Some((k, v)) = pair.split_once('=') {
                map.insert(
                    urlencoding::decode(k).map(|c| c.into_owned()).unwrap_or_default(),
                    TypedValue::String(urlencoding::decode(v).map(|c| c.into_owned()).unwrap_or_default()),
                );
            }
        }
        if !map.is_empty() {
            return TypedValue::Map(map);
        }
    }
    if trimmed.contains(':') {
        let mut map = IndexMap::new();
        for line in trimmed.lines() {
            if let Some((k, v)) = line.split_once(':') {
                map.insert(k.trim().to_ascii_lowercase(), TypedValue::String(v.trim().to_string()));
            }
        }
        if !map.is_empty() {
            return TypedValue::Map(map);
        }
    }
    TypedValue::String(trimmed.to_string())
}

fn apply_result_specifier(current: &TypedValue, specifier: &str) -> Result<TypedValue> {
    if let TypedValue::Date(date) = current {
        if DATE_PROPERTIES.contains(&specifier) {
            if let Some(v) = date_property(date, specifier) {
                return Ok(v);
            }
        }
    }
    if let TypedValue::List(items) = current {
        if let Some(v) = apply_list_specifier(items, specifier) {
            return Ok(v);
        }
    }
    // PascalCase schema-qualifier and not-reserved-word: pass through, the
    // schema registry validates on read elsewhere (Extract itself never
    // fails a value solely for carrying a schema-name qualifier).
    if specifier.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
        return Ok(current.clone());
    }
    Ok(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_descends_maps_and_reverse_indexed_lists() {
        let mut m = IndexMap::new();
        m.insert(
            "items".to_string(),
            TypedValue::List(vec![TypedValue::Integer(10), TypedValue::Integer(20)]),
        );
        let root = TypedValue::Map(m);
        let result = walk(root, &["items".to_string(), "0".to_string()]).unwrap();
        assert_eq!(result, TypedValue::Integer(20));
    }

    #[test]
    fn missing_key_raises_property_not_found() {
        let root = TypedValue::Map(IndexMap::new());
        let err = walk(root, &["missing".to_string()]).unwrap_err();
        assert!(matches!(err, ActionError::PropertyNotFound { .. }));
    }

    #[test]
    fn json_leaning_string_is_parsed_then_descended() {
        let root = TypedValue::String(r#"{"a": 1}"#.to_string());
        let result = walk(root, &["a".to_string()]).unwrap();
        assert_eq!(result, TypedValue::Integer(1));
    }
}
