//! `Map` and `Reduce` (spec.md §4.D Own/data family).

use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::registry::ActionImpl;
use crate::value::TypedValue;

/// Reserved type-name words `Map`'s field specifier must skip (spec.md §4.D).
const RESERVED_TYPE_WORDS: &[&str] = &[
    "List", "Array", "Set", "Integer", "Int", "Float", "Double", "Number", "String", "Boolean",
    "Bool", "Object", "Dictionary", "Map",
];

pub struct Map;

#[async_trait::async_trait]
impl ActionImpl for Map {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["map"]
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
        let value = ctx
            .resolve(&object.base)
            .cloned()
            .ok_or_else(|| ActionError::UndefinedVariable(object.base.clone()))?;

        let field = result
            .specifiers
            .iter()
            .find(|s| !RESERVED_TYPE_WORDS.contains(&s.as_str()));

        match value {
            TypedValue::List(items) => Ok(TypedValue::List(
                items
                    .into_iter()
                    .map(|item| extract_field(item, field))
                    .collect(),
            )),
            TypedValue::Map(_) => Ok(extract_field(value, field)),
            other => Ok(other),
        }
    }
}

fn extract_field(item: TypedValue, field: Option<&String>) -> TypedValue {
    match (field, &item) {
        (Some(f), TypedValue::Map(m)) => m.get(f).cloned().unwrap_or(TypedValue::Null),
        _ => item,
    }
}

pub struct Reduce;

#[async_trait::async_trait]
impl ActionImpl for Reduce {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["reduce", "aggregate"]
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
        let value = ctx
            .resolve(&object.base)
            .cloned()
            .ok_or_else(|| ActionError::UndefinedVariable(object.base.clone()))?;
        let TypedValue::List(items) = value else {
            return Err(ActionError::TypeMismatch {
                expected: "List".to_string(),
                actual: value.type_name().to_string(),
                variable: Some(object.base.clone()),
            });
        };

        let agg_type = ctx
            .resolve("_aggregation_type_")
            .and_then(|v| v.to_plain_string())
            .or_else(|| result.specifiers.first().cloned())
            .unwrap_or_else(|| "count".to_string());
        let agg_field = ctx
            .resolve("_aggregation_field_")
            .and_then(|v| v.to_plain_string())
            .or_else(|| result.specifiers.get(1).cloned());

        Ok(reduce(&items, &agg_type, agg_field.as_deref()))
    }
}

fn field_values(items: &[TypedValue], field: Option<&str>) -> Vec<f64> {
    items
        .iter()
        .filter_map(|item| {
            let scalar = match (field, item) {
                (Some(f), TypedValue::Map(m)) => m.get(f).cloned(),
                _ => Some(item.clone()),
            };
            scalar.and_then(|v| v.to_f64())
        })
        .collect()
}

/// Empty arrays return `0` for numeric aggregates and count, an empty list
/// for `first`/`last` (spec.md §4.D).
fn reduce(items: &[TypedValue], agg_type: &str, field: Option<&str>) -> TypedValue {
    match agg_type {
        "count" => TypedValue::Integer(items.len() as i64),
        "sum" => TypedValue::Float(field_values(items, field).iter().sum()),
        "avg" | "average" => {
            let values = field_values(items, field);
            if values.is_empty() {
                TypedValue::Integer(0)
            } else {
                TypedValue::Float(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        "min" => field_values(items, field)
            .into_iter()
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.min(v))))
            .map(TypedValue::Float)
            .unwrap_or(TypedValue::Integer(0)),
        "max" => field_values(items, field)
            .into_iter()
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
            .map(TypedValue::Float)
            .unwrap_or(TypedValue::Integer(0)),
        "first" => items.first().cloned().unwrap_or(TypedValue::List(Vec::new())),
        "last" => items.last().cloned().unwrap_or(TypedValue::List(Vec::new())),
        _ => TypedValue::Integer(items.len() as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::ObjectDescriptor as OD;
    use crate::repository::map_entry;

    #[tokio::test]
    async fn map_extracts_named_field_skipping_reserved_type_word() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.bind(
            "orders",
            TypedValue::List(vec![
                map_entry(vec![("total", TypedValue::Integer(10))]),
                map_entry(vec![("total", TypedValue::Integer(20))]),
            ]),
            false,
        )
        .unwrap();
        let object = OD::new("orders", Preposition::From);
        let result = ResultDescriptor::new("totals").with_specifiers(vec!["List", "total"]);
        let mapped = Map.execute(&result, &object, &mut ctx).await.unwrap();
        assert_eq!(mapped, TypedValue::List(vec![TypedValue::Integer(10), TypedValue::Integer(20)]));
    }

    #[tokio::test]
    async fn reduce_sum_on_empty_list_is_zero() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.bind("xs", TypedValue::List(vec![]), false).unwrap();
        ctx.bind("_aggregation_type_", TypedValue::String("sum".into()), false).unwrap();
        let object = OD::new("xs", Preposition::From);
        let result = ResultDescriptor::new("total");
        let reduced = Reduce.execute(&result, &object, &mut ctx).await.unwrap();
        assert_eq!(reduced, TypedValue::Float(0.0));
    }
}
