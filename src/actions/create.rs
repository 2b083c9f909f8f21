//! `Create` (spec.md §4.D Own/data family).

use crate::actions::support::expression_literal_or_object;
use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::Result;
use crate::idgen::generate_id;
use crate::registry::ActionImpl;
use crate::value::{Recurrence, TypedValue};

pub struct Create;

#[async_trait::async_trait]
impl ActionImpl for Create {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["create", "build", "construct"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::From, Preposition::With]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        match result.specifiers.first().map(String::as_str) {
            Some("date-range") => return Ok(create_date_range(ctx)),
            Some("recurrence") => return Ok(create_recurrence(ctx)),
            _ => {}
        }

        let source = expression_literal_or_object(ctx, object);
        let Some(mut value) = source else {
            return Ok(TypedValue::String(String::new()));
        };

        if !result.specifiers.is_empty() {
            if let TypedValue::Map(ref mut m) = value {
                if !m.contains_key("id") {
                    m.insert("id".to_string(), TypedValue::String(generate_id()));
                }
            }
        }
        Ok(value)
    }
}

fn create_date_range(ctx: &ExecutionContext) -> TypedValue {
    let from = ctx.resolve("_from_").and_then(as_date).unwrap_or_else(chrono::Utc::now);
    let to = ctx.resolve("_to_").and_then(as_date).unwrap_or(from);
    TypedValue::DateRange(from, to)
}

fn create_recurrence(ctx: &ExecutionContext) -> TypedValue {
    let pattern = ctx
        .resolve("_expression_")
        .and_then(|v| v.to_plain_string())
        .unwrap_or_default();
    let start = ctx.resolve("_from_").and_then(as_date);
    let count = ctx.resolve("_to_").and_then(|v| v.to_i64()).map(|n| n as u32);
    TypedValue::Recurrence(Recurrence { pattern, start, count })
}

fn as_date(value: &TypedValue) -> Option<chrono::DateTime<chrono::Utc>> {
    match value {
        TypedValue::Date(d) => Some(*d),
        TypedValue::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.with_timezone(&chrono::Utc)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::ObjectDescriptor as OD;

    #[tokio::test]
    async fn missing_id_is_auto_populated_when_type_specified() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        let mut object = OD::new("order", Preposition::From);
        object.literal_value = Some(TypedValue::Map(
            vec![("total".to_string(), TypedValue::Integer(10))].into_iter().collect(),
        ));
        let result = ResultDescriptor::new("order").with_specifiers(vec!["Order"]);
        let value = Create.execute(&result, &object, &mut ctx).await.unwrap();
        match value {
            TypedValue::Map(m) => assert!(m.contains_key("id")),
            _ => panic!("expected map"),
        }
    }

    #[tokio::test]
    async fn no_source_returns_empty_string() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        let object = OD::new("missing", Preposition::From);
        let result = ResultDescriptor::new("thing");
        let value = Create.execute(&result, &object, &mut ctx).await.unwrap();
        assert_eq!(value, TypedValue::String(String::new()));
    }
}
