//! `Filter` (spec.md §4.D Own/data family).

use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::predicate;
use crate::registry::ActionImpl;
use crate::value::TypedValue;

pub struct Filter;

#[async_trait::async_trait]
impl ActionImpl for Filter {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["filter"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::Where, Preposition::By]
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

        let field = ctx
            .resolve("_where_field_")
            .and_then(|v| v.to_plain_string())
            .or_else(|| result.specifiers.first().cloned())
            .ok_or_else(|| ActionError::MissingRequiredField("where".to_string()))?;
        let op = ctx
            .resolve("_where_op_")
            .and_then(|v| v.to_plain_string())
            .or_else(|| result.specifiers.get(1).cloned())
            .unwrap_or_else(|| "is".to_string());
        let rhs = ctx
            .resolve("_where_value_")
            .cloned()
            .or_else(|| result.specifiers.get(2).map(|s| TypedValue::String(s.clone())))
            .ok_or_else(|| ActionError::MissingRequiredField("where value".to_string()))?;

        let filtered: Vec<TypedValue> = items
            .into_iter()
            .filter(|item| {
                let field_value = match item {
                    TypedValue::Map(m) => m.get(&field).cloned(),
                    other => Some(other.clone()),
                };
                field_value.map(|fv| predicate::evaluate(&fv, &op, &rhs)).unwrap_or(false)
            })
            .collect();
        Ok(TypedValue::List(filtered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::ObjectDescriptor as OD;
    use crate::repository::map_entry;

    #[tokio::test]
    async fn filters_list_of_maps_by_where_clause() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.bind(
            "orders",
            TypedValue::List(vec![
                map_entry(vec![("status", TypedValue::String("open".into()))]),
                map_entry(vec![("status", TypedValue::String("closed".into()))]),
            ]),
            false,
        )
        .unwrap();
        ctx.bind("_where_field_", TypedValue::String("status".into()), false).unwrap();
        ctx.bind("_where_op_", TypedValue::String("is".into()), false).unwrap();
        ctx.bind("_where_value_", TypedValue::String("open".into()), false).unwrap();

        let object = OD::new("orders", Preposition::Where);
        let result = ResultDescriptor::new("open");
        let filtered = Filter.execute(&result, &object, &mut ctx).await.unwrap();
        assert_eq!(
            filtered,
            TypedValue::List(vec![map_entry(vec![("status", TypedValue::String("open".into()))])])
        );
    }
}
