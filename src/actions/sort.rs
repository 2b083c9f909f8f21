//! `Sort` (spec.md §4.D Own/data family).

use std::cmp::Ordering;

use crate::actions::op_name;
use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::registry::ActionImpl;
use crate::value::TypedValue;

const KNOWN_ORDERS: &[&str] = &["ascending", "descending"];

pub struct Sort;

#[async_trait::async_trait]
impl ActionImpl for Sort {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["sort", "order"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::By]
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
        let TypedValue::List(mut items) = value else {
            return Err(ActionError::TypeMismatch {
                expected: "List".to_string(),
                actual: value.type_name().to_string(),
                variable: Some(object.base.clone()),
            });
        };

        let order = op_name::resolve(result, KNOWN_ORDERS, Some("ascending")).unwrap_or_default();
        items.sort_by(|a, b| compare_primitives(a, b));
        if order == "descending" {
            items.reverse();
        }
        Ok(TypedValue::List(items))
    }
}

fn compare_primitives(a: &TypedValue, b: &TypedValue) -> Ordering {
    if let (Some(x), Some(y)) = (a.to_f64(), b.to_f64()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    a.display_string().cmp(&b.display_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::ObjectDescriptor as OD;

    #[tokio::test]
    async fn ascending_is_the_default_order() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.bind(
            "xs",
            TypedValue::List(vec![TypedValue::Integer(3), TypedValue::Integer(1), TypedValue::Integer(2)]),
            false,
        )
        .unwrap();
        let object = OD::new("xs", Preposition::By);
        let result = ResultDescriptor::new("xs");
        let sorted = Sort.execute(&result, &object, &mut ctx).await.unwrap();
        assert_eq!(
            sorted,
            TypedValue::List(vec![TypedValue::Integer(1), TypedValue::Integer(2), TypedValue::Integer(3)])
        );
    }

    #[tokio::test]
    async fn descending_reverses_order() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.bind(
            "xs",
            TypedValue::List(vec![TypedValue::Integer(1), TypedValue::Integer(3), TypedValue::Integer(2)]),
            false,
        )
        .unwrap();
        let object = OD::new("xs", Preposition::By);
        let result = ResultDescriptor::new("xs").with_specifiers(vec!["descending"]);
        let sorted = Sort.execute(&result, &object, &mut ctx).await.unwrap();
        assert_eq!(
            sorted,
            TypedValue::List(vec![TypedValue::Integer(3), TypedValue::Integer(2), TypedValue::Integer(1)])
        );
    }
}
