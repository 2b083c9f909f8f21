//! `Compare` (spec.md §4.D Own/data family).

use indexmap::IndexMap;

use crate::actions::support::expression_literal_or_object;
use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::Result;
use crate::registry::ActionImpl;
use crate::value::TypedValue;

pub struct Compare;

#[async_trait::async_trait]
impl ActionImpl for Compare {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["compare"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::With, Preposition::Against]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let lhs = ctx.resolve(&result.base).cloned();
        let rhs = expression_literal_or_object(ctx, object);
        let outcome = compare(lhs.as_ref(), rhs.as_ref());

        let mut m = IndexMap::new();
        m.insert("matches".to_string(), TypedValue::Boolean(outcome == "equal"));
        m.insert("result".to_string(), TypedValue::String(outcome.to_string()));
        Ok(TypedValue::Map(m))
    }
}

/// Numeric coercion first, then string lexicographic, then boolean equality,
/// then stringified fallback (spec.md §4.D).
fn compare(lhs: Option<&TypedValue>, rhs: Option<&TypedValue>) -> &'static str {
    let (lhs, rhs) = match (lhs, rhs) {
        (Some(l), Some(r)) => (l, r),
        _ => return if lhs.is_none() && rhs.is_none() { "equal" } else { "notEqual" },
    };

    if let (Some(a), Some(b)) = (lhs.to_f64(), rhs.to_f64()) {
        return order(a.partial_cmp(&b));
    }
    if let (Some(a), Some(b)) = (lhs.to_plain_string(), rhs.to_plain_string()) {
        if matches!(lhs, TypedValue::String(_)) && matches!(rhs, TypedValue::String(_)) {
            return order(a.partial_cmp(&b));
        }
    }
    if let (Some(a), Some(b)) = (lhs.to_bool(), rhs.to_bool()) {
        return if a == b { "equal" } else { "notEqual" };
    }
    if lhs.display_string() == rhs.display_string() {
        "equal"
    } else {
        "notEqual"
    }
}

fn order(cmp: Option<std::cmp::Ordering>) -> &'static str {
    use std::cmp::Ordering::*;
    match cmp {
        Some(Equal) => "equal",
        Some(Less) => "less",
        Some(Greater) => "greater",
        None => "notEqual",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::ObjectDescriptor as OD;

    #[tokio::test]
    async fn numeric_comparison_wins_over_string_fallback() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.bind("x", TypedValue::Integer(3), false).unwrap();
        let mut object = OD::new("y", Preposition::With);
        object.literal_value = Some(TypedValue::Float(5.0));
        let result = ResultDescriptor::new("x");
        let outcome = Compare.execute(&result, &object, &mut ctx).await.unwrap();
        if let TypedValue::Map(m) = outcome {
            assert_eq!(m.get("result"), Some(&TypedValue::String("less".to_string())));
            assert_eq!(m.get("matches"), Some(&TypedValue::Boolean(false)));
        } else {
            panic!("expected map");
        }
    }

    #[tokio::test]
    async fn string_lexicographic_fallback() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.bind("x", TypedValue::String("apple".into()), false).unwrap();
        let mut object = OD::new("y", Preposition::With);
        object.literal_value = Some(TypedValue::String("banana".into()));
        let result = ResultDescriptor::new("x");
        let outcome = Compare.execute(&result, &object, &mut ctx).await.unwrap();
        if let TypedValue::Map(m) = outcome {
            assert_eq!(m.get("result"), Some(&TypedValue::String("less".to_string())));
        } else {
            panic!("expected map");
        }
    }
}
