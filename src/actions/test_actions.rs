//! Test family (spec.md §4.D): `Given`, `When`, `Then`, `Assert`.

use std::sync::Arc;

use crate::actions::support::literal_expression_or_object;
use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::registry::ActionImpl;
use crate::services::test_context::{AssertionRecord, TestExecutionContext};
use crate::value::TypedValue;

pub struct Given;

#[async_trait::async_trait]
impl ActionImpl for Given {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["given"]
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
        Ok(literal_expression_or_object(ctx, object)
            .unwrap_or_else(|| TypedValue::String(object.base.clone())))
    }
}

pub struct When;

#[async_trait::async_trait]
impl ActionImpl for When {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["when"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::From]
    }

    async fn execute(
        &self,
        _result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let test_context = ctx
            .service::<Arc<dyn TestExecutionContext>>()
            .cloned()
            .ok_or_else(|| ActionError::MissingService("TestExecutionContext".to_string()))?;
        let response = test_context.run_feature_set(&object.base, ctx).await?;
        Ok(primary_datum(&response))
    }
}

/// The value `Then`/`Assert` compare against when a `When` bound a whole
/// response map rather than a single scalar (spec.md §4.D Test family).
fn primary_datum(response: &crate::context::Response) -> TypedValue {
    response
        .data
        .get("value")
        .cloned()
        .or_else(|| response.data.values().next().cloned())
        .unwrap_or(TypedValue::Null)
}

pub struct Then;

#[async_trait::async_trait]
impl ActionImpl for Then {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["then"]
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
        assert_equal(result, object, ctx)
    }
}

pub struct Assert;

#[async_trait::async_trait]
impl ActionImpl for Assert {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["assert"]
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
        assert_equal(result, object, ctx)
    }
}

/// Shared `Then`/`Assert` body: compare `result.base`'s bound value against
/// the expected value (`_literal_` > `_expression_` > `resolve(object.base)`
/// > literal `object.base`), tolerating float cross-type comparison within
/// `1e-4` and falling back to a structural string comparison otherwise
/// (spec.md §4.D Test family). Always records an `AssertionRecord`; throws
/// `ActionError::AssertionError` on mismatch.
fn assert_equal(result: &ResultDescriptor, object: &ObjectDescriptor, ctx: &mut ExecutionContext) -> Result<TypedValue> {
    let expected = literal_expression_or_object(ctx, object)
        .unwrap_or_else(|| TypedValue::String(object.base.clone()));
    let actual = ctx
        .resolve(&result.base)
        .cloned()
        .ok_or_else(|| ActionError::UndefinedVariable(result.base.clone()))?;

    let passed = values_equal(&expected, &actual);

    if let Some(test_context) = ctx.service::<Arc<dyn TestExecutionContext>>() {
        test_context.record_assertion(AssertionRecord {
            variable: result.base.clone(),
            expected: expected.clone(),
            actual: actual.clone(),
            passed,
        });
    }

    if passed {
        Ok(actual)
    } else {
        Err(ActionError::AssertionError {
            message: format!("expected `{}` to equal `{}`", actual.display_string(), expected.display_string()),
            expected: Some(expected),
            actual: Some(actual),
            variable: result.base.clone(),
        })
    }
}

fn values_equal(expected: &TypedValue, actual: &TypedValue) -> bool {
    if let (Some(e), Some(a)) = (expected.to_f64(), actual.to_f64()) {
        return (e - a).abs() < 1e-4;
    }
    if expected == actual {
        return true;
    }
    expected.to_canonical_json() == actual.to_canonical_json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::ObjectDescriptor as OD;

    #[tokio::test]
    async fn given_binds_literal_via_priority() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.bind("_literal_", TypedValue::Integer(5), false).unwrap();
        let result = ResultDescriptor::new("n");
        let object = OD::new("count", Preposition::With);
        let value = Given.execute(&result, &object, &mut ctx).await.unwrap();
        assert_eq!(value, TypedValue::Integer(5));
    }

    #[tokio::test]
    async fn given_falls_back_to_object_base_literal() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        let result = ResultDescriptor::new("n");
        let object = OD::new("draft", Preposition::With);
        let value = Given.execute(&result, &object, &mut ctx).await.unwrap();
        assert_eq!(value, TypedValue::String("draft".to_string()));
    }

    #[tokio::test]
    async fn then_passes_within_float_tolerance() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.bind("sum", TypedValue::Float(8.0), false).unwrap();
        ctx.bind("_literal_", TypedValue::Integer(8), false).unwrap();
        let result = ResultDescriptor::new("sum");
        let object = OD::new("8", Preposition::With);
        let value = Then.execute(&result, &object, &mut ctx).await.unwrap();
        assert_eq!(value, TypedValue::Float(8.0));
    }

    #[tokio::test]
    async fn then_raises_assertion_error_on_mismatch() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.bind("sum", TypedValue::Integer(9), false).unwrap();
        ctx.bind("_literal_", TypedValue::Integer(8), false).unwrap();
        let result = ResultDescriptor::new("sum");
        let object = OD::new("8", Preposition::With);
        let err = Then.execute(&result, &object, &mut ctx).await.unwrap_err();
        assert!(matches!(err, ActionError::AssertionError { .. }));
    }
}
