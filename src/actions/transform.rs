//! `Transform` (spec.md §4.D Own/data family).

use crate::actions::op_name;
use crate::actions::support::expression_literal_or_object;
use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::registry::ActionImpl;
use crate::value::TypedValue;

const KNOWN_TARGETS: &[&str] = &["string", "int", "double", "bool", "json", "identity"];

pub struct Transform;

#[async_trait::async_trait]
impl ActionImpl for Transform {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["transform", "convert", "coerce"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::From, Preposition::To]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let value = expression_literal_or_object(ctx, object)
            .ok_or_else(|| ActionError::UndefinedVariable(object.base.clone()))?;
        let target = op_name::resolve(result, KNOWN_TARGETS, Some("identity")).unwrap_or_default();
        coerce(&value, &target)
    }
}

fn coerce(value: &TypedValue, target: &str) -> Result<TypedValue> {
    match target {
        "string" => Ok(TypedValue::String(value.display_string())),
        "int" => value.to_i64().map(TypedValue::Integer).ok_or_else(|| type_mismatch("Integer", value)),
        "double" => value.to_f64().map(TypedValue::Float).ok_or_else(|| type_mismatch("Float", value)),
        "bool" => value.to_bool().map(TypedValue::Boolean).ok_or_else(|| type_mismatch("Boolean", value)),
        "json" => Ok(TypedValue::String(value.to_canonical_json())),
        _ => Ok(value.clone()),
    }
}

fn type_mismatch(expected: &str, actual: &TypedValue) -> ActionError {
    ActionError::TypeMismatch {
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
        variable: None,
    }
}
