//! `Accept` (spec.md §4.D Own/data family): a state-machine transition.

use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::events::{Event, StateTransitionEvent};
use crate::registry::ActionImpl;
use crate::value::TypedValue;

pub struct Accept;

#[async_trait::async_trait]
impl ActionImpl for Accept {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["accept"]
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
        let (from, to, target) = parse_transition(result)?;
        let field = object.specifiers.first().cloned().unwrap_or_else(|| "status".to_string());

        let entity = ctx
            .resolve(&object.base)
            .cloned()
            .ok_or_else(|| ActionError::UndefinedVariable(object.base.clone()))?;
        let TypedValue::Map(mut m) = entity else {
            return Err(ActionError::TypeMismatch {
                expected: "Map".to_string(),
                actual: "non-map".to_string(),
                variable: Some(object.base.clone()),
            });
        };

        let actual = m.get(&field).and_then(|v| v.to_plain_string()).unwrap_or_default();
        if actual != from {
            return Err(ActionError::AcceptStateError {
                expected_from: from,
                expected_to: to,
                actual,
                obj: target,
                field,
            });
        }

        m.insert(field.clone(), TypedValue::String(to.clone()));
        let updated = TypedValue::Map(m);
        ctx.bind(&object.base, updated.clone(), true)?;

        let entity_id = match &updated {
            TypedValue::Map(m) => m.get("id").and_then(|v| v.to_plain_string()),
            _ => None,
        };
        ctx.emit_and_track(Event::StateTransition(StateTransitionEvent {
            field_name: field,
            object_name: target,
            from_state: from,
            to_state: to,
            entity_id,
            entity: updated.clone(),
            timestamp: chrono::Utc::now(),
        }))
        .await;

        Ok(updated)
    }
}

/// Three specifiers `[from, to, target]`, or `result.base` split on `_` into
/// exactly three tokens (spec.md §4.D).
fn parse_transition(result: &ResultDescriptor) -> Result<(String, String, String)> {
    if result.specifiers.len() >= 3 {
        return Ok((
            result.specifiers[0].clone(),
            result.specifiers[1].clone(),
            result.specifiers[2].clone(),
        ));
    }
    let parts: Vec<&str> = result.base.splitn(3, '_').collect();
    match parts.as_slice() {
        [from, to, target] => Ok((from.to_string(), to.to_string(), target.to_string())),
        _ => Err(ActionError::InvalidInput {
            message: "Accept requires a from_to_target transition".to_string(),
            received: result.base.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::ObjectDescriptor as OD;
    use crate::repository::map_entry;

    #[tokio::test]
    async fn transition_from_mismatched_state_fails() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.bind(
            "order",
            map_entry(vec![("status", TypedValue::String("new".into()))]),
            false,
        )
        .unwrap();
        let object = OD::new("order", Preposition::From).with_specifiers(vec!["status"]);
        let result = ResultDescriptor::new("processing_shipped_order");
        let err = Accept.execute(&result, &object, &mut ctx).await.unwrap_err();
        assert!(matches!(err, ActionError::AcceptStateError { .. }));
    }

    #[tokio::test]
    async fn matching_from_state_transitions_and_rebinds() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.bind(
            "order",
            map_entry(vec![("status", TypedValue::String("processing".into()))]),
            false,
        )
        .unwrap();
        let object = OD::new("order", Preposition::From).with_specifiers(vec!["status"]);
        let result = ResultDescriptor::new("processing_shipped_order");
        let updated = Accept.execute(&result, &object, &mut ctx).await.unwrap();
        match updated {
            TypedValue::Map(m) => assert_eq!(m.get("status"), Some(&TypedValue::String("shipped".into()))),
            _ => panic!("expected map"),
        }
    }
}
