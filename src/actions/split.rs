//! `Split` (spec.md §4.D Own/data family).

use regex::{Regex, RegexBuilder};

use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::registry::ActionImpl;
use crate::value::TypedValue;

pub struct Split;

#[async_trait::async_trait]
impl ActionImpl for Split {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["split"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::By]
    }

    async fn execute(
        &self,
        _result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let value = ctx
            .resolve(&object.base)
            .and_then(|v| v.to_plain_string())
            .ok_or_else(|| ActionError::UndefinedVariable(object.base.clone()))?;

        let pattern = ctx
            .resolve("_by_pattern_")
            .and_then(|v| v.to_plain_string())
            .ok_or_else(|| ActionError::MissingRequiredField("by pattern".to_string()))?;
        let flags = ctx
            .resolve("_by_flags_")
            .and_then(|v| v.to_plain_string())
            .unwrap_or_default();

        let re = build_regex(&pattern, &flags)?;
        let parts: Vec<TypedValue> = re
            .split(&value)
            .map(|part| TypedValue::String(part.to_string()))
            .collect();
        Ok(TypedValue::List(parts))
    }
}

fn build_regex(pattern: &str, flags: &str) -> Result<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    builder.case_insensitive(flags.contains('i'));
    builder.dot_matches_new_line(flags.contains('s'));
    builder.multi_line(flags.contains('m'));
    builder.build().map_err(|e| ActionError::InvalidInput {
        message: format!("invalid split pattern: {e}"),
        received: pattern.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::ObjectDescriptor as OD;

    #[tokio::test]
    async fn splits_on_pattern_preserving_trailing_empty_tail() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.bind("csv", TypedValue::String("a,b,".into()), false).unwrap();
        ctx.bind("_by_pattern_", TypedValue::String(",".into()), false).unwrap();
        let object = OD::new("csv", Preposition::By);
        let result = ResultDescriptor::new("parts");
        let parts = Split.execute(&result, &object, &mut ctx).await.unwrap();
        assert_eq!(
            parts,
            TypedValue::List(vec![
                TypedValue::String("a".into()),
                TypedValue::String("b".into()),
                TypedValue::String("".into()),
            ])
        );
    }
}
