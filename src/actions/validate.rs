//! `Validate` (spec.md §4.D Own/data family).

use indexmap::IndexMap;
use regex::Regex;

use crate::actions::op_name;
use crate::actions::support::expression_literal_or_object;
use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::Result;
use crate::registry::ActionImpl;
use crate::value::TypedValue;

const KNOWN_RULES: &[&str] = &["required", "exists", "nonempty", "email", "numeric"];

pub struct Validate;

#[async_trait::async_trait]
impl ActionImpl for Validate {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["validate"]
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
        let value = expression_literal_or_object(ctx, object);
        let rule = op_name::resolve(result, KNOWN_RULES, Some("required")).unwrap_or_default();
        let is_valid = check_rule(&rule, value.as_ref());

        let mut m = IndexMap::new();
        m.insert("isValid".to_string(), TypedValue::Boolean(is_valid));
        m.insert("rule".to_string(), TypedValue::String(rule));
        Ok(TypedValue::Map(m))
    }
}

fn check_rule(rule: &str, value: Option<&TypedValue>) -> bool {
    match rule {
        "required" | "exists" => !matches!(value, None | Some(TypedValue::Null)),
        "nonempty" => match value {
            Some(TypedValue::String(s)) => !s.is_empty(),
            Some(TypedValue::List(l)) => !l.is_empty(),
            Some(TypedValue::Map(m)) => !m.is_empty(),
            Some(_) => true,
            None => false,
        },
        "email" => value
            .and_then(|v| v.to_plain_string())
            .map(|s| email_regex().is_match(&s))
            .unwrap_or(false),
        "numeric" => value.map(|v| v.to_f64().is_some()).unwrap_or(false),
        _ => false,
    }
}

fn email_regex() -> Regex {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static email pattern")
}
