//! `Update` and `Merge` (spec.md §4.D Own/data family). Both load a target,
//! combine it with an incoming value, and rebind with `allowRebind=true`.

use indexmap::IndexMap;

use crate::actions::support::expression_literal_or_object;
use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::Result;
use crate::registry::ActionImpl;
use crate::value::TypedValue;

pub struct Update;

#[async_trait::async_trait]
impl ActionImpl for Update {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["update", "modify", "change", "set", "configure"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::With, Preposition::To]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let incoming = expression_literal_or_object(ctx, object).unwrap_or(TypedValue::Null);
        let target = ctx
            .resolve(&result.base)
            .cloned()
            .unwrap_or_else(|| TypedValue::Map(IndexMap::new()));

        let updated = match result.specifiers.first() {
            Some(field) => {
                let mut m = match target {
                    TypedValue::Map(m) => m,
                    _ => IndexMap::new(),
                };
                m.insert(field.clone(), incoming);
                TypedValue::Map(m)
            }
            None => combine(target, incoming),
        };

        ctx.bind(&result.base, updated.clone(), true)?;
        Ok(updated)
    }
}

pub struct Merge;

#[async_trait::async_trait]
impl ActionImpl for Merge {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["merge", "combine", "join", "concat"]
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
        let incoming = expression_literal_or_object(ctx, object).unwrap_or(TypedValue::Null);
        let target = ctx.resolve(&result.base).cloned().unwrap_or(TypedValue::Null);
        let merged = combine(target, incoming);
        ctx.bind(&result.base, merged.clone(), true)?;
        Ok(merged)
    }
}

/// Dictionary merge (second wins), list concat, string concat, else replace.
fn combine(target: TypedValue, incoming: TypedValue) -> TypedValue {
    match (target, incoming) {
        (TypedValue::Map(mut a), TypedValue::Map(b)) => {
            for (k, v) in b {
                a.insert(k, v);
            }
            TypedValue::Map(a)
        }
        (TypedValue::List(mut a), TypedValue::List(b)) => {
            a.extend(b);
            TypedValue::List(a)
        }
        (TypedValue::String(a), TypedValue::String(b)) => TypedValue::String(a + &b),
        (_, incoming) => incoming,
    }
}
