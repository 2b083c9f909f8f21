//! `Retrieve` (aliases fetch/load/find) (spec.md §4.D Source-read family).

use crate::actions::support::apply_list_specifier;
use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::registry::ActionImpl;
use crate::value::TypedValue;

pub struct Retrieve;

#[async_trait::async_trait]
impl ActionImpl for Retrieve {
    fn role(&self) -> ActionRole {
        ActionRole::Request
    }

    fn verbs(&self) -> &[&'static str] {
        &["retrieve", "fetch", "load", "find"]
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
        if object.base.ends_with("-repository") {
            let repo = ctx
                .repository()
                .cloned()
                .ok_or_else(|| ActionError::MissingService("RepositoryStore".to_string()))?;
            let where_clause = ctx.resolve("_where_field_").and_then(|field| {
                let op = ctx.resolve("_where_op_")?.to_plain_string()?;
                let value = ctx.resolve("_where_value_")?;
                Some((field.to_plain_string()?, op, value.clone()))
            });
            let entries = repo.retrieve(
                &object.base,
                &ctx.business_activity,
                where_clause
                    .as_ref()
                    .map(|(f, op, v)| (f.as_str(), op.as_str(), v)),
            );
            return Ok(match entries.len() {
                1 if where_clause.is_some() => entries.into_iter().next().unwrap(),
                _ => TypedValue::List(entries),
            });
        }

        let value = ctx
            .resolve(&object.base)
            .cloned()
            .ok_or_else(|| ActionError::UndefinedRepository(object.base.clone()))?;

        match (&value, object.specifiers.first()) {
            (TypedValue::List(items), Some(specifier)) => {
                Ok(apply_list_specifier(items, specifier).unwrap_or(TypedValue::List(items.clone())))
            }
            _ => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::ObjectDescriptor as OD;
    use crate::repository::{map_entry, RepositoryStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn retrieve_empty_repository_returns_empty_list_not_error() {
        let mut ctx = ExecutionContext::new("Orders", "fs").with_repository(Arc::new(RepositoryStore::new()));
        let result = Retrieve
            .execute(
                &ResultDescriptor::new("all"),
                &OD::new("message-repository", Preposition::From),
                &mut ctx,
            )
            .await
            .unwrap();
        assert_eq!(result, TypedValue::List(vec![]));
    }

    #[tokio::test]
    async fn retrieve_with_single_match_returns_scalar() {
        let repo = Arc::new(RepositoryStore::new());
        repo.store_with_change_info(
            map_entry(vec![("id", TypedValue::String("m1".into()))]),
            "message-repository",
            "Orders",
        );
        let mut ctx = ExecutionContext::new("Orders", "fs").with_repository(repo);
        ctx.bind("_where_field_", TypedValue::String("id".into()), false).unwrap();
        ctx.bind("_where_op_", TypedValue::String("is".into()), false).unwrap();
        ctx.bind("_where_value_", TypedValue::String("m1".into()), false).unwrap();
        let result = Retrieve
            .execute(
                &ResultDescriptor::new("one"),
                &OD::new("message-repository", Preposition::From),
                &mut ctx,
            )
            .await
            .unwrap();
        assert!(matches!(result, TypedValue::Map(_)));
    }
}
