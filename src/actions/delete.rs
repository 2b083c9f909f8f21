//! `Delete` (spec.md §4.D Own/data family).

use indexmap::IndexMap;

use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::events::{ChangeType, Event, RepositoryChangedEvent};
use crate::registry::ActionImpl;
use crate::value::TypedValue;

pub struct Delete;

#[async_trait::async_trait]
impl ActionImpl for Delete {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["delete", "remove"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::From, Preposition::Where]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        if object.base.ends_with("-repository") {
            return self.delete_from_repository(result, object, ctx).await;
        }

        let target = ctx
            .resolve(&result.base)
            .cloned()
            .ok_or_else(|| ActionError::UndefinedVariable(result.base.clone()))?;

        let updated = match (target, result.specifiers.first()) {
            (TypedValue::Map(mut m), Some(key)) => {
                m.shift_remove(key);
                TypedValue::Map(m)
            }
            (TypedValue::List(mut items), Some(index)) => {
                if let Ok(idx) = index.parse::<i64>() {
                    if let Some(pos) = TypedValue::reverse_index(items.len(), idx) {
                        items.remove(pos);
                    }
                }
                TypedValue::List(items)
            }
            (other, _) => other,
        };
        ctx.bind(&result.base, updated.clone(), true)?;
        Ok(updated)
    }
}

impl Delete {
    async fn delete_from_repository(
        &self,
        _result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let repo = ctx
            .repository()
            .cloned()
            .ok_or_else(|| ActionError::MissingService("RepositoryStore".to_string()))?;

        let field = ctx.resolve("_where_field_").and_then(|v| v.to_plain_string());
        let op = ctx.resolve("_where_op_").and_then(|v| v.to_plain_string());
        let value = ctx.resolve("_where_value_").cloned();
        let (field, op, value) = match (field, op, value) {
            (Some(f), Some(o), Some(v)) => (f, o, v),
            _ => {
                return Err(ActionError::runtime(
                    "Delete from a repository requires a where-clause",
                ))
            }
        };

        let removed = repo.delete(&object.base, &ctx.business_activity, (&field, &op, &value));
        for entry in &removed {
            let entity_id = match entry {
                TypedValue::Map(m) => m.get("id").and_then(|v| v.to_plain_string()),
                _ => None,
            };
            ctx.emit_and_track(Event::RepositoryChanged(RepositoryChangedEvent {
                repository_name: object.base.clone(),
                change_type: ChangeType::Deleted,
                entity_id: entity_id.clone(),
                new_value: None,
                old_value: Some(entry.clone()),
                timestamp: chrono::Utc::now(),
            }))
            .await;
            let mut payload = IndexMap::new();
            payload.insert("deleted".to_string(), entry.clone());
            ctx.emit_and_track(Event::service("data.deleted", payload)).await;
        }
        Ok(TypedValue::List(removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::ObjectDescriptor as OD;
    use crate::repository::map_entry;

    #[tokio::test]
    async fn deletes_map_key() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.bind(
            "order",
            map_entry(vec![("status", TypedValue::String("open".into()))]),
            false,
        )
        .unwrap();
        let object = OD::new("order", Preposition::From);
        let result = ResultDescriptor::new("order").with_specifiers(vec!["status"]);
        let updated = Delete.execute(&result, &object, &mut ctx).await.unwrap();
        match updated {
            TypedValue::Map(m) => assert!(!m.contains_key("status")),
            _ => panic!("expected map"),
        }
    }

    #[tokio::test]
    async fn delete_from_repository_requires_where_clause() {
        let mut ctx =
            ExecutionContext::new("Orders", "fs").with_repository(std::sync::Arc::new(crate::repository::RepositoryStore::new()));
        let object = OD::new("message-repository", Preposition::From);
        let result = ResultDescriptor::new("removed");
        let err = Delete.execute(&result, &object, &mut ctx).await.unwrap_err();
        assert!(matches!(err, ActionError::RuntimeError(_)));
    }
}
