//! In-memory multi-tenant repository storage (spec.md §4.F).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use indexmap::IndexMap;

use crate::idgen::generate_id;
use crate::predicate;
use crate::value::TypedValue;

#[derive(Debug, Clone)]
pub struct StoreResult {
    pub stored_value: TypedValue,
    pub entity_id: Option<String>,
    pub is_update: bool,
    pub old_value: Option<TypedValue>,
}

fn entry_id(value: &TypedValue) -> Option<String> {
    match value {
        TypedValue::Map(m) => m.get("id").and_then(|v| v.to_plain_string()),
        _ => None,
    }
}

/// `Map<(businessActivity, repositoryName), List<TypedValue>>`, one
/// `Mutex`-guarded slot per `(biz, repo)` pair so unrelated repositories
/// never contend (spec.md §4.F, §5).
pub struct RepositoryStore {
    slots: RwLock<HashMap<(String, String), Arc<Mutex<Vec<TypedValue>>>>>,
}

impl RepositoryStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    fn slot(&self, business_activity: &str, repo: &str) -> Arc<Mutex<Vec<TypedValue>>> {
        let key = (business_activity.to_string(), repo.to_string());
        if let Some(slot) = self.slots.read().unwrap().get(&key) {
            return slot.clone();
        }
        let mut slots = self.slots.write().unwrap();
        slots
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone()
    }

    /// Appends `value`, injecting a generated `id` into maps that lack one.
    /// An existing entry sharing the new value's `id` is replaced in place
    /// (`isUpdate=true`); otherwise the value is appended.
    pub fn store_with_change_info(
        &self,
        mut value: TypedValue,
        repo: &str,
        business_activity: &str,
    ) -> StoreResult {
        if let TypedValue::Map(ref mut m) = value {
            if !m.contains_key("id") {
                m.insert("id".to_string(), TypedValue::String(generate_id()));
            }
        }
        let id = entry_id(&value);
        let slot = self.slot(business_activity, repo);
        let mut list = slot.lock().unwrap();

        if let Some(id) = &id {
            if let Some(existing_idx) = list.iter().position(|v| entry_id(v).as_deref() == Some(id.as_str())) {
                let old_value = list[existing_idx].clone();
                list[existing_idx] = value.clone();
                return StoreResult {
                    stored_value: value,
                    entity_id: Some(id.clone()),
                    is_update: true,
                    old_value: Some(old_value),
                };
            }
        }

        list.push(value.clone());
        StoreResult {
            stored_value: value,
            entity_id: id,
            is_update: false,
            old_value: None,
        }
    }

    /// Returns the full list, or the where-filtered sublist (empty when
    /// nothing matches — never a failure, spec.md §8 Boundary behaviors).
    pub fn retrieve(
        &self,
        repo: &str,
        business_activity: &str,
        where_clause: Option<(&str, &str, &TypedValue)>,
    ) -> Vec<TypedValue> {
        let slot = self.slot(business_activity, repo);
        let list = slot.lock().unwrap();
        match where_clause {
            None => list.clone(),
            Some((field, op, value)) => list
                .iter()
                .filter(|entry| matches_field(entry, field, op, value))
                .cloned()
                .collect(),
        }
    }

    /// Removes every entry matching `where_clause`, returning the removed
    /// entries.
    pub fn delete(
        &self,
        repo: &str,
        business_activity: &str,
        where_clause: (&str, &str, &TypedValue),
    ) -> Vec<TypedValue> {
        let (field, op, value) = where_clause;
        let slot = self.slot(business_activity, repo);
        let mut list = slot.lock().unwrap();
        let mut removed = Vec::new();
        list.retain(|entry| {
            if matches_field(entry, field, op, value) {
                removed.push(entry.clone());
                false
            } else {
                true
            }
        });
        removed
    }
}

impl Default for RepositoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_field(entry: &TypedValue, field: &str, op: &str, value: &TypedValue) -> bool {
    let field_value = match entry {
        TypedValue::Map(m) => m.get(field),
        _ => None,
    };
    match field_value {
        Some(fv) => predicate::evaluate(fv, op, value),
        None => false,
    }
}

pub fn map_entry(pairs: Vec<(&str, TypedValue)>) -> TypedValue {
    let mut m = IndexMap::new();
    for (k, v) in pairs {
        m.insert(k.to_string(), v);
    }
    TypedValue::Map(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieve_from_empty_repository_is_empty_not_an_error() {
        let store = RepositoryStore::new();
        let all = store.retrieve("message-repository", "Orders", None);
        assert!(all.is_empty());
    }

    #[test]
    fn store_then_retrieve_roundtrips() {
        let store = RepositoryStore::new();
        let msg = map_entry(vec![
            ("id", TypedValue::String("m1".into())),
            ("text", TypedValue::String("hi".into())),
        ]);
        let result = store.store_with_change_info(msg.clone(), "message-repository", "Orders");
        assert_eq!(result.entity_id.as_deref(), Some("m1"));
        assert!(!result.is_update);

        let all = store.retrieve("message-repository", "Orders", None);
        assert_eq!(all, vec![msg]);
    }

    #[test]
    fn storing_same_id_twice_is_an_update() {
        let store = RepositoryStore::new();
        let v1 = map_entry(vec![
            ("id", TypedValue::String("m1".into())),
            ("text", TypedValue::String("hi".into())),
        ]);
        let v2 = map_entry(vec![
            ("id", TypedValue::String("m1".into())),
            ("text", TypedValue::String("bye".into())),
        ]);
        store.store_with_change_info(v1, "message-repository", "Orders");
        let result = store.store_with_change_info(v2, "message-repository", "Orders");
        assert!(result.is_update);
        assert_eq!(store.retrieve("message-repository", "Orders", None).len(), 1);
    }

    #[test]
    fn where_clause_filters_repository_entries() {
        let store = RepositoryStore::new();
        store.store_with_change_info(
            map_entry(vec![("id", TypedValue::String("m1".into()))]),
            "message-repository",
            "Orders",
        );
        store.store_with_change_info(
            map_entry(vec![("id", TypedValue::String("m2".into()))]),
            "message-repository",
            "Orders",
        );
        let filtered = store.retrieve(
            "message-repository",
            "Orders",
            Some(("id", "is", &TypedValue::String("m1".into()))),
        );
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn unrelated_business_activities_do_not_share_entries() {
        let store = RepositoryStore::new();
        store.store_with_change_info(
            map_entry(vec![("id", TypedValue::String("m1".into()))]),
            "message-repository",
            "Orders",
        );
        let other = store.retrieve("message-repository", "Billing", None);
        assert!(other.is_empty());
    }
}
