//! Action registry: routes verbs (with synonyms) to implementations while
//! validating role and prepositional compatibility (spec.md §4.C).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::value::TypedValue;

/// Every action family implements this. `execute` assumes the caller has
/// already validated the object's preposition (the executor does this via
/// `ActionRegistry::validate_preposition` per spec.md §4.E step 3).
#[async_trait::async_trait]
pub trait ActionImpl: Send + Sync {
    fn role(&self) -> ActionRole;
    /// Lowercase verb synonyms this implementation answers to.
    fn verbs(&self) -> &[&'static str];
    fn valid_prepositions(&self) -> &[Preposition];

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue>;
}

/// Populated at process start; lookups are lock-free reads once registered
/// (spec.md §4.C).
pub struct ActionRegistry {
    by_verb: RwLock<HashMap<String, Arc<dyn ActionImpl>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            by_verb: RwLock::new(HashMap::new()),
        }
    }

    /// For each verb in the implementation's verb set, records `verb ->
    /// impl`. A verb already claimed is overwritten, with a warning
    /// (later registration wins — tests pin ordering).
    pub fn register(&self, implementation: Arc<dyn ActionImpl>) {
        let mut map = self.by_verb.write().unwrap();
        for verb in implementation.verbs() {
            let key = verb.to_ascii_lowercase();
            if map.contains_key(&key) {
                log::warn!("verb `{key}` re-registered; later registration wins");
            }
            map.insert(key, implementation.clone());
        }
    }

    pub fn lookup(&self, verb: &str) -> Option<Arc<dyn ActionImpl>> {
        self.by_verb.read().unwrap().get(&verb.to_ascii_lowercase()).cloned()
    }

    pub fn validate_preposition(&self, verb: &str, preposition: Preposition) -> Result<()> {
        let implementation = self
            .lookup(verb)
            .ok_or_else(|| ActionError::RuntimeError(format!("no action registered for verb `{verb}`")))?;
        if implementation.valid_prepositions().contains(&preposition) {
            Ok(())
        } else {
            let expected = implementation
                .valid_prepositions()
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            Err(ActionError::InvalidPreposition {
                action: verb.to_string(),
                received: preposition,
                expected,
            })
        }
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::Span;

    struct Stub;

    #[async_trait::async_trait]
    impl ActionImpl for Stub {
        fn role(&self) -> ActionRole {
            ActionRole::Own
        }
        fn verbs(&self) -> &[&'static str] {
            &["stub", "alias"]
        }
        fn valid_prepositions(&self) -> &[Preposition] {
            &[Preposition::From]
        }
        async fn execute(
            &self,
            _result: &ResultDescriptor,
            _object: &ObjectDescriptor,
            _ctx: &mut ExecutionContext,
        ) -> Result<TypedValue> {
            Ok(TypedValue::Null)
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = ActionRegistry::new();
        registry.register(Arc::new(Stub));
        assert!(registry.lookup("STUB").is_some());
        assert!(registry.lookup("Alias").is_some());
        assert!(registry.lookup("unknown").is_none());
    }

    #[test]
    fn invalid_preposition_is_rejected() {
        let registry = ActionRegistry::new();
        registry.register(Arc::new(Stub));
        let err = registry.validate_preposition("stub", Preposition::With).unwrap_err();
        assert!(matches!(err, ActionError::InvalidPreposition { .. }));
    }

    #[test]
    fn valid_preposition_passes() {
        let registry = ActionRegistry::new();
        registry.register(Arc::new(Stub));
        assert!(registry.validate_preposition("stub", Preposition::From).is_ok());
    }

    #[test]
    fn later_registration_wins_for_shared_verb() {
        struct Other;
        #[async_trait::async_trait]
        impl ActionImpl for Other {
            fn role(&self) -> ActionRole {
                ActionRole::Own
            }
            fn verbs(&self) -> &[&'static str] {
                &["stub"]
            }
            fn valid_prepositions(&self) -> &[Preposition] {
                &[Preposition::To]
            }
            async fn execute(
                &self,
                _result: &ResultDescriptor,
                _object: &ObjectDescriptor,
                _ctx: &mut ExecutionContext,
            ) -> Result<TypedValue> {
                Ok(TypedValue::Null)
            }
        }
        let registry = ActionRegistry::new();
        registry.register(Arc::new(Stub));
        registry.register(Arc::new(Other));
        assert!(registry.validate_preposition("stub", Preposition::To).is_ok());
        let _ = Span::default();
    }
}
