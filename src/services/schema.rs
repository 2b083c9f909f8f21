//! Schema registry seam. Validation itself is an external collaborator
//! (spec.md §1); the core only needs to know whether a PascalCase qualifier
//! names a registered schema and, if asked, whether a value conforms.

use crate::value::TypedValue;

pub trait SchemaRegistry: Send + Sync {
    fn has(&self, name: &str) -> bool;
    fn validate(&self, name: &str, value: &TypedValue) -> bool;
}

/// No schemas registered; every name is unknown, every validation passes
/// vacuously. Lets the crate run standalone without an OpenAPI backend.
pub struct NullSchemaRegistry;

impl SchemaRegistry for NullSchemaRegistry {
    fn has(&self, _name: &str) -> bool {
        false
    }

    fn validate(&self, _name: &str, _value: &TypedValue) -> bool {
        true
    }
}
