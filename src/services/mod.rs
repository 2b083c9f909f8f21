//! Service trait seams registered on an `ExecutionContext` (spec.md §4.B:
//! "Services are Send-able handles"). Each trait is the contract an
//! embedding application implements; a minimal usable default ships for the
//! ones this crate can reasonably provide standalone (spec.md §6
//! `ParameterStorage`).

pub mod callable;
pub mod fs;
pub mod http;
pub mod logging;
pub mod messaging;
pub mod schema;
pub mod server;
pub mod shell;
pub mod terminal;
pub mod test_context;

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::value::TypedValue;

/// Out-of-scope CLI plumbing narrows to this single contract
/// (spec.md §6, SPEC_FULL §6 supplement).
pub trait ParameterStorage: Send + Sync {
    fn get(&self, name: &str) -> Option<TypedValue>;
    fn get_all(&self) -> indexmap::IndexMap<String, TypedValue>;
}

/// Backed by `std::env` plus an in-memory override map, so the crate is
/// usable standalone and in tests without an embedding CLI.
pub struct EnvParameterStorage {
    overrides: RwLock<HashMap<String, TypedValue>>,
}

impl EnvParameterStorage {
    pub fn new() -> Self {
        Self {
            overrides: RwLock::new(HashMap::new()),
        }
    }

    pub fn set(&self, name: impl Into<String>, value: TypedValue) {
        self.overrides.write().unwrap().insert(name.into(), value);
    }
}

impl Default for EnvParameterStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStorage for EnvParameterStorage {
    fn get(&self, name: &str) -> Option<TypedValue> {
        if let Some(v) = self.overrides.read().unwrap().get(name) {
            return Some(v.clone());
        }
        std::env::var(name).ok().map(TypedValue::String)
    }

    fn get_all(&self) -> indexmap::IndexMap<String, TypedValue> {
        let mut map: indexmap::IndexMap<String, TypedValue> = std::env::vars()
            .map(|(k, v)| (k, TypedValue::String(v)))
            .collect();
        for (k, v) in self.overrides.read().unwrap().iter() {
            map.insert(k.clone(), v.clone());
        }
        map
    }
}

/// Injected clock, so tests can pin `Compute the <now: date>` and friends
/// (spec.md §4.B "date service").
pub trait DateService: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemDateService;

impl DateService for SystemDateService {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
