//! `TypedValue`: the tagged variant every binding, clause and response carries
//! (spec.md §3, §4.A).

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// An opaque handle's payload. Implementors provide a human-readable
/// representation for `Log`/`Return` stringification (spec.md §4.A).
pub trait OpaqueData: fmt::Debug + Send + Sync + 'static {
    fn describe(&self) -> String;
}

#[derive(Clone)]
pub struct OpaqueHandle(pub Arc<dyn OpaqueData>);

impl fmt::Debug for OpaqueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl PartialEq for OpaqueHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A recurrence rule, e.g. "every Monday", as produced by `Create the
/// <…: recurrence>` (spec.md §4.D).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    pub pattern: String,
    pub start: Option<DateTime<Utc>>,
    pub count: Option<u32>,
}

/// A scalar distance with a unit, e.g. produced by `Compute the <…: distance>`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    pub value: f64,
    pub unit: DistanceUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceUnit {
    Meters,
    Kilometers,
    Miles,
    Feet,
}

/// The closed, tagged value variant every binding carries (spec.md §3).
#[derive(Debug, Clone)]
pub enum TypedValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<TypedValue>),
    Map(IndexMap<String, TypedValue>),
    Date(DateTime<Utc>),
    DateRange(DateTime<Utc>, DateTime<Utc>),
    Recurrence(Recurrence),
    Distance(Distance),
    Null,
    Opaque(String, OpaqueHandle),
}

impl PartialEq for TypedValue {
    fn eq(&self, other: &Self) -> bool {
        use TypedValue::*;
        match (self, other) {
            (String(a), String(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Boolean(a), Boolean(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (DateRange(a1, a2), DateRange(b1, b2)) => a1 == b1 && a2 == b2,
            (Recurrence(a), Recurrence(b)) => a == b,
            (Distance(a), Distance(b)) => a == b,
            (Null, Null) => true,
            (Opaque(t1, h1), Opaque(t2, h2)) => t1 == t2 && h1 == h2,
            _ => false,
        }
    }
}

impl TypedValue {
    pub fn string(s: impl Into<String>) -> Self {
        TypedValue::String(s.into())
    }

    pub fn list(items: Vec<TypedValue>) -> Self {
        TypedValue::List(items)
    }

    pub fn map(entries: IndexMap<String, TypedValue>) -> Self {
        TypedValue::Map(entries)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            TypedValue::String(_) => "String",
            TypedValue::Integer(_) => "Integer",
            TypedValue::Float(_) => "Float",
            TypedValue::Boolean(_) => "Boolean",
            TypedValue::List(_) => "List",
            TypedValue::Map(_) => "Map",
            TypedValue::Date(_) => "Date",
            TypedValue::DateRange(_, _) => "DateRange",
            TypedValue::Recurrence(_) => "Recurrence",
            TypedValue::Distance(_) => "Distance",
            TypedValue::Null => "Null",
            TypedValue::Opaque(_, _) => "Opaque",
        }
    }

    // -- total, explicit conversions (spec.md §4.A: "always return an optional") --

    pub fn as_string(&self) -> Option<TypedValue> {
        match self {
            TypedValue::String(_) => Some(self.clone()),
            TypedValue::Integer(i) => Some(TypedValue::String(i.to_string())),
            TypedValue::Float(f) => Some(TypedValue::String(f.to_string())),
            TypedValue::Boolean(b) => Some(TypedValue::String(b.to_string())),
            TypedValue::Null => Some(TypedValue::String(String::new())),
            TypedValue::List(_) | TypedValue::Map(_) => {
                Some(TypedValue::String(self.to_canonical_json()))
            }
            _ => Some(TypedValue::String(self.display_string())),
        }
    }

    pub fn as_int(&self) -> Option<TypedValue> {
        match self {
            TypedValue::Integer(_) => Some(self.clone()),
            TypedValue::Float(f) if f.fract() == 0.0 => Some(TypedValue::Integer(*f as i64)),
            TypedValue::String(s) => s.trim().parse::<i64>().ok().map(TypedValue::Integer),
            TypedValue::Boolean(b) => Some(TypedValue::Integer(if *b { 1 } else { 0 })),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<TypedValue> {
        match self {
            TypedValue::Float(_) => Some(self.clone()),
            TypedValue::Integer(i) => Some(TypedValue::Float(*i as f64)),
            TypedValue::String(s) => s.trim().parse::<f64>().ok().map(TypedValue::Float),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<TypedValue> {
        match self {
            TypedValue::Boolean(_) => Some(self.clone()),
            TypedValue::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(TypedValue::Boolean(true)),
                "false" | "no" | "0" => Some(TypedValue::Boolean(false)),
                _ => None,
            },
            TypedValue::Integer(i) => Some(TypedValue::Boolean(*i != 0)),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<TypedValue> {
        match self {
            TypedValue::List(_) => Some(self.clone()),
            TypedValue::Null => Some(TypedValue::List(Vec::new())),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<TypedValue> {
        match self {
            TypedValue::Map(_) => Some(self.clone()),
            _ => None,
        }
    }

    /// Raw f64 helper for numeric operations internal to actions (not part of
    /// the public coercion surface, which always returns `TypedValue`).
    pub fn to_f64(&self) -> Option<f64> {
        match self.as_double()? {
            TypedValue::Float(f) => Some(f),
            _ => None,
        }
    }

    pub fn to_i64(&self) -> Option<i64> {
        match self.as_int()? {
            TypedValue::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn to_plain_string(&self) -> Option<String> {
        match self.as_string()? {
            TypedValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self.as_bool()? {
            TypedValue::Boolean(b) => Some(b),
            _ => None,
        }
    }

    /// Canonical JSON-ish stringification for List/Map/primitive values; a
    /// human-readable representation for opaque handles (spec.md §4.A).
    pub fn display_string(&self) -> String {
        match self {
            TypedValue::String(s) => s.clone(),
            TypedValue::Integer(i) => i.to_string(),
            TypedValue::Float(f) => f.to_string(),
            TypedValue::Boolean(b) => b.to_string(),
            TypedValue::Null => "null".to_string(),
            TypedValue::Date(d) => d.to_rfc3339(),
            TypedValue::DateRange(a, b) => format!("{}/{}", a.to_rfc3339(), b.to_rfc3339()),
            TypedValue::Recurrence(r) => r.pattern.clone(),
            TypedValue::Distance(d) => format!("{}{:?}", d.value, d.unit),
            TypedValue::Opaque(tag, h) => format!("<{tag}: {}>", h.0.describe()),
            TypedValue::List(_) | TypedValue::Map(_) => self.to_canonical_json(),
        }
    }

    pub fn to_canonical_json(&self) -> String {
        serde_json::to_string(&JsonView(self)).unwrap_or_default()
    }

    /// Reverse-index into a list: `values[count-1-index]`, canonical across
    /// the list-access family (spec.md §9 open questions, resolved to reverse).
    pub fn reverse_index(len: usize, index: i64) -> Option<usize> {
        if index < 0 {
            return None;
        }
        let index = index as usize;
        if index >= len {
            None
        } else {
            Some(len - 1 - index)
        }
    }
}

/// Thin wrapper so we can `Serialize` a `&TypedValue` without committing the
/// public type to any particular serde representation.
struct JsonView<'a>(&'a TypedValue);

impl<'a> Serialize for JsonView<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::{SerializeMap, SerializeSeq};
        match self.0 {
            TypedValue::String(s) => serializer.serialize_str(s),
            TypedValue::Integer(i) => serializer.serialize_i64(*i),
            TypedValue::Float(f) => serializer.serialize_f64(*f),
            TypedValue::Boolean(b) => serializer.serialize_bool(*b),
            TypedValue::Null => serializer.serialize_none(),
            TypedValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&JsonView(item))?;
                }
                seq.end()
            }
            TypedValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, &JsonView(v))?;
                }
                map.end()
            }
            TypedValue::Date(d) => serializer.serialize_str(&d.to_rfc3339()),
            TypedValue::DateRange(a, b) => {
                serializer.serialize_str(&format!("{}/{}", a.to_rfc3339(), b.to_rfc3339()))
            }
            TypedValue::Recurrence(r) => serializer.serialize_str(&r.pattern),
            TypedValue::Distance(d) => serializer.serialize_f64(d.value),
            TypedValue::Opaque(tag, h) => {
                serializer.serialize_str(&format!("<{tag}: {}>", h.0.describe()))
            }
        }
    }
}

impl From<serde_json::Value> for TypedValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => TypedValue::Null,
            serde_json::Value::Bool(b) => TypedValue::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    TypedValue::Integer(i)
                } else {
                    TypedValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => TypedValue::String(s),
            serde_json::Value::Array(items) => {
                TypedValue::List(items.into_iter().map(TypedValue::from).collect())
            }
            serde_json::Value::Object(map) => TypedValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, TypedValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&TypedValue> for serde_json::Value {
    fn from(v: &TypedValue) -> Self {
        match v {
            TypedValue::String(s) => serde_json::Value::String(s.clone()),
            TypedValue::Integer(i) => serde_json::Value::from(*i),
            TypedValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            TypedValue::Boolean(b) => serde_json::Value::Bool(*b),
            TypedValue::Null => serde_json::Value::Null,
            TypedValue::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            TypedValue::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
            TypedValue::Date(d) => serde_json::Value::String(d.to_rfc3339()),
            TypedValue::DateRange(a, b) => {
                serde_json::Value::String(format!("{}/{}", a.to_rfc3339(), b.to_rfc3339()))
            }
            TypedValue::Recurrence(r) => serde_json::Value::String(r.pattern.clone()),
            TypedValue::Distance(d) => serde_json::Value::from(d.value),
            TypedValue::Opaque(tag, h) => {
                serde_json::Value::String(format!("<{tag}: {}>", h.0.describe()))
            }
        }
    }
}

impl From<TypedValue> for serde_json::Value {
    fn from(v: TypedValue) -> Self {
        serde_json::Value::from(&v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_and_float_are_never_structurally_equal() {
        assert_ne!(TypedValue::Integer(2), TypedValue::Float(2.0));
    }

    #[test]
    fn widening_is_explicit() {
        assert_eq!(
            TypedValue::Integer(3).as_double(),
            Some(TypedValue::Float(3.0))
        );
    }

    #[test]
    fn reverse_index_matches_list_access_family() {
        // xs[len-1-i]
        assert_eq!(TypedValue::reverse_index(3, 0), Some(2));
        assert_eq!(TypedValue::reverse_index(3, 2), Some(0));
        assert_eq!(TypedValue::reverse_index(3, 3), None);
    }

    #[test]
    fn length_identity_on_scalar_is_handled_by_caller() {
        // Compute length documents identity behavior on scalars; value.rs
        // itself has no "length" concept, that's actions::compute's job.
        assert_eq!(TypedValue::Integer(5).as_list(), None);
    }

    #[test]
    fn json_round_trip_preserves_int_vs_float() {
        let v = TypedValue::Integer(7);
        let j: serde_json::Value = (&v).into();
        assert_eq!(TypedValue::from(j), v);
    }
}
