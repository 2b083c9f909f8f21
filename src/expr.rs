//! Evaluates the closed `Expression` surface a clause (`value_source`/
//! `to_source`/`from_source`/`by_source`) carries before clause-binding
//! turns it into an `_..._` auxiliary (spec.md §4.E step 2, SPEC_FULL §3
//! supplement).

use indexmap::IndexMap;

use crate::context::ExecutionContext;
use crate::descriptors::Expression;
use crate::error::{ActionError, Result};
use crate::value::TypedValue;

pub fn evaluate(expr: &Expression, ctx: &ExecutionContext) -> Result<TypedValue> {
    match expr {
        Expression::VarRef(name) => ctx
            .resolve(name)
            .cloned()
            .ok_or_else(|| ActionError::UndefinedVariable(name.clone())),
        Expression::Path(base, segments) => {
            let mut current = ctx
                .resolve(base)
                .cloned()
                .ok_or_else(|| ActionError::UndefinedVariable(base.clone()))?;
            for segment in segments {
                current = step(&current, segment)?;
            }
            Ok(current)
        }
        // `Aggregate(field, op)` — the executor recognizes this shape directly on
        // a by-clause and binds `_aggregation_field_`/`_aggregation_type_`
        // instead of calling this branch; evaluated standalone (e.g. nested in
        // a `Binary`) it resolves `field` as a bound list and reduces it.
        Expression::Aggregate(field, op) => {
            let value = ctx
                .resolve(field)
                .cloned()
                .ok_or_else(|| ActionError::UndefinedVariable(field.clone()))?;
            let TypedValue::List(items) = value else {
                return Err(ActionError::TypeMismatch {
                    expected: "List".to_string(),
                    actual: value.type_name().to_string(),
                    variable: Some(field.clone()),
                });
            };
            Ok(aggregate(&items, op))
        }
        Expression::Regex(pattern, flags) => {
            let mut map = IndexMap::new();
            map.insert("pattern".to_string(), TypedValue::String(pattern.clone()));
            map.insert("flags".to_string(), TypedValue::String(flags.clone()));
            Ok(TypedValue::Map(map))
        }
        Expression::Map(m) => Ok(TypedValue::Map(m.clone())),
        Expression::List(items) => Ok(TypedValue::List(items.clone())),
        Expression::Binary(lhs, op, rhs) => {
            let l = evaluate(lhs, ctx)?;
            let r = evaluate(rhs, ctx)?;
            Ok(binary(&l, op, &r))
        }
    }
}

fn step(current: &TypedValue, segment: &str) -> Result<TypedValue> {
    match current {
        TypedValue::Map(m) => m.get(segment).cloned().ok_or_else(|| ActionError::PropertyNotFound {
            property: segment.to_string(),
            on: "object".to_string(),
        }),
        TypedValue::List(items) => segment
            .parse::<i64>()
            .ok()
            .and_then(|idx| TypedValue::reverse_index(items.len(), idx))
            .map(|i| items[i].clone())
            .ok_or_else(|| ActionError::PropertyNotFound {
                property: segment.to_string(),
                on: "list".to_string(),
            }),
        other => Err(ActionError::PropertyNotFound {
            property: segment.to_string(),
            on: other.type_name().to_string(),
        }),
    }
}

fn aggregate(items: &[TypedValue], op: &str) -> TypedValue {
    let numbers: Vec<f64> = items.iter().filter_map(|v| v.to_f64()).collect();
    match op {
        "count" => TypedValue::Integer(items.len() as i64),
        "sum" => TypedValue::Float(numbers.iter().sum()),
        "avg" | "average" if numbers.is_empty() => TypedValue::Integer(0),
        "avg" | "average" => TypedValue::Float(numbers.iter().sum::<f64>() / numbers.len() as f64),
        "min" => numbers
            .into_iter()
            .fold(None, |acc: Option<f64>, x| Some(acc.map_or(x, |a| a.min(x))))
            .map(TypedValue::Float)
            .unwrap_or(TypedValue::Integer(0)),
        "max" => numbers
            .into_iter()
            .fold(None, |acc: Option<f64>, x| Some(acc.map_or(x, |a| a.max(x))))
            .map(TypedValue::Float)
            .unwrap_or(TypedValue::Integer(0)),
        "first" => items.first().cloned().unwrap_or(TypedValue::List(Vec::new())),
        "last" => items.last().cloned().unwrap_or(TypedValue::List(Vec::new())),
        _ => TypedValue::Integer(items.len() as i64),
    }
}

fn binary(lhs: &TypedValue, op: &str, rhs: &TypedValue) -> TypedValue {
    match op {
        "+" => arithmetic_or_concat(lhs, rhs, |a, b| a + b, |a, b| format!("{a}{b}")),
        "-" => TypedValue::Float(lhs.to_f64().unwrap_or(0.0) - rhs.to_f64().unwrap_or(0.0)),
        "*" => TypedValue::Float(lhs.to_f64().unwrap_or(0.0) * rhs.to_f64().unwrap_or(0.0)),
        "/" => TypedValue::Float(lhs.to_f64().unwrap_or(0.0) / rhs.to_f64().unwrap_or(1.0)),
        _ => TypedValue::Boolean(crate::predicate::evaluate(lhs, op, rhs)),
    }
}

fn arithmetic_or_concat(
    lhs: &TypedValue,
    rhs: &TypedValue,
    numeric: impl Fn(f64, f64) -> f64,
    string: impl Fn(&str, &str) -> String,
) -> TypedValue {
    if let (Some(a), Some(b)) = (lhs.to_f64(), rhs.to_f64()) {
        return TypedValue::Float(numeric(a, b));
    }
    if let (Some(a), Some(b)) = (lhs.to_plain_string(), rhs.to_plain_string()) {
        return TypedValue::String(string(&a, &b));
    }
    TypedValue::Null
}
