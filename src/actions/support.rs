//! Small helpers shared across action families: clause-priority resolution,
//! list-access specifiers, and other bits repeated almost verbatim in
//! spec.md §4.D's contract prose.

use indexmap::IndexMap;

use crate::context::ExecutionContext;
use crate::descriptors::ObjectDescriptor;
use crate::error::{ActionError, Result};
use crate::value::TypedValue;

/// `_expression_` > `_literal_` > `resolve(object.base)` > `object.literal_value`
/// (set when the object clause is itself a literal, e.g. `from <[1,2,3]>`),
/// the priority order named repeatedly across `Create`, `Then`/`Assert`, and
/// friends.
pub fn expression_literal_or_object(
    ctx: &ExecutionContext,
    object: &ObjectDescriptor,
) -> Option<TypedValue> {
    ctx.resolve("_expression_")
        .or_else(|| ctx.resolve("_literal_"))
        .or_else(|| ctx.resolve(&object.base))
        .cloned()
        .or_else(|| object.literal_value.clone())
}

/// `_literal_` > `_expression_` > `resolve(object.base)` > `object.literal_value`,
/// the priority `Given` and `Log` use.
pub fn literal_expression_or_object(
    ctx: &ExecutionContext,
    object: &ObjectDescriptor,
) -> Option<TypedValue> {
    ctx.resolve("_literal_")
        .or_else(|| ctx.resolve("_expression_"))
        .or_else(|| ctx.resolve(&object.base))
        .cloned()
        .or_else(|| object.literal_value.clone())
}

/// Resolves `object.base` as a variable first, falling back to treating it
/// as a literal string (spec.md §4.D Create: "when no source exists … else
/// `object.base` literal" — the same fallback `Given` uses).
pub fn resolve_or_literal_name(ctx: &ExecutionContext, name: &str) -> TypedValue {
    ctx.resolve(name)
        .cloned()
        .unwrap_or_else(|| TypedValue::String(name.to_string()))
}

/// List-access specifiers shared by `Extract`/`Retrieve`/`Map`/`Reduce`/
/// `Delete`: `first`, `last`, a reverse numeric index, an inclusive range
/// `"a-b"`, or a comma-separated pick `"a,b,c"`.
pub fn apply_list_specifier(list: &[TypedValue], specifier: &str) -> Option<TypedValue> {
    match specifier {
        "first" => list.first().cloned(),
        "last" => list.last().cloned(),
        _ if specifier.contains('-') && specifier.parse::<i64>().is_err() => {
            let parts: Vec<&str> = specifier.splitn(2, '-').collect();
            let (a, b) = (parts.first()?.parse::<usize>().ok()?, parts.get(1)?.parse::<usize>().ok()?);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let picked: Vec<TypedValue> = list
                .iter()
                .enumerate()
                .filter_map(|(i, v)| {
                    let reverse_i = list.len() - 1 - i;
                    if reverse_i >= lo && reverse_i <= hi {
                        Some(v.clone())
                    } else {
                        None
                    }
                })
                .collect();
            Some(TypedValue::List(picked))
        }
        _ if specifier.contains(',') => {
            let picked: Vec<TypedValue> = specifier
                .split(',')
                .filter_map(|part| part.trim().parse::<i64>().ok())
                .filter_map(|idx| {
                    TypedValue::reverse_index(list.len(), idx).map(|i| list[i].clone())
                })
                .collect();
            Some(TypedValue::List(picked))
        }
        _ => specifier.parse::<i64>().ok().and_then(|idx| {
            TypedValue::reverse_index(list.len(), idx).map(|i| list[i].clone())
        }),
    }
}

/// Date property extraction shared by `Extract`'s result specifiers.
pub fn date_property(date: &chrono::DateTime<chrono::Utc>, property: &str) -> Option<TypedValue> {
    use chrono::{Datelike, Timelike};
    Some(match property {
        "year" => TypedValue::Integer(date.year() as i64),
        "month" => TypedValue::Integer(date.month() as i64),
        "day" => TypedValue::Integer(date.day() as i64),
        "hour" => TypedValue::Integer(date.hour() as i64),
        "minute" => TypedValue::Integer(date.minute() as i64),
        "second" => TypedValue::Integer(date.second() as i64),
        "weekday" => TypedValue::String(date.weekday().to_string()),
        "timezone" => TypedValue::String("UTC".to_string()),
        _ => return None,
    })
}

/// Flattens a `Map<String, TypedValue>` into dot-path keys, used by
/// `Return`'s `data` assembly and the JSON `data` envelope (spec.md §4.D
/// Response family, §6).
pub fn flatten_dot_paths(prefix: &str, value: &TypedValue, out: &mut IndexMap<String, TypedValue>) {
    match value {
        TypedValue::Map(m) => {
            for (k, v) in m {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten_dot_paths(&key, v, out);
            }
        }
        other => {
            out.insert(prefix.to_string(), other.clone());
        }
    }
}

/// Path resolution shared by the File family: specifier-as-variable,
/// specifier-literal, base-as-variable, base-literal (spec.md §4.D File
/// family). Returns `""` when nothing resolves; callers raise
/// `RuntimeError("… requires a path")` on that.
pub fn resolve_path(ctx: &ExecutionContext, specifiers: &[String], base: &str) -> String {
    if let Some(specifier) = specifiers.first() {
        if let Some(value) = ctx.resolve(specifier).and_then(|v| v.to_plain_string()) {
            return value;
        }
        return specifier.clone();
    }
    if let Some(value) = ctx.resolve(base).and_then(|v| v.to_plain_string()) {
        return value;
    }
    base.to_string()
}

pub fn require_string(value: Option<&TypedValue>, field: &str) -> Result<String> {
    value
        .and_then(|v| v.to_plain_string())
        .ok_or_else(|| ActionError::MissingRequiredField(field.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_specifier_reverse_index() {
        let list = vec![TypedValue::Integer(1), TypedValue::Integer(2), TypedValue::Integer(3)];
        assert_eq!(apply_list_specifier(&list, "0"), Some(TypedValue::Integer(3)));
        assert_eq!(apply_list_specifier(&list, "first"), Some(TypedValue::Integer(1)));
        assert_eq!(apply_list_specifier(&list, "last"), Some(TypedValue::Integer(3)));
    }

    #[test]
    fn list_specifier_range_is_inclusive() {
        let list = vec![TypedValue::Integer(1), TypedValue::Integer(2), TypedValue::Integer(3)];
        let picked = apply_list_specifier(&list, "0-1").unwrap();
        assert_eq!(picked, TypedValue::List(vec![TypedValue::Integer(2), TypedValue::Integer(3)]));
    }
}
