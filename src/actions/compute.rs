//! `Compute` (spec.md §4.D Own/data family).

use std::collections::HashMap;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::actions::op_name;
use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::registry::ActionImpl;
use crate::value::TypedValue;

const KNOWN_OPS: &[&str] = &[
    "hash", "length", "count", "uppercase", "lowercase", "identity", "date", "format",
    "distance", "intersect", "difference", "union",
];

pub struct Compute;

#[async_trait::async_trait]
impl ActionImpl for Compute {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["compute"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::From, Preposition::With]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let primary = primary_operand(ctx, object)?;
        let op = op_name::resolve(result, KNOWN_OPS, None);

        if let Some(op) = op.as_deref() {
            return match op {
                "hash" => Ok(compute_hash(&primary)),
                "length" | "count" => Ok(compute_length(&primary)),
                "uppercase" => Ok(string_case(&primary, true)?),
                "lowercase" => Ok(string_case(&primary, false)?),
                "identity" => Ok(primary),
                "date" => parse_date(&primary),
                "format" => Ok(format_value(&primary, ctx)),
                "distance" => compute_distance(&primary, secondary_operand(ctx)),
                "intersect" => compute_set_op(&primary, secondary_operand(ctx), SetOp::Intersect),
                "difference" => compute_set_op(&primary, secondary_operand(ctx), SetOp::Difference),
                "union" => compute_set_op(&primary, secondary_operand(ctx), SetOp::Union),
                _ => Ok(primary),
            };
        }

        if let Some(offset) = date_offset_pattern(&result.base).or_else(|| {
            result.specifiers.first().and_then(|s| date_offset_pattern(s))
        }) {
            return apply_date_offset(&primary, offset);
        }

        Ok(primary)
    }
}

fn primary_operand(ctx: &ExecutionContext, object: &ObjectDescriptor) -> Result<TypedValue> {
    if let Some(literal) = &object.literal_value {
        return Ok(literal.clone());
    }
    ctx.resolve("_expression_")
        .or_else(|| ctx.resolve("_from_"))
        .or_else(|| ctx.resolve("_literal_"))
        .or_else(|| ctx.resolve(&object.base))
        .cloned()
        .ok_or_else(|| ActionError::UndefinedVariable(object.base.clone()))
}

fn secondary_operand(ctx: &ExecutionContext) -> Option<TypedValue> {
    ctx.resolve("_with_")
        .or_else(|| ctx.resolve("_to_"))
        .or_else(|| ctx.resolve("_literal_"))
        .cloned()
}

fn compute_hash(value: &TypedValue) -> TypedValue {
    let mut hasher = Sha256::new();
    hasher.update(value.display_string().as_bytes());
    TypedValue::String(hex::encode(hasher.finalize()))
}

/// Element count for strings/lists/maps; the input unchanged for scalars
/// (documented identity, spec.md §8 Boundary behaviors).
fn compute_length(value: &TypedValue) -> TypedValue {
    match value {
        TypedValue::String(s) => TypedValue::Integer(s.chars().count() as i64),
        TypedValue::List(items) => TypedValue::Integer(items.len() as i64),
        TypedValue::Map(m) => TypedValue::Integer(m.len() as i64),
        other => other.clone(),
    }
}

fn string_case(value: &TypedValue, upper: bool) -> Result<TypedValue> {
    let s = value.to_plain_string().ok_or_else(|| ActionError::TypeMismatch {
        expected: "String".to_string(),
        actual: value.type_name().to_string(),
        variable: None,
    })?;
    Ok(TypedValue::String(if upper { s.to_uppercase() } else { s.to_lowercase() }))
}

fn parse_date(value: &TypedValue) -> Result<TypedValue> {
    let s = value.to_plain_string().ok_or_else(|| ActionError::TypeMismatch {
        expected: "String".to_string(),
        actual: value.type_name().to_string(),
        variable: None,
    })?;
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|d| TypedValue::Date(d.with_timezone(&chrono::Utc)))
        .map_err(|_| ActionError::TypeMismatch {
            expected: "ISO-8601 date".to_string(),
            actual: s,
            variable: None,
        })
}

fn format_value(value: &TypedValue, ctx: &ExecutionContext) -> TypedValue {
    let pattern = ctx
        .resolve("_with_")
        .and_then(|v| v.to_plain_string())
        .unwrap_or_else(|| "%Y-%m-%d".to_string());
    match value {
        TypedValue::Date(d) => TypedValue::String(d.format(&pattern).to_string()),
        other => TypedValue::String(other.display_string()),
    }
}

enum SetOp {
    Intersect,
    Difference,
    Union,
}

/// Multiset laws per spec.md §8: intersect keeps `min(count_A, count_B)`
/// occurrences; difference preserves A's order; union dedups by deep key,
/// A winning on conflicts.
fn compute_set_op(primary: &TypedValue, secondary: Option<TypedValue>, op: SetOp) -> Result<TypedValue> {
    let a = as_list(primary)?;
    let b = secondary.as_ref().map(as_list).transpose()?.unwrap_or_default();

    match op {
        SetOp::Intersect => {
            let mut remaining_b = counts(&b);
            let mut out = Vec::new();
            for item in &a {
                let key = item.to_canonical_json();
                if let Some(count) = remaining_b.get_mut(&key) {
                    if *count > 0 {
                        out.push(item.clone());
                        *count -= 1;
                    }
                }
            }
            Ok(TypedValue::List(out))
        }
        SetOp::Difference => {
            let mut remaining_b = counts(&b);
            let mut out = Vec::new();
            for item in &a {
                let key = item.to_canonical_json();
                let count = remaining_b.entry(key).or_insert(0);
                if *count > 0 {
                    *count -= 1;
                } else {
                    out.push(item.clone());
                }
            }
            Ok(TypedValue::List(out))
        }
        SetOp::Union => {
            let mut seen: HashMap<String, ()> = HashMap::new();
            let mut out = Vec::new();
            for item in a.iter().chain(b.iter()) {
                let key = item.to_canonical_json();
                if seen.insert(key, ()).is_none() {
                    out.push(item.clone());
                }
            }
            Ok(TypedValue::List(out))
        }
    }
}

fn as_list(value: &TypedValue) -> Result<Vec<TypedValue>> {
    match value {
        TypedValue::List(items) => Ok(items.clone()),
        other => Err(ActionError::TypeMismatch {
            expected: "List".to_string(),
            actual: other.type_name().to_string(),
            variable: None,
        }),
    }
}

fn counts(items: &[TypedValue]) -> HashMap<String, i64> {
    let mut map = HashMap::new();
    for item in items {
        *map.entry(item.to_canonical_json()).or_insert(0) += 1;
    }
    map
}

fn compute_distance(primary: &TypedValue, secondary: Option<TypedValue>) -> Result<TypedValue> {
    let (lat1, lng1) = latlng(primary)?;
    let secondary = secondary.ok_or_else(|| ActionError::MissingRequiredField("with".to_string()))?;
    let (lat2, lng2) = latlng(&secondary)?;

    let (lat1, lng1, lat2, lng2) = (
        lat1.to_radians(),
        lng1.to_radians(),
        lat2.to_radians(),
        lng2.to_radians(),
    );
    let d_lat = lat2 - lat1;
    let d_lng = lng2 - lng1;
    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    const EARTH_RADIUS_KM: f64 = 6371.0;
    Ok(TypedValue::Distance(crate::value::Distance {
        value: EARTH_RADIUS_KM * c,
        unit: crate::value::DistanceUnit::Kilometers,
    }))
}

fn latlng(value: &TypedValue) -> Result<(f64, f64)> {
    match value {
        TypedValue::Map(m) => {
            let lat = m.get("lat").and_then(|v| v.to_f64());
            let lng = m.get("lng").and_then(|v| v.to_f64());
            match (lat, lng) {
                (Some(lat), Some(lng)) => Ok((lat, lng)),
                _ => Err(ActionError::MissingRequiredField("lat/lng".to_string())),
            }
        }
        other => Err(ActionError::TypeMismatch {
            expected: "Map{lat,lng}".to_string(),
            actual: other.type_name().to_string(),
            variable: None,
        }),
    }
}

#[derive(Debug, Clone, Copy)]
struct DateOffset {
    amount: i64,
    unit: char,
}

fn date_offset_pattern(candidate: &str) -> Option<DateOffset> {
    let re = Regex::new(r"^([+-]\d+)([dhmsyM])$").ok()?;
    let caps = re.captures(candidate)?;
    Some(DateOffset {
        amount: caps[1].parse().ok()?,
        unit: caps[2].chars().next()?,
    })
}

fn apply_date_offset(primary: &TypedValue, offset: DateOffset) -> Result<TypedValue> {
    let date = match primary {
        TypedValue::Date(d) => *d,
        _ => chrono::Utc::now(),
    };
    let duration = match offset.unit {
        'd' => chrono::Duration::days(offset.amount),
        'h' => chrono::Duration::hours(offset.amount),
        'm' => chrono::Duration::minutes(offset.amount),
        's' => chrono::Duration::seconds(offset.amount),
        'y' => chrono::Duration::days(offset.amount * 365),
        'M' => chrono::Duration::days(offset.amount * 30),
        _ => chrono::Duration::zero(),
    };
    Ok(TypedValue::Date(date + duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::ObjectDescriptor as OD;

    fn ctx_with(bindings: Vec<(&str, TypedValue)>) -> ExecutionContext {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        for (k, v) in bindings {
            ctx.bind(k, v, false).unwrap();
        }
        ctx
    }

    #[tokio::test]
    async fn intersect_obeys_multiset_laws() {
        let mut ctx = ctx_with(vec![(
            "_with_",
            TypedValue::List(vec![
                TypedValue::Integer(2),
                TypedValue::Integer(2),
                TypedValue::Integer(4),
            ]),
        )]);
        let object = OD::new("xs", Preposition::From).with_specifiers(Vec::<String>::new());
        let mut object = object;
        object.literal_value = Some(TypedValue::List(vec![
            TypedValue::Integer(1),
            TypedValue::Integer(2),
            TypedValue::Integer(2),
            TypedValue::Integer(3),
        ]));
        let result = ResultDescriptor::new("i").with_specifiers(vec!["intersect"]);
        let value = Compute.execute(&result, &object, &mut ctx).await.unwrap();
        assert_eq!(
            value,
            TypedValue::List(vec![TypedValue::Integer(2), TypedValue::Integer(2)])
        );
    }

    #[tokio::test]
    async fn union_dedups_a_wins_on_conflict() {
        let mut ctx = ctx_with(vec![("_with_", TypedValue::List(vec![TypedValue::Integer(2), TypedValue::Integer(3)]))]);
        let mut object = OD::new("xs", Preposition::From);
        object.literal_value = Some(TypedValue::List(vec![TypedValue::Integer(1), TypedValue::Integer(2)]));
        let result = ResultDescriptor::new("u").with_specifiers(vec!["union"]);
        let value = Compute.execute(&result, &object, &mut ctx).await.unwrap();
        assert_eq!(
            value,
            TypedValue::List(vec![TypedValue::Integer(1), TypedValue::Integer(2), TypedValue::Integer(3)])
        );
    }

    #[tokio::test]
    async fn length_on_scalar_is_identity() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        let mut object = OD::new("n", Preposition::From);
        object.literal_value = Some(TypedValue::Integer(5));
        let result = ResultDescriptor::new("n").with_specifiers(vec!["length"]);
        let value = Compute.execute(&result, &object, &mut ctx).await.unwrap();
        assert_eq!(value, TypedValue::Integer(5));
    }

    #[test]
    fn date_offset_pattern_parses_signed_unit_suffix() {
        let offset = date_offset_pattern("+3d").unwrap();
        assert_eq!(offset.amount, 3);
        assert_eq!(offset.unit, 'd');
    }
}
