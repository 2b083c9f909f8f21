//! Shared where-clause / filter-predicate evaluation, used by repository
//! storage queries (spec.md §4.F) and the `Filter` action (spec.md §4.D).

use regex::Regex;

use crate::value::TypedValue;

/// Evaluates `lhs <op> rhs` per spec.md §4.D Filter's op table. Numeric ops
/// attempt `asDouble` on both sides first; string fallback otherwise.
pub fn evaluate(lhs: &TypedValue, op: &str, rhs: &TypedValue) -> bool {
    match op {
        "is" | "==" | "equals" => equals(lhs, rhs),
        "is-not" | "!=" => !equals(lhs, rhs),
        ">" | ">=" | "<" | "<=" => compare_ordering(lhs, op, rhs),
        "contains" => contains(lhs, rhs),
        "starts-with" => string_op(lhs, rhs, |l, r| l.starts_with(r)),
        "ends-with" => string_op(lhs, rhs, |l, r| l.ends_with(r)),
        "matches" => matches_regex(lhs, rhs),
        "in" => membership(lhs, rhs, true),
        "not-in" => membership(lhs, rhs, false),
        _ => equals(lhs, rhs),
    }
}

fn equals(lhs: &TypedValue, rhs: &TypedValue) -> bool {
    if let (Some(a), Some(b)) = (lhs.to_f64(), rhs.to_f64()) {
        return a == b;
    }
    lhs == rhs
}

fn compare_ordering(lhs: &TypedValue, op: &str, rhs: &TypedValue) -> bool {
    let ordering = if let (Some(a), Some(b)) = (lhs.to_f64(), rhs.to_f64()) {
        a.partial_cmp(&b)
    } else {
        let a = lhs.to_plain_string();
        let b = rhs.to_plain_string();
        match (a, b) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        }
    };
    match (ordering, op) {
        (Some(std::cmp::Ordering::Greater), ">") => true,
        (Some(std::cmp::Ordering::Greater), ">=") => true,
        (Some(std::cmp::Ordering::Equal), ">=") => true,
        (Some(std::cmp::Ordering::Equal), "<=") => true,
        (Some(std::cmp::Ordering::Less), "<") => true,
        (Some(std::cmp::Ordering::Less), "<=") => true,
        _ => false,
    }
}

fn contains(lhs: &TypedValue, rhs: &TypedValue) -> bool {
    match lhs {
        TypedValue::List(items) => items.iter().any(|item| equals(item, rhs)),
        TypedValue::String(_) => string_op(lhs, rhs, |l, r| l.contains(r)),
        _ => false,
    }
}

fn string_op(lhs: &TypedValue, rhs: &TypedValue, f: impl Fn(&str, &str) -> bool) -> bool {
    match (lhs.to_plain_string(), rhs.to_plain_string()) {
        (Some(l), Some(r)) => f(&l, &r),
        _ => false,
    }
}

fn matches_regex(lhs: &TypedValue, rhs: &TypedValue) -> bool {
    let (Some(l), Some(pattern)) = (lhs.to_plain_string(), rhs.to_plain_string()) else {
        return false;
    };
    Regex::new(&pattern).map(|re| re.is_match(&l)).unwrap_or(false)
}

/// `in`/`not-in` accept either an array value or a comma-separated string
/// (spec.md §4.D Filter).
fn membership(lhs: &TypedValue, rhs: &TypedValue, want_member: bool) -> bool {
    let is_member = match rhs {
        TypedValue::List(items) => items.iter().any(|item| equals(lhs, item)),
        TypedValue::String(s) => {
            let needle = lhs.to_plain_string().unwrap_or_default();
            s.split(',').map(str::trim).any(|part| part == needle)
        }
        _ => false,
    };
    is_member == want_member
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_comparison_coerces_both_sides() {
        assert!(evaluate(&TypedValue::Integer(30), ">", &TypedValue::Integer(20)));
        assert!(!evaluate(&TypedValue::Integer(10), ">", &TypedValue::Integer(20)));
    }

    #[test]
    fn in_accepts_comma_separated_string() {
        assert!(evaluate(
            &TypedValue::String("b".into()),
            "in",
            &TypedValue::String("a, b, c".into())
        ));
    }

    #[test]
    fn equality_is_the_default_repository_where_op() {
        assert!(evaluate(
            &TypedValue::String("m1".into()),
            "is",
            &TypedValue::String("m1".into())
        ));
    }
}
