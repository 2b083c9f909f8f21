//! Shared `resolveOperationName` helper: explicit specifier first, then
//! base-as-known-op, then fallback (spec.md §9 open question 4, pinned).
//! Used uniformly by `Compute`, `Validate`, `Transform`, `Sort`.

use crate::descriptors::ResultDescriptor;

pub fn resolve(result: &ResultDescriptor, known_ops: &[&str], fallback: Option<&str>) -> Option<String> {
    if let Some(specifier) = result
        .specifiers
        .iter()
        .find(|s| known_ops.iter().any(|op| op.eq_ignore_ascii_case(s)))
    {
        return Some(specifier.to_ascii_lowercase());
    }
    if known_ops.iter().any(|op| op.eq_ignore_ascii_case(&result.base)) {
        return Some(result.base.to_ascii_lowercase());
    }
    fallback.map(str::to_string)
}
