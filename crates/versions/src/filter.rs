//! Pure list operations over version strings.

use crate::compare::compare;

/// Keep the versions matching `predicate`, preserving their relative order.
#[must_use]
pub fn filter<S, P>(versions: &[S], mut predicate: P) -> Vec<String>
where
    S: AsRef<str>,
    P: FnMut(&str) -> bool,
{
    versions
        .iter()
        .map(AsRef::as_ref)
        .filter(|v| predicate(v))
        .map(String::from)
        .collect()
}

/// Return a new ascending copy of `versions`.
///
/// The sort is stable, so entries that compare equal keep their input order.
#[must_use]
pub fn sort<S: AsRef<str>>(versions: &[S]) -> Vec<String> {
    let mut sorted: Vec<String> = versions.iter().map(|v| v.as_ref().to_string()).collect();
    sorted.sort_by(|a, b| compare(a, b));
    sorted
}

/// Remove adjacent duplicates from an already sorted list.
#[must_use]
pub fn dedup_sorted(mut versions: Vec<String>) -> Vec<String> {
    versions.dedup();
    versions
}

/// The greatest version under [`compare`], if any.
#[must_use]
pub fn max<S: AsRef<str>>(versions: &[S]) -> Option<&str> {
    versions
        .iter()
        .map(AsRef::as_ref)
        .max_by(|a, b| compare(a, b))
}
