//! The shared "latest stable" resolution algorithm.

use tracing::{debug, trace};

use crate::filter::{filter, max};
use crate::prerelease::Classifier;
use crate::{Error, Result};

/// Per-plugin knobs for [`select_latest`].
#[derive(Debug, Clone)]
pub struct SelectPolicy {
    /// Prerelease detection used to prefer stable versions.
    pub classifier: Classifier,
    /// Fail with [`Error::NoVersionsMatching`] when a query matches nothing,
    /// instead of falling back to the full list.
    pub fail_on_empty_filter: bool,
}

impl Default for SelectPolicy {
    fn default() -> Self {
        Self::new(Classifier::default())
    }
}

impl SelectPolicy {
    /// A policy that fails on an unmatched query.
    #[must_use]
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier,
            fail_on_empty_filter: true,
        }
    }

    /// Set whether an unmatched query is an error.
    #[must_use]
    pub fn fail_on_empty_filter(mut self, fail: bool) -> Self {
        self.fail_on_empty_filter = fail;
        self
    }
}

/// Keep versions that start with `query`.
#[must_use]
pub fn filter_prefix<S: AsRef<str>>(versions: &[S], query: &str) -> Vec<String> {
    filter(versions, |v| v.starts_with(query))
}

/// Pick the version to install from an unsorted listing.
///
/// 1. An empty listing fails with [`Error::NoVersionsFound`].
/// 2. A non-empty `query` narrows the listing to versions with that prefix.
///    When nothing matches, the policy decides between failing and using the
///    whole listing.
/// 3. Prereleases are dropped if any stable version remains.
/// 4. The greatest remaining version wins.
///
/// # Errors
///
/// See steps 1 and 2.
pub fn select_latest<S: AsRef<str>>(
    versions: &[S],
    query: Option<&str>,
    policy: &SelectPolicy,
) -> Result<String> {
    if versions.is_empty() {
        return Err(Error::NoVersionsFound);
    }

    let all: Vec<String> = versions.iter().map(|v| v.as_ref().to_string()).collect();
    let candidates = match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => {
            let matched = filter_prefix(&all, q);
            if !matched.is_empty() {
                matched
            } else if policy.fail_on_empty_filter {
                return Err(Error::no_versions_matching(q));
            } else {
                debug!(query = q, "No versions match query, falling back to all versions");
                all
            }
        }
        None => all,
    };

    let stable = filter(&candidates, |v| policy.classifier.is_stable(v));
    trace!(
        candidates = candidates.len(),
        stable = stable.len(),
        "Selecting latest version"
    );

    let pool = if stable.is_empty() { &candidates } else { &stable };
    max(pool)
        .map(String::from)
        .ok_or(Error::NoVersionsFound)
}
