//! Prerelease detection.
//!
//! Classification is a heuristic over marker substrings, not a version parser.
//! A tool whose stable names happen to contain a marker (a package literally
//! called "beta-tools") will be misclassified; plugins that care narrow the
//! marker set or add their own rules.

/// Markers checked by [`Classifier::default`].
pub const DEFAULT_MARKERS: &[&str] = &["alpha", "beta", "rc", "dev"];

/// Extra classification rule applied after the marker check.
pub type Rule = fn(&str) -> bool;

/// Decides whether a version string denotes a prerelease.
#[derive(Debug, Clone)]
pub struct Classifier {
    markers: Vec<String>,
    ignore_case: bool,
    rules: Vec<Rule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_MARKERS.iter().copied())
    }
}

impl Classifier {
    /// Create a case-sensitive classifier over `markers`.
    #[must_use]
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
            ignore_case: false,
            rules: Vec::new(),
        }
    }

    /// Match markers regardless of ASCII case.
    #[must_use]
    pub fn ignore_case(mut self, ignore: bool) -> Self {
        self.ignore_case = ignore;
        if ignore {
            for marker in &mut self.markers {
                marker.make_ascii_lowercase();
            }
        }
        self
    }

    /// Add a rule that marks a version as prerelease when it returns true.
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// The configured markers.
    #[must_use]
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Returns true if `version` contains any marker or matches any rule.
    #[must_use]
    pub fn is_prerelease(&self, version: &str) -> bool {
        let haystack = if self.ignore_case {
            version.to_ascii_lowercase()
        } else {
            version.to_string()
        };

        self.markers
            .iter()
            .any(|marker| !marker.is_empty() && haystack.contains(marker.as_str()))
            || self.rules.iter().any(|rule| rule(&haystack))
    }

    /// Returns true if `version` is not a prerelease.
    #[must_use]
    pub fn is_stable(&self, version: &str) -> bool {
        !self.is_prerelease(version)
    }
}

/// Digit, then `a` or `b`, then digit: CPython's `3.13.0a1` / `3.12.0b2` form.
#[must_use]
pub fn short_letter_marker(version: &str) -> bool {
    version.as_bytes().windows(3).any(|w| {
        w[0].is_ascii_digit() && matches!(w[1], b'a' | b'b' | b'A' | b'B') && w[2].is_ascii_digit()
    })
}

/// A trailing `-YYYYMMDD` (optionally followed by a time) build-date suffix.
#[must_use]
pub fn date_suffix(version: &str) -> bool {
    let Some((_, tail)) = version.rsplit_once(['-', '+']) else {
        return false;
    };
    (8..=14).contains(&tail.len())
        && tail.bytes().all(|b| b.is_ascii_digit())
        && (tail.starts_with("19") || tail.starts_with("20"))
}
