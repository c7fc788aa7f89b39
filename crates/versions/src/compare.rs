//! Segment-wise version comparison.
//!
//! A version string is split into maximal runs of ASCII digits and runs of
//! everything else. Runs are compared pairwise from the left: two digit runs
//! compare as unbounded integers, any other pair compares as raw text. The
//! first differing pair decides. A version that runs out of segments first is
//! the smaller one, so `"1.2"` sorts before `"1.2.0"`.
//!
//! When every segment compares equal the raw strings decide, which keeps the
//! relation a total order (`"01"` and `"1"` are not equal).

use std::cmp::Ordering;

/// One maximal run inside a version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// A run of ASCII digits.
    Numeric(&'a str),
    /// A run of anything else.
    Text(&'a str),
}

impl<'a> Segment<'a> {
    fn as_str(self) -> &'a str {
        match self {
            Self::Numeric(s) | Self::Text(s) => s,
        }
    }
}

/// Split a version into alternating digit and non-digit runs.
#[must_use]
pub fn segments(version: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits: Option<bool> = None;

    for (idx, ch) in version.char_indices() {
        let is_digit = ch.is_ascii_digit();
        match in_digits {
            Some(current) if current == is_digit => {}
            Some(current) => {
                out.push(make_segment(&version[start..idx], current));
                start = idx;
                in_digits = Some(is_digit);
            }
            None => in_digits = Some(is_digit),
        }
    }

    if let Some(current) = in_digits {
        out.push(make_segment(&version[start..], current));
    }
    out
}

fn make_segment(run: &str, numeric: bool) -> Segment<'_> {
    if numeric {
        Segment::Numeric(run)
    } else {
        Segment::Text(run)
    }
}

/// Compare two digit runs as arbitrary-precision integers.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_segment(a: Segment<'_>, b: Segment<'_>) -> Ordering {
    match (a, b) {
        (Segment::Numeric(x), Segment::Numeric(y)) => compare_numeric(x, y),
        _ => a.as_str().cmp(b.as_str()),
    }
}

/// Compare two version strings.
///
/// ```
/// use std::cmp::Ordering;
/// use tooldeck_versions::compare;
///
/// assert_eq!(compare("1.10.0", "1.9.3"), Ordering::Greater);
/// assert_eq!(compare("1.2", "1.2.0"), Ordering::Less);
/// assert_eq!(compare("1.0.0-rc1", "1.0.0"), Ordering::Greater);
/// ```
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    let left = segments(a);
    let right = segments(b);

    for (x, y) in left.iter().zip(right.iter()) {
        let ord = compare_segment(*x, *y);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    left.len()
        .cmp(&right.len())
        .then_with(|| a.cmp(b))
}
