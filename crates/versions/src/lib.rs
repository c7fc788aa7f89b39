//! Version resolution and ordering for tooldeck plugins.
//!
//! Every plugin answers the same two questions about its tool: "which
//! versions exist?" (answered by a listing source outside this crate) and
//! "which one should be installed?" (answered here). This crate provides:
//!
//! - [`compare`] - numeric-aware, segment-wise comparison of version strings
//! - [`filter`] and [`sort`] - pure, order-preserving list operations
//! - [`Classifier`] - prerelease detection over a configurable marker set
//! - [`select_latest`] - the shared "latest stable" resolution algorithm
//! - [`resolve_channel`] - symbolic channel (LTS codename) resolution
//!
//! # Example
//!
//! ```
//! use tooldeck_versions::{Classifier, SelectPolicy, select_latest};
//!
//! let versions = vec!["1.0.0".to_string(), "1.1.0".to_string(), "2.0.0-rc1".to_string()];
//! let policy = SelectPolicy::new(Classifier::default());
//!
//! assert_eq!(select_latest(&versions, None, &policy).unwrap(), "1.1.0");
//! assert_eq!(select_latest(&versions, Some("1.0"), &policy).unwrap(), "1.0.0");
//! ```

mod channel;
mod compare;
mod error;
mod filter;
mod prerelease;
mod select;

pub use channel::{ChannelAliases, ChannelEntry, ChannelLabel, ChannelQuery, resolve_channel};
pub use compare::{Segment, compare, segments};
pub use error::{Error, Result};
pub use filter::{dedup_sorted, filter, max, sort};
pub use prerelease::{Classifier, DEFAULT_MARKERS, Rule, date_suffix, short_letter_marker};
pub use select::{SelectPolicy, filter_prefix, select_latest};
