//! Error types for version resolution.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for version resolution.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while selecting a version from a listing.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum Error {
    /// The listing collaborator returned no versions at all.
    #[error("No versions found")]
    #[diagnostic(code(tooldeck_versions::no_versions))]
    NoVersionsFound,

    /// A prefix query matched nothing and the plugin does not fall back.
    #[error("No versions matching '{query}'")]
    #[diagnostic(
        code(tooldeck_versions::no_match),
        help("Run list-all to see the versions available for this tool")
    )]
    NoVersionsMatching {
        /// The prefix that was queried.
        query: String,
    },

    /// No index entry carries the requested channel.
    #[error("Channel '{name}' not found")]
    #[diagnostic(code(tooldeck_versions::channel_not_found))]
    ChannelNotFound {
        /// The channel name as requested.
        name: String,
    },

    /// The index has no channel-labelled entries.
    #[error("No version with a release channel found")]
    #[diagnostic(code(tooldeck_versions::no_channel_version))]
    NoChannelVersionFound,
}

impl Error {
    /// Create a no-match error for a prefix query.
    #[must_use]
    pub fn no_versions_matching(query: impl Into<String>) -> Self {
        Self::NoVersionsMatching {
            query: query.into(),
        }
    }

    /// Create a channel-not-found error.
    #[must_use]
    pub fn channel_not_found(name: impl Into<String>) -> Self {
        Self::ChannelNotFound { name: name.into() }
    }
}
