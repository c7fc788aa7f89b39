//! Named release channels.
//!
//! Some tools publish an index that tags releases with a symbolic channel
//! (Node.js marks LTS lines with a codename such as "Iron"). Channels are not
//! ordered lexically, so they are resolved against the index itself, which is
//! expected newest-first.

use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::{Error, Result};

/// The channel a release belongs to.
///
/// Indexes encode this as `false`, `true`, or a name. `true` means "on a
/// channel whose name the index does not give" and must not be confused with
/// `NoChannel`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChannelLabel {
    /// Not on any channel.
    #[default]
    NoChannel,
    /// On a channel, name unspecified.
    UnnamedChannel,
    /// On the named channel.
    NamedChannel(String),
}

impl ChannelLabel {
    /// Returns true for both named and unnamed channels.
    #[must_use]
    pub fn has_channel(&self) -> bool {
        match self {
            Self::NoChannel => false,
            Self::UnnamedChannel | Self::NamedChannel(_) => true,
        }
    }

    /// Case-insensitive match against a channel name.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        match self {
            Self::NamedChannel(label) => label.eq_ignore_ascii_case(name),
            Self::NoChannel | Self::UnnamedChannel => false,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLabel {
    Flag(bool),
    Name(String),
}

impl<'de> Deserialize<'de> for ChannelLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<RawLabel>::deserialize(deserializer)?;
        Ok(match raw {
            None | Some(RawLabel::Flag(false)) => Self::NoChannel,
            Some(RawLabel::Flag(true)) => Self::UnnamedChannel,
            Some(RawLabel::Name(name)) if name.is_empty() => Self::NoChannel,
            Some(RawLabel::Name(name)) => Self::NamedChannel(name),
        })
    }
}

/// One release in a channel index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEntry {
    /// The release version.
    pub version: String,
    /// The release's channel.
    pub channel: ChannelLabel,
}

impl ChannelEntry {
    /// Create an index entry.
    #[must_use]
    pub fn new(version: impl Into<String>, channel: ChannelLabel) -> Self {
        Self {
            version: version.into(),
            channel,
        }
    }
}

/// A parsed channel request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelQuery {
    /// Newest release on any channel.
    Any,
    /// Newest release on the named channel.
    Named(String),
}

/// The reserved query spellings that select a channel instead of a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelAliases {
    /// Bare alias, e.g. `lts`.
    pub bare: String,
    /// Qualified alias prefix, e.g. `lts/` in `lts/iron`.
    pub qualified_prefix: String,
}

impl ChannelAliases {
    /// Aliases `<bare>` and `<bare>/<name>`.
    #[must_use]
    pub fn new(bare: impl Into<String>) -> Self {
        let bare = bare.into();
        let qualified_prefix = format!("{bare}/");
        Self {
            bare,
            qualified_prefix,
        }
    }

    /// Interpret a query, returning `None` when it is an ordinary prefix query.
    #[must_use]
    pub fn parse(&self, query: &str) -> Option<ChannelQuery> {
        let query = query.trim();
        if query.eq_ignore_ascii_case(&self.bare) {
            return Some(ChannelQuery::Any);
        }
        let head = query.get(..self.qualified_prefix.len())?;
        if head.eq_ignore_ascii_case(&self.qualified_prefix) {
            let name = &query[self.qualified_prefix.len()..];
            return Some(ChannelQuery::Named(name.to_string()));
        }
        None
    }
}

/// Resolve a channel query against a newest-first index.
///
/// # Errors
///
/// Returns [`Error::NoChannelVersionFound`] when no entry carries a channel,
/// or [`Error::ChannelNotFound`] when entries have channels but none matches
/// the requested name.
pub fn resolve_channel(index: &[ChannelEntry], query: &ChannelQuery) -> Result<String> {
    if !index.iter().any(|e| e.channel.has_channel()) {
        return Err(Error::NoChannelVersionFound);
    }

    let found = match query {
        ChannelQuery::Any => index.iter().find(|e| e.channel.has_channel()),
        ChannelQuery::Named(name) => index.iter().find(|e| e.channel.matches_name(name)),
    };

    match (found, query) {
        (Some(entry), _) => {
            debug!(version = %entry.version, ?query, "Resolved release channel");
            Ok(entry.version.clone())
        }
        (None, ChannelQuery::Named(name)) => Err(Error::channel_not_found(name.clone())),
        (None, ChannelQuery::Any) => Err(Error::NoChannelVersionFound),
    }
}
