//! GitHub and HTTP collaborators for tooldeck plugins.
//!
//! - [`GitHubClient`] lists tags and releases, paginated, with optional token
//!   authentication.
//! - [`HttpDownloader`] is the default [`tooldeck_core::Downloader`].
//! - [`checksum`] verifies downloads against published SHA-256 lists.

pub mod checksum;
pub mod client;
pub mod download;
pub mod http;

pub use client::{GitHubClient, PER_PAGE, Release};
pub use download::HttpDownloader;
