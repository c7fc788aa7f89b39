//! Core types for the tooldeck plugin engine.
//!
//! A plugin is a small static description of one tool ([`PluginConfig`])
//! plus a handful of collaborators injected at construction ([`ports`]).
//! This crate defines those pieces, the [`Plugin`] interface every tool
//! exposes, and the ambient settings and tracing setup shared by the
//! engine crates.

pub mod config;
pub mod error;
pub mod platform;
pub mod plugin;
pub mod ports;
pub mod registry;
pub mod settings;
pub mod telemetry;
pub mod template;

pub use config::{Hooks, PluginConfig, PluginConfigBuilder, VersionListing};
pub use error::{Error, Result};
pub use platform::{Arch, Os, Platform};
pub use plugin::{InstallOutcome, InstallRequest, Plugin, VersionSource};
pub use ports::{
    ArchiveKind, BuildContext, BuildHook, CommandOutput, CommandRunner, CommandSpec, Downloader,
    Extractor, PostInstallContext, PostInstallHook, PreBuildContext, PreBuildHook, SourceResolver,
};
pub use registry::PluginRegistry;
pub use settings::Settings;

pub use tokio_util::sync::CancellationToken;
