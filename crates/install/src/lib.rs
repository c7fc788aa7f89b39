//! Install pipeline for tooldeck plugins.
//!
//! Turns a [`tooldeck_core::PluginConfig`] and a version into an installed
//! tool: download, extract, run the build hooks, verify the artifacts. The
//! default collaborators live here too: archive extractors for tar.gz, tar.xz
//! and zip, a tokio-based command runner, and the reusable [`CopyTree`] and
//! [`RunCommands`] build steps.

pub mod archive;
pub mod pipeline;
pub mod process;
pub mod steps;

pub use archive::{ArchiveDispatcher, TarGzExtractor, TarXzExtractor, ZipExtractor};
pub use pipeline::{Pipeline, SOURCE_SUBDIR};
pub use process::TokioCommandRunner;
pub use steps::{CopyTree, RunCommands};
