//! Error types for the tooldeck engine.

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for plugin operations.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Version selection failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Versions(#[from] tooldeck_versions::Error),

    /// The archive was expected on disk but is not there.
    #[error("Archive not found at {}", path.display())]
    #[diagnostic(code(tooldeck::install::archive_missing))]
    ArchiveMissing {
        /// Expected archive location.
        path: PathBuf,
    },

    /// The extracted source directory could not be found.
    #[error("Extracted source directory not found at {}", path.display())]
    #[diagnostic(
        code(tooldeck::install::extracted_dir_missing),
        help("Enable auto-detection of the extracted directory if the archive layout varies")
    )]
    ExtractedDirMissing {
        /// Expected directory location.
        path: PathBuf,
    },

    /// An expected artifact is missing after the build.
    #[error("Expected artifact missing after install: {}", path.display())]
    #[diagnostic(code(tooldeck::install::artifact_missing))]
    ArtifactMissing {
        /// Absolute path of the missing artifact.
        path: PathBuf,
    },

    /// A source-build plugin was configured without a build step.
    #[error("Plugin '{plugin}' has no build step configured")]
    #[diagnostic(code(tooldeck::config::no_build_step))]
    NoBuildStepConfigured {
        /// Plugin name.
        plugin: String,
    },

    /// The archive type tag has no registered extractor.
    #[error("Unsupported archive type '{tag}'")]
    #[diagnostic(
        code(tooldeck::archive::unsupported),
        help("Supported archive types: tar.gz, tar.xz, zip")
    )]
    UnsupportedArchiveType {
        /// The tag as configured.
        tag: String,
    },

    /// Downloading a file failed.
    #[error("Failed to download {url}: {source}")]
    #[diagnostic(code(tooldeck::download::failed))]
    Download {
        /// The URL being fetched.
        url: String,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    #[diagnostic(code(tooldeck::http::status))]
    Http {
        /// The requested URL.
        url: String,
        /// The response status code.
        status: u16,
    },

    /// The request could not be completed at the transport level.
    #[error("Request to {url} failed: {message}")]
    #[diagnostic(code(tooldeck::http::transport))]
    Transport {
        /// The requested URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("Malformed response from {url}: {message}")]
    #[diagnostic(code(tooldeck::http::malformed))]
    MalformedResponse {
        /// The requested URL.
        url: String,
        /// Decoding error message.
        message: String,
    },

    /// A downloaded file does not match its published checksum.
    #[error("Checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    #[diagnostic(code(tooldeck::download::checksum))]
    ChecksumMismatch {
        /// The verified file.
        path: PathBuf,
        /// The published digest.
        expected: String,
        /// The computed digest.
        actual: String,
    },

    /// An archive could not be unpacked.
    #[error("Failed to extract {}: {message}", archive.display())]
    #[diagnostic(code(tooldeck::archive::extract))]
    Extraction {
        /// The archive being unpacked.
        archive: PathBuf,
        /// Error message.
        message: String,
    },

    /// A pipeline step failed.
    #[error("{stage} step failed: {source}")]
    #[diagnostic(code(tooldeck::install::step))]
    Step {
        /// Which step (pre-build, build, post-install).
        stage: &'static str,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// An external command exited unsuccessfully.
    #[error("Command `{command}` failed ({status}): {stderr}")]
    #[diagnostic(code(tooldeck::process::failed))]
    Command {
        /// The command line.
        command: String,
        /// Exit status description.
        status: String,
        /// Tail of the captured standard error.
        stderr: String,
    },

    /// Invalid plugin or engine configuration.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(tooldeck::config::invalid))]
    Configuration {
        /// What is wrong.
        message: String,
    },

    /// I/O error with path context.
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(tooldeck::io::error))]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// The path involved, if any.
        path: Option<Box<Path>>,
        /// Description of the operation that failed.
        operation: String,
    },

    /// The caller cancelled the operation.
    #[error("Cancelled during {operation}")]
    #[diagnostic(code(tooldeck::cancelled))]
    Cancelled {
        /// What was in progress.
        operation: String,
    },
}

impl Error {
    /// Create an I/O error with context.
    pub fn io(
        source: std::io::Error,
        path: Option<PathBuf>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: path.map(PathBuf::into_boxed_path),
            operation: operation.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a cancellation error.
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a malformed response error.
    pub fn malformed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an extraction error.
    pub fn extraction(archive: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Extraction {
            archive: archive.into(),
            message: message.into(),
        }
    }

    /// Attach the URL being downloaded.
    #[must_use]
    pub fn download(url: impl Into<String>, source: Self) -> Self {
        Self::Download {
            url: url.into(),
            source: Box::new(source),
        }
    }

    /// Attach the pipeline step that failed.
    #[must_use]
    pub fn step(stage: &'static str, source: Self) -> Self {
        Self::Step {
            stage,
            source: Box::new(source),
        }
    }

    /// Returns true if this error, or any error it wraps, is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::Download { source, .. } | Self::Step { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Result type for tooldeck operations.
pub type Result<T> = std::result::Result<T, Error>;
