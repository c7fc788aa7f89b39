//! Test doubles shared by the tooldeck crates.

pub mod archives;
pub mod fakes;
pub mod github;

pub use archives::FixtureFile;
pub use fakes::{RecordingRunner, StaticDownloader, WriteFilesStep};
pub use github::MockGitHub;
