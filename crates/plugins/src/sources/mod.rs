//! Version listing sources.
//!
//! Each source answers "which versions exist" for one kind of upstream and
//! leaves prefix stripping, de-duplication and ordering to the plugin engine.

mod github;
mod html;
mod node_index;

pub use github::GitHubSource;
pub use html::HtmlIndexSource;
pub use node_index::NodeIndexSource;
