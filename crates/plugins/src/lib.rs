//! Bundled tooldeck plugins and the engine that runs them.
//!
//! Every bundled tool is a [`ConfiguredPlugin`]: a static
//! [`tooldeck_core::PluginConfig`], a [`tooldeck_core::VersionSource`] from
//! [`sources`], and the shared install pipeline. Adding a tool means writing
//! a configuration, not a new plugin type.
//!
//! | plugin | versions | install |
//! |---|---|---|
//! | [`buf`] | GitHub releases | pre-built tarball |
//! | [`python`] | python.org directory index | `configure` / `make` from source |
//! | [`node`] | `index.json` with LTS channels | pre-built archive, SHA-256 checked |

pub mod buf;
mod bundled;
pub mod engine;
pub mod node;
pub mod python;
pub mod services;
pub mod sources;

pub use bundled::default_registry;
pub use engine::ConfiguredPlugin;
pub use services::Services;
