//! The plugins shipped with tooldeck.

use tooldeck_core::{PluginRegistry, Result};
use tracing::debug;

use crate::services::Services;
use crate::{buf, node, python};

/// A registry holding every bundled plugin, reading from the public
/// upstreams.
///
/// # Errors
///
/// Fails if a plugin cannot be configured for the services' platform.
pub fn default_registry(services: &Services) -> Result<PluginRegistry> {
    let mut registry = PluginRegistry::new();
    registry.register(buf::plugin(services)?);
    registry.register(python::plugin(services, python::DEFAULT_INDEX_URL)?);
    registry.register(node::plugin(services, node::DEFAULT_DIST_URL)?);
    debug!(plugins = ?registry.names(), platform = %services.platform, "Registered bundled plugins");
    Ok(registry)
}
