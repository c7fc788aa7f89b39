//! Plugin registry.
//!
//! Plugins are registered once at startup and looked up by tool name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::plugin::Plugin;

/// Registry of tool plugins.
#[derive(Default)]
pub struct PluginRegistry {
    /// Plugins indexed by name.
    plugins: HashMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin, replacing any plugin with the same name.
    pub fn register<P: Plugin + 'static>(&mut self, plugin: P) {
        self.register_arc(Arc::new(plugin));
    }

    /// Register a shared plugin.
    pub fn register_arc(&mut self, plugin: Arc<dyn Plugin>) {
        let name = plugin.name().to_string();
        if self.plugins.insert(name.clone(), plugin).is_some() {
            tracing::debug!(plugin = %name, "Replaced registered plugin");
        }
    }

    /// Get a plugin by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.get(name)
    }

    /// Iterate over all registered plugins.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.plugins.values()
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugin is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Registered plugin names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{InstallOutcome, InstallRequest};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use tokio_util::sync::CancellationToken;

    struct MockPlugin {
        name: &'static str,
    }

    #[async_trait]
    impl Plugin for MockPlugin {
        fn name(&self) -> &str {
            self.name
        }

        async fn list_all(&self, _cancel: &CancellationToken) -> crate::Result<Vec<String>> {
            Ok(vec![])
        }

        async fn latest_stable(
            &self,
            _query: &str,
            _cancel: &CancellationToken,
        ) -> crate::Result<String> {
            unimplemented!()
        }

        async fn download(
            &self,
            _version: &str,
            _download_dir: &Path,
            _cancel: &CancellationToken,
        ) -> crate::Result<PathBuf> {
            unimplemented!()
        }

        async fn install(
            &self,
            _request: &InstallRequest,
            _cancel: &CancellationToken,
        ) -> crate::Result<InstallOutcome> {
            unimplemented!()
        }

        fn list_bin_paths(&self) -> Vec<String> {
            vec!["bin".into()]
        }

        fn exec_env(&self, _install_dir: &Path) -> BTreeMap<String, String> {
            BTreeMap::new()
        }

        fn list_legacy_filenames(&self) -> Vec<String> {
            vec![]
        }

        async fn parse_legacy_file(&self, _path: &Path) -> crate::Result<String> {
            unimplemented!()
        }

        async fn uninstall(
            &self,
            _install_dir: &Path,
            _cancel: &CancellationToken,
        ) -> crate::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut registry = PluginRegistry::new();
        registry.register(MockPlugin { name: "buf" });

        assert!(registry.get("buf").is_some());
        assert!(registry.get("node").is_none());
    }

    #[test]
    fn test_registry_names_sorted() {
        let mut registry = PluginRegistry::new();
        registry.register(MockPlugin { name: "python" });
        registry.register(MockPlugin { name: "buf" });
        registry.register(MockPlugin { name: "node" });

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.names(), vec!["buf", "node", "python"]);
        assert_eq!(registry.iter().count(), 3);
    }

    #[test]
    fn test_registry_replaces_same_name() {
        let mut registry = PluginRegistry::new();
        registry.register(MockPlugin { name: "buf" });
        registry.register(MockPlugin { name: "buf" });
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
    }
}
