use std::sync::Arc;

use tokio::sync::Mutex;

use super::{Plugin, PluginError};
use crate::model::Content;

#[derive(Default)]
struct Registry {
    plugins: Vec<Arc<dyn Plugin>>,
    initialized: bool,
}

/// Plugins in registration order, behind one lock.
///
/// Processing runs the plugins one after another on a snapshot of the
/// registry, so a slow plugin never blocks registration.
#[derive(Default)]
pub struct PluginPipeline {
    registry: Mutex<Registry>,
}

impl PluginPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plugin under its unique name. If the pipeline is already
    /// initialized the plugin is initialized before it becomes visible.
    pub async fn register(&self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError> {
        let mut registry = self.registry.lock().await;
        let name = plugin.name().to_string();
        if registry.plugins.iter().any(|p| p.name() == name) {
            return Err(PluginError::AlreadyRegistered(name));
        }
        if registry.initialized {
            plugin.on_initialize().await.map_err(|e| init_failed(&name, e))?;
        }
        tracing::debug!("Registered plugin {name}");
        registry.plugins.push(plugin);
        Ok(())
    }

    /// Remove a plugin and run its shutdown hook.
    pub async fn unregister(&self, name: &str) -> Result<(), PluginError> {
        let plugin = {
            let mut registry = self.registry.lock().await;
            let idx = registry
                .plugins
                .iter()
                .position(|p| p.name() == name)
                .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
            registry.plugins.remove(idx)
        };
        plugin.on_shutdown().await
    }

    /// Initialize every plugin in order, stopping at the first failure.
    pub async fn initialize_all(&self) -> Result<(), PluginError> {
        let mut registry = self.registry.lock().await;
        for plugin in &registry.plugins {
            plugin
                .on_initialize()
                .await
                .map_err(|e| init_failed(plugin.name(), e))?;
        }
        registry.initialized = true;
        tracing::info!("Initialized {} plugin(s)", registry.plugins.len());
        Ok(())
    }

    /// Shut every plugin down and empty the registry. Returns the first
    /// shutdown failure after all plugins have been asked to stop.
    pub async fn shutdown_all(&self) -> Result<(), PluginError> {
        let plugins = {
            let mut registry = self.registry.lock().await;
            registry.initialized = false;
            std::mem::take(&mut registry.plugins)
        };
        let mut first_error = None;
        for plugin in plugins {
            if let Err(e) = plugin.on_shutdown().await {
                tracing::warn!("Plugin {} failed to shut down: {e}", plugin.name());
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Run the send hooks. The first plugin to return replacement content
    /// wins and the rest are skipped.
    pub async fn process_outgoing(&self, content: Content, to: &str) -> Content {
        for plugin in self.snapshot().await {
            match plugin.on_message_sending(&content, to).await {
                Ok(Some(replaced)) => return replaced,
                Ok(None) => {}
                Err(e) => tracing::warn!("Plugin {} failed on send: {e}", plugin.name()),
            }
        }
        content
    }

    /// Run the receive hooks, with the same first-replacement-wins rule.
    pub async fn process_incoming(&self, content: Content, from: &str) -> Content {
        for plugin in self.snapshot().await {
            match plugin.on_message_received(&content, from).await {
                Ok(Some(replaced)) => return replaced,
                Ok(None) => {}
                Err(e) => tracing::warn!("Plugin {} failed on receive: {e}", plugin.name()),
            }
        }
        content
    }

    /// Registered plugin names, sorted.
    pub async fn registered_plugins(&self) -> Vec<String> {
        let registry = self.registry.lock().await;
        let mut names: Vec<String> = registry.plugins.iter().map(|p| p.name().to_string()).collect();
        names.sort();
        names
    }

    pub async fn is_initialized(&self) -> bool {
        self.registry.lock().await.initialized
    }

    async fn snapshot(&self) -> Vec<Arc<dyn Plugin>> {
        self.registry.lock().await.plugins.clone()
    }
}

fn init_failed(name: &str, err: PluginError) -> PluginError {
    match err {
        PluginError::InitializationFailed { .. } => err,
        other => PluginError::InitializationFailed {
            name: name.to_string(),
            reason: other.to_string(),
        },
    }
}
