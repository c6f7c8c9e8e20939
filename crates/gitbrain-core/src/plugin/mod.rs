//! Named interceptors that may rewrite message content on send and receive.

pub mod logging;
pub mod pipeline;
pub mod transform;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::Content;

pub use logging::LoggingPlugin;
pub use pipeline::PluginPipeline;
pub use transform::MessageTransformPlugin;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    #[error("Plugin already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Plugin not found: {0}")]
    NotFound(String),

    #[error("Plugin '{name}' failed to initialize: {reason}")]
    InitializationFailed { name: String, reason: String },

    #[error("Plugin '{name}' failed: {reason}")]
    ExecutionFailed { name: String, reason: String },
}

/// Lifecycle and interception hooks. Every hook has a no-op default.
///
/// The message hooks return `Ok(Some(content))` to replace the content, or
/// `Ok(None)` to pass it on untouched.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    async fn on_initialize(&self) -> Result<(), PluginError> {
        Ok(())
    }

    async fn on_message_sending(
        &self,
        _content: &Content,
        _to: &str,
    ) -> Result<Option<Content>, PluginError> {
        Ok(None)
    }

    async fn on_message_received(
        &self,
        _content: &Content,
        _from: &str,
    ) -> Result<Option<Content>, PluginError> {
        Ok(None)
    }

    async fn on_shutdown(&self) -> Result<(), PluginError> {
        Ok(())
    }
}
