use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;

use super::{Plugin, PluginError};
use crate::model::Content;

pub const LOGGING_PLUGIN: &str = "logging";

/// Logs every message it sees and never rewrites content.
/// With a log file configured, each message also appends one line there.
#[derive(Debug, Clone, Default)]
pub struct LoggingPlugin {
    log_file: Option<PathBuf>,
}

impl LoggingPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_file(path: impl Into<PathBuf>) -> Self {
        Self {
            log_file: Some(path.into()),
        }
    }

    async fn append(&self, line: String) -> Result<(), PluginError> {
        let Some(path) = &self.log_file else {
            return Ok(());
        };
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| self.failed(e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.failed(e))
    }

    fn failed(&self, err: std::io::Error) -> PluginError {
        PluginError::ExecutionFailed {
            name: LOGGING_PLUGIN.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl Plugin for LoggingPlugin {
    fn name(&self) -> &str {
        LOGGING_PLUGIN
    }

    async fn on_initialize(&self) -> Result<(), PluginError> {
        if let Some(parent) = self.log_file.as_ref().and_then(|p| p.parent()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PluginError::InitializationFailed {
                    name: LOGGING_PLUGIN.to_string(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    async fn on_message_sending(
        &self,
        content: &Content,
        to: &str,
    ) -> Result<Option<Content>, PluginError> {
        let kind = content.message_type().unwrap_or("unknown");
        tracing::info!(to, kind, "Sending message");
        self.append(format!("[{}] SEND to={to} type={kind}\n", Utc::now().to_rfc3339()))
            .await?;
        Ok(None)
    }

    async fn on_message_received(
        &self,
        content: &Content,
        from: &str,
    ) -> Result<Option<Content>, PluginError> {
        let kind = content.message_type().unwrap_or("unknown");
        tracing::info!(from, kind, "Received message");
        self.append(format!("[{}] RECV from={from} type={kind}\n", Utc::now().to_rfc3339()))
            .await?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_appends_lines_without_rewriting() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logs/messages.log");
        let plugin = LoggingPlugin::with_log_file(&path);
        plugin.on_initialize().await.unwrap();

        let content = Content::new().with("type", "task");
        assert!(plugin
            .on_message_sending(&content, "coder")
            .await
            .unwrap()
            .is_none());
        assert!(plugin
            .on_message_received(&content, "overseer")
            .await
            .unwrap()
            .is_none());

        let log = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("SEND to=coder type=task"));
        assert!(lines[1].ends_with("RECV from=overseer type=task"));
    }
}
