use async_trait::async_trait;
use chrono::Utc;

use super::{Plugin, PluginError};
use crate::model::Content;

pub const TRANSFORM_PLUGIN: &str = "message_transform";

/// Stamps routing metadata onto content: `sent_at`, `recipient` and
/// `message_type` on send, `received_at` and `sender` on receive.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageTransformPlugin;

#[async_trait]
impl Plugin for MessageTransformPlugin {
    fn name(&self) -> &str {
        TRANSFORM_PLUGIN
    }

    async fn on_message_sending(
        &self,
        content: &Content,
        to: &str,
    ) -> Result<Option<Content>, PluginError> {
        let kind = content.message_type().unwrap_or("unknown").to_string();
        Ok(Some(
            content
                .clone()
                .with("sent_at", Utc::now().to_rfc3339())
                .with("recipient", to)
                .with("message_type", kind),
        ))
    }

    async fn on_message_received(
        &self,
        content: &Content,
        from: &str,
    ) -> Result<Option<Content>, PluginError> {
        Ok(Some(
            content
                .clone()
                .with("received_at", Utc::now().to_rfc3339())
                .with("sender", from),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    #[tokio::test]
    async fn test_stamps_routing_fields() {
        let plugin = MessageTransformPlugin;
        let content = Content::new().with("type", "feedback");

        let sent = plugin
            .on_message_sending(&content, "overseer")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sent.get("recipient"), Some(&Value::from("overseer")));
        assert_eq!(sent.get("message_type"), Some(&Value::from("feedback")));
        assert!(sent.contains_key("sent_at"));

        let received = plugin
            .on_message_received(&sent, "coder")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.get("sender"), Some(&Value::from("coder")));
        assert!(received.contains_key("received_at"));
        assert!(received.contains_key("sent_at"));
    }
}
