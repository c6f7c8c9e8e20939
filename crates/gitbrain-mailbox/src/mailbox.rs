use std::sync::Arc;

use gitbrain_core::model::{Content, Message, Payload, Priority};
use gitbrain_core::plugin::PluginPipeline;
use gitbrain_core::validation::MessageValidator;

use crate::error::MailboxError;
use crate::transport::{MailboxTransport, MessageLocation};

/// A sent message and where the transport put it.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message: Message,
    pub location: MessageLocation,
}

/// One agent's view of the mailbox: its own role bound to a transport, with
/// validation and plugins applied on the way out and plugins on the way in.
#[derive(Clone)]
pub struct Mailbox {
    role: String,
    transport: Arc<dyn MailboxTransport>,
    validator: Arc<MessageValidator>,
    plugins: Arc<PluginPipeline>,
}

impl Mailbox {
    pub fn new(role: impl Into<String>, transport: Arc<dyn MailboxTransport>) -> Self {
        Self {
            role: role.into(),
            transport,
            validator: Arc::new(MessageValidator::with_default_schemas()),
            plugins: Arc::new(PluginPipeline::new()),
        }
    }

    pub fn with_validator(mut self, validator: MessageValidator) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn with_plugins(mut self, plugins: Arc<PluginPipeline>) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn transport(&self) -> &Arc<dyn MailboxTransport> {
        &self.transport
    }

    pub fn plugins(&self) -> &Arc<PluginPipeline> {
        &self.plugins
    }

    pub async fn send(
        &self,
        to: &str,
        payload: &Payload,
        priority: Priority,
    ) -> Result<Delivery, MailboxError> {
        self.send_content(to, payload.to_content()?, priority).await
    }

    /// Validate, run outgoing plugins, then hand to the transport.
    pub async fn send_content(
        &self,
        to: &str,
        content: Content,
        priority: Priority,
    ) -> Result<Delivery, MailboxError> {
        self.validator.validate(&content)?;
        let content = self.plugins.process_outgoing(content, to).await;
        let message = Message::new(self.role.as_str(), to, content, priority);
        let location = self.transport.send(&message, to).await?;
        tracing::debug!(
            "Sent {} from {} to {to} via {} ({location})",
            message.id(),
            self.role,
            self.transport.name()
        );
        Ok(Delivery { message, location })
    }

    /// Messages waiting for this role, oldest first, after incoming plugins.
    pub async fn receive(&self) -> Result<Vec<Message>, MailboxError> {
        let messages = self.transport.receive(&self.role).await?;
        let mut delivered = Vec::with_capacity(messages.len());
        for message in messages {
            let content = self
                .plugins
                .process_incoming(message.content().clone(), message.from())
                .await;
            delivered.push(message.with_content(content));
        }
        Ok(delivered)
    }

    pub async fn acknowledge(&self, message: &Message) -> Result<(), MailboxError> {
        Ok(self.transport.acknowledge(&self.role, message).await?)
    }

    pub async fn clear(&self) -> Result<usize, MailboxError> {
        Ok(self.transport.clear(&self.role).await?)
    }

    pub async fn count(&self) -> Result<usize, MailboxError> {
        Ok(self.transport.count(&self.role).await?)
    }
}
