use async_trait::async_trait;

use crate::errors::PublishError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain: false,
        }
    }

    pub fn retained(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            retain: true,
            ..Self::new(topic, payload)
        }
    }
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, message: Message) -> Result<(), PublishError>;
}

/// Publishes `message`, logging instead of propagating a failure.
pub async fn forward(publisher: &dyn Publisher, message: Message) {
    let topic = message.topic.clone();

    match publisher.publish(message).await {
        Ok(()) => tracing::debug!("published to {}", topic),
        Err(e) => tracing::warn!("Failed to publish to {}: {}", topic, e),
    }
}
