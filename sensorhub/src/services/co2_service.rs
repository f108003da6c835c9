use std::sync::Arc;

use async_trait::async_trait;

use crate::devices::SerialTransport;
use crate::errors::FrameError;
use crate::protocol::mhz19;
use crate::services::publisher::{self, Message, Publisher};
use crate::services::scheduler::Action;

/// Polls the MH-Z19 and publishes the CO2 concentration in ppm.
///
/// The port is opened and closed within each tick.
pub struct Co2Job {
    transport: Arc<dyn SerialTransport>,
    publisher: Arc<dyn Publisher>,
    topic: String,
}

impl Co2Job {
    pub fn new(transport: Arc<dyn SerialTransport>, publisher: Arc<dyn Publisher>, topic: &str) -> Self {
        Self {
            transport,
            publisher,
            topic: topic.to_string(),
        }
    }

    async fn read(&self) -> Result<u16, FrameError> {
        let transport = Arc::clone(&self.transport);

        tokio::task::spawn_blocking(move || {
            let mut link = transport.open()?;
            mhz19::exchange(&mut *link)
        })
        .await
        .map_err(|e| FrameError::Io(std::io::Error::other(e)))?
    }
}

#[async_trait]
impl Action for Co2Job {
    async fn run(&mut self) {
        match self.read().await {
            Ok(ppm) => {
                publisher::forward(self.publisher.as_ref(), Message::new(self.topic.as_str(), ppm.to_string())).await;
            }
            Err(e) => tracing::warn!("Skipping co2: {}", e),
        }
    }
}
