use std::sync::Arc;

use async_trait::async_trait;

use crate::services::publisher::{self, Message, Publisher};
use crate::services::scheduler::Action;

const DETECTED: &str = "1";
const STOPPED: &str = "0";

/// Publishes a fixed motion state when its edge fires.
pub struct MotionJob {
    publisher: Arc<dyn Publisher>,
    topic: String,
    payload: &'static str,
}

impl MotionJob {
    pub fn detected(publisher: Arc<dyn Publisher>, topic: String) -> Self {
        Self { publisher, topic, payload: DETECTED }
    }

    pub fn stopped(publisher: Arc<dyn Publisher>, topic: String) -> Self {
        Self { publisher, topic, payload: STOPPED }
    }
}

#[async_trait]
impl Action for MotionJob {
    async fn run(&mut self) {
        tracing::debug!("motion {}", if self.payload == DETECTED { "detected" } else { "stopped" });
        publisher::forward(self.publisher.as_ref(), Message::new(self.topic.as_str(), self.payload)).await;
    }
}
