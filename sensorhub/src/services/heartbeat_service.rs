use std::sync::Arc;

use async_trait::async_trait;

use crate::services::publisher::{self, Message, Publisher};
use crate::services::scheduler::Action;

pub struct HeartbeatJob {
    publisher: Arc<dyn Publisher>,
    topic: String,
}

impl HeartbeatJob {
    pub fn new(publisher: Arc<dyn Publisher>, topic: String) -> Self {
        Self { publisher, topic }
    }
}

#[async_trait]
impl Action for HeartbeatJob {
    async fn run(&mut self) {
        publisher::forward(self.publisher.as_ref(), Message::new(self.topic.as_str(), Vec::new())).await;
    }
}
