use std::sync::Arc;

use async_trait::async_trait;

use crate::devices::EnvironmentSensor;
use crate::protocol::format::fixed_point;
use crate::services::publisher::{self, Message, Publisher};
use crate::services::scheduler::Action;

/// Publishes temperature, pressure (hPa) and humidity from one measurement
/// per tick. A failed measurement skips the tick; a value the driver could
/// not compute skips only that value.
pub struct ClimateJob {
    sensor: Box<dyn EnvironmentSensor>,
    publisher: Arc<dyn Publisher>,
    prefix: String,
}

impl ClimateJob {
    pub fn new(sensor: Box<dyn EnvironmentSensor>, publisher: Arc<dyn Publisher>, prefix: &str) -> Self {
        Self {
            sensor,
            publisher,
            prefix: prefix.to_string(),
        }
    }
}

async fn report(target: &Arc<dyn Publisher>, prefix: &str, source: &str, value: f64) {
    let Some(payload) = fixed_point(value) else {
        tracing::warn!("Skipping {}: driver returned {}", source, value);
        return;
    };

    let topic = format!("{}{}", prefix, source);
    publisher::forward(target.as_ref(), Message::new(topic, payload)).await;
}

#[async_trait]
impl Action for ClimateJob {
    async fn run(&mut self) {
        let climate = match self.sensor.measure().await {
            Ok(climate) => climate,
            Err(e) => {
                tracing::warn!("Skipping climate readings: {}", e);
                return;
            }
        };

        report(&self.publisher, &self.prefix, "temperature", f64::from(climate.temperature)).await;
        report(&self.publisher, &self.prefix, "pressure", f64::from(climate.pressure) / 100.0).await;
        report(&self.publisher, &self.prefix, "humidity", f64::from(climate.humidity)).await;
    }
}
