use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::devices::Scanner;
use crate::services::publisher::{self, Message, Publisher};
use crate::services::scheduler::Action;

/// Extra time granted to the adapter to stop a scan before it is abandoned.
pub const SCAN_GRACE: Duration = Duration::from_secs(5);

const PRESENT: &str = "home";

/// Scans for beacons and publishes `"home"` for every sighting of a known
/// address, while the scan is still running.
pub struct PresenceJob {
    scanner: Arc<dyn Scanner>,
    publisher: Arc<dyn Publisher>,
    known_devices: Vec<String>,
    prefix: String,
    window: Duration,
}

impl PresenceJob {
    pub fn new(
        scanner: Arc<dyn Scanner>,
        publisher: Arc<dyn Publisher>,
        known_devices: Vec<String>,
        prefix: &str,
        window: Duration,
    ) -> Self {
        Self {
            scanner,
            publisher,
            known_devices,
            prefix: prefix.to_string(),
            window,
        }
    }
}

#[async_trait]
impl Action for PresenceJob {
    async fn run(&mut self) {
        let (sightings, mut received) = mpsc::unbounded_channel();
        let scanner = Arc::clone(&self.scanner);
        let window = self.window;

        let scan = async move { tokio::time::timeout(window + SCAN_GRACE, scanner.scan(window, sightings)).await };

        let publish = async {
            while let Some(address) = received.recv().await {
                if !self.known_devices.iter().any(|known| *known == address) {
                    tracing::trace!("ignoring {}", address);
                    continue;
                }

                let topic = format!("{}{}", self.prefix, address);
                publisher::forward(self.publisher.as_ref(), Message::new(topic, PRESENT)).await;
            }
        };

        let (scanned, ()) = tokio::join!(scan, publish);

        match scanned {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("BLE scan failed: {}", e),
            Err(_) => tracing::warn!("BLE scan did not stop within {:?}", window + SCAN_GRACE),
        }
    }
}
