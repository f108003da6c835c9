use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager};
use futures::StreamExt;
use tokio::sync::mpsc::UnboundedSender;

use crate::devices::Scanner;
use crate::errors::DeviceError;

const DEVICE: &str = "ble";

/// Passive scan on the first Bluetooth adapter of the host.
pub struct BleScanner {
    adapter: Adapter,
}

impl BleScanner {
    pub async fn new() -> Result<Self, DeviceError> {
        let manager = Manager::new().await.map_err(|e| DeviceError::init(DEVICE, e))?;

        let adapter = manager
            .adapters()
            .await
            .map_err(|e| DeviceError::init(DEVICE, e))?
            .into_iter()
            .next()
            .ok_or_else(|| DeviceError::init(DEVICE, "no Bluetooth adapter found"))?;

        Ok(Self { adapter })
    }

    async fn forward(&self, id: &btleplug::platform::PeripheralId, sightings: &UnboundedSender<String>) {
        match self.adapter.peripheral(id).await {
            Ok(peripheral) => {
                let _ = sightings.send(peripheral.address().to_string());
            }
            Err(e) => tracing::debug!("Peripheral lookup failed: {}", e),
        }
    }
}

#[async_trait]
impl Scanner for BleScanner {
    async fn scan(&self, window: Duration, sightings: UnboundedSender<String>) -> Result<(), DeviceError> {
        let mut events = self.adapter.events().await.map_err(|e| DeviceError::read(DEVICE, e))?;

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| DeviceError::read(DEVICE, e))?;

        let _ = tokio::time::timeout(window, async {
            while let Some(event) = events.next().await {
                match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                        self.forward(&id, &sightings).await;
                    }
                    _ => {}
                }
            }
        })
        .await;

        self.adapter.stop_scan().await.map_err(|e| DeviceError::read(DEVICE, e))
    }
}
