use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bme280::i2c::BME280;
use linux_embedded_hal::{Delay, I2cdev};

use crate::devices::{Climate, EnvironmentSensor};
use crate::errors::DeviceError;

const DEVICE: &str = "bme280";

/// BME280 on a Linux I2C bus. Every sample is a forced measurement.
pub struct Bme280Sensor {
    driver: Arc<Mutex<BME280<I2cdev>>>,
}

impl Bme280Sensor {
    pub fn new(bus: &str, address: u8) -> Result<Self, DeviceError> {
        let i2c = I2cdev::new(bus).map_err(|e| DeviceError::init(DEVICE, e))?;

        let mut driver = match address {
            0x77 => BME280::new_secondary(i2c),
            _ => BME280::new_primary(i2c),
        };
        driver
            .init(&mut Delay)
            .map_err(|e| DeviceError::init(DEVICE, format!("{e:?}")))?;

        Ok(Self {
            driver: Arc::new(Mutex::new(driver)),
        })
    }
}

#[async_trait]
impl EnvironmentSensor for Bme280Sensor {
    async fn measure(&mut self) -> Result<Climate, DeviceError> {
        let driver = Arc::clone(&self.driver);

        tokio::task::spawn_blocking(move || {
            let mut driver = driver
                .lock()
                .map_err(|_| DeviceError::read(DEVICE, "driver lock poisoned"))?;
            let measurements = driver
                .measure(&mut Delay)
                .map_err(|e| DeviceError::read(DEVICE, format!("{e:?}")))?;

            Ok(Climate {
                temperature: measurements.temperature,
                pressure: measurements.pressure,
                humidity: measurements.humidity,
            })
        })
        .await
        .map_err(|e| DeviceError::read(DEVICE, e))?
    }
}
