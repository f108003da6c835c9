use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::configs::Settings;
use crate::errors::DeviceError;

#[cfg(feature = "ble")]
pub mod ble;
#[cfg(feature = "pir")]
pub mod gpio;
#[cfg(feature = "bme280")]
pub mod i2c;
#[cfg(feature = "mhz19")]
pub mod serial;

/// Level change reported by a boolean hardware input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Asserted,
    Cleared,
}

/// One sample from an environmental sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Climate {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Pascal.
    pub pressure: f32,
    /// Percent relative humidity.
    pub humidity: f32,
}

/// Temperature, pressure and humidity source.
#[async_trait]
pub trait EnvironmentSensor: Send {
    /// Takes one measurement covering all three values.
    async fn measure(&mut self) -> Result<Climate, DeviceError>;
}

/// Proximity scanner reporting the address of every advertisement it sees.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Scans for roughly `window`, sending each sighting as it happens.
    /// Returns once the scan has been stopped.
    async fn scan(&self, window: Duration, sightings: UnboundedSender<String>) -> Result<(), DeviceError>;
}

/// Boolean input delivering edges from the driver's own thread.
pub trait EdgeSource: Send {
    fn subscribe(&mut self, edges: UnboundedSender<Edge>) -> Result<(), DeviceError>;
}

pub trait SerialLink: Read + Write + Send {}

impl<T: Read + Write + Send> SerialLink for T {}

/// Opens a fresh serial connection for every exchange.
pub trait SerialTransport: Send + Sync {
    fn open(&self) -> io::Result<Box<dyn SerialLink>>;
}

/// Hardware handles for every enabled source.
#[derive(Default)]
pub struct Devices {
    pub environment: Option<Box<dyn EnvironmentSensor>>,
    pub scanner: Option<Arc<dyn Scanner>>,
    pub motion: Option<Box<dyn EdgeSource>>,
    pub co2: Option<Arc<dyn SerialTransport>>,
}

impl Devices {
    /// Initialises the hardware behind each enabled section of `settings`.
    pub async fn open(settings: &Settings) -> Result<Self, DeviceError> {
        let mut devices = Devices::default();

        if settings.bme280.enabled {
            devices.environment = Some(open_environment(settings)?);
        }
        if settings.ble.enabled {
            devices.scanner = Some(open_scanner().await?);
        }
        if settings.pir.enabled {
            devices.motion = Some(open_motion(settings)?);
        }
        if settings.mhz19.enabled {
            devices.co2 = Some(open_co2(settings)?);
        }

        Ok(devices)
    }
}

#[cfg(feature = "bme280")]
fn open_environment(settings: &Settings) -> Result<Box<dyn EnvironmentSensor>, DeviceError> {
    let sensor = i2c::Bme280Sensor::new(&settings.bme280.bus, settings.bme280.address)?;
    tracing::info!(
        "BME280 ready on {} at {:#04x}",
        settings.bme280.bus,
        settings.bme280.address
    );
    Ok(Box::new(sensor))
}

#[cfg(not(feature = "bme280"))]
fn open_environment(_settings: &Settings) -> Result<Box<dyn EnvironmentSensor>, DeviceError> {
    Err(DeviceError::Unsupported("bme280"))
}

#[cfg(feature = "ble")]
async fn open_scanner() -> Result<Arc<dyn Scanner>, DeviceError> {
    let scanner = ble::BleScanner::new().await?;
    tracing::info!("Bluetooth adapter ready");
    Ok(Arc::new(scanner))
}

#[cfg(not(feature = "ble"))]
async fn open_scanner() -> Result<Arc<dyn Scanner>, DeviceError> {
    Err(DeviceError::Unsupported("ble"))
}

#[cfg(feature = "pir")]
fn open_motion(settings: &Settings) -> Result<Box<dyn EdgeSource>, DeviceError> {
    let pin = settings.pir.pin.ok_or(DeviceError::Missing("pir.pin"))?;
    let sensor = gpio::PirSensor::new(pin)?;
    tracing::info!("PIR ready on GPIO {}", pin);
    Ok(Box::new(sensor))
}

#[cfg(not(feature = "pir"))]
fn open_motion(_settings: &Settings) -> Result<Box<dyn EdgeSource>, DeviceError> {
    Err(DeviceError::Unsupported("pir"))
}

#[cfg(feature = "mhz19")]
fn open_co2(settings: &Settings) -> Result<Arc<dyn SerialTransport>, DeviceError> {
    let transport = serial::SerialPortTransport::new(&settings.mhz19.port, settings.mhz19.timeout);
    tracing::info!("MH-Z19 configured on {}", settings.mhz19.port);
    Ok(Arc::new(transport))
}

#[cfg(not(feature = "mhz19"))]
fn open_co2(_settings: &Settings) -> Result<Arc<dyn SerialTransport>, DeviceError> {
    Err(DeviceError::Unsupported("mhz19"))
}
