pub mod duration;
pub mod settings;

pub use settings::{Ble, Bme280, BrokerAddress, Logger, Mhz19, Mqtt, Pir, Settings};
