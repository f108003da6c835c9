use rppal::gpio::{Gpio, InputPin, Level, Trigger};
use tokio::sync::mpsc::UnboundedSender;

use crate::devices::{Edge, EdgeSource};
use crate::errors::DeviceError;

const DEVICE: &str = "pir";

/// PIR motion sensor on a BCM numbered GPIO input.
pub struct PirSensor {
    pin: InputPin,
}

impl PirSensor {
    pub fn new(pin: u8) -> Result<Self, DeviceError> {
        let pin = Gpio::new()
            .and_then(|gpio| gpio.get(pin))
            .map_err(|e| DeviceError::init(DEVICE, e))?
            .into_input_pulldown();

        Ok(Self { pin })
    }
}

impl EdgeSource for PirSensor {
    fn subscribe(&mut self, edges: UnboundedSender<Edge>) -> Result<(), DeviceError> {
        self.pin
            .set_async_interrupt(Trigger::Both, move |level| {
                let edge = match level {
                    Level::High => Edge::Asserted,
                    Level::Low => Edge::Cleared,
                };
                // receiver gone means the hub is shutting down
                let _ = edges.send(edge);
            })
            .map_err(|e| DeviceError::init(DEVICE, e))
    }
}
