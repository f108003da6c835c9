use std::io;
use std::time::Duration;

use crate::devices::{SerialLink, SerialTransport};

/// MH-Z19 UART settings: 9600 baud, 8N1.
const BAUD_RATE: u32 = 9600;

pub struct SerialPortTransport {
    path: String,
    timeout: Duration,
}

impl SerialPortTransport {
    pub fn new(path: &str, timeout: Duration) -> Self {
        Self {
            path: path.to_string(),
            timeout,
        }
    }
}

impl SerialTransport for SerialPortTransport {
    fn open(&self) -> io::Result<Box<dyn SerialLink>> {
        let port = serialport::new(&self.path, BAUD_RATE)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(self.timeout)
            .open()?;

        Ok(Box::new(port))
    }
}
