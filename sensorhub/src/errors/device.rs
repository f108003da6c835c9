use std::io;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("{0} support was not compiled in")]
    Unsupported(&'static str),

    #[error("{0} is enabled but no device was provided")]
    Missing(&'static str),

    #[error("Failed to initialise {device}: {reason}")]
    Init { device: &'static str, reason: String },

    #[error("Failed to read {device}: {reason}")]
    Read { device: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DeviceError {
    pub fn init(device: &'static str, reason: impl ToString) -> Self {
        DeviceError::Init { device, reason: reason.to_string() }
    }

    pub fn read(device: &'static str, reason: impl ToString) -> Self {
        DeviceError::Read { device, reason: reason.to_string() }
    }
}
