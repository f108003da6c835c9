pub mod device;
pub mod frame;
pub mod publish;

pub use device::DeviceError;
pub use frame::FrameError;
pub use publish::PublishError;

/// Errors that stop the hub from starting or running.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),
}
