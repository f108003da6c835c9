pub mod climate_service;
pub mod co2_service;
pub mod heartbeat_service;
pub mod motion_service;
pub mod mqtt_service;
pub mod presence_service;
pub mod publisher;
pub mod scheduler;

pub use climate_service::ClimateJob;
pub use co2_service::Co2Job;
pub use heartbeat_service::HeartbeatJob;
pub use motion_service::MotionJob;
pub use mqtt_service::{MqttPublisher, MqttService};
pub use presence_service::PresenceJob;
pub use publisher::{Message, Publisher};
pub use scheduler::{Action, Scheduler, SchedulerHandle};
