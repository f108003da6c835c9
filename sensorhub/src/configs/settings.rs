use std::fmt;
use std::time::Duration;

use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use config::builder::DefaultState;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use super::duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Logger {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for Logger {
    fn default() -> Self {
        Self { level: default_level() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Mqtt {
    /// `tcp://host:port`, `host:port` or `host`
    #[serde(alias = "host")]
    pub broker: String,
    #[serde(default = "default_client_id")]
    pub id: String,
    #[serde(default)]
    pub lwt: Option<String>,
    #[serde(default, alias = "prefix")]
    pub preffix: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_keep_alive", deserialize_with = "duration::deserialize", alias = "keep-alive")]
    pub keep_alive: Duration,
    #[serde(default = "enabled")]
    pub heartbeat: bool,
    #[serde(default = "default_heartbeat_interval", deserialize_with = "duration::deserialize", alias = "heartbeat-interval")]
    pub heartbeat_interval: Duration,
}

impl Mqtt {
    pub fn address(&self) -> Result<BrokerAddress, ConfigError> {
        BrokerAddress::parse(&self.broker)
    }

    /// Topic carrying the retained online/offline flag, if configured.
    pub fn last_will(&self) -> Option<&str> {
        self.lwt.as_deref().filter(|topic| !topic.is_empty())
    }

    /// Prefix-relative topic, e.g. `home/pi/` + `temperature`.
    pub fn topic(&self, suffix: &str) -> String {
        format!("{}{}", self.preffix, suffix)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bme280 {
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval", deserialize_with = "duration::deserialize")]
    pub interval: Duration,
    #[serde(default = "default_bme280_address", deserialize_with = "deserialize_address")]
    pub address: u8,
    #[serde(default = "default_i2c_bus")]
    pub bus: String,
}

impl Default for Bme280 {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: default_poll_interval(),
            address: default_bme280_address(),
            bus: default_i2c_bus(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ble {
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval", deserialize_with = "duration::deserialize")]
    pub interval: Duration,
    #[serde(default = "default_scan_duration", deserialize_with = "duration::deserialize")]
    pub duration: Duration,
    #[serde(default, alias = "mqtt-preffix")]
    pub mqtt_preffix: String,
    #[serde(default, alias = "known-devices")]
    pub known_devices: Vec<String>,
}

impl Default for Ble {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: default_poll_interval(),
            duration: default_scan_duration(),
            mqtt_preffix: String::new(),
            known_devices: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pir {
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// BCM GPIO number
    #[serde(default)]
    pub pin: Option<u8>,
    #[serde(default = "default_pir_suffix", alias = "mqtt-suffix")]
    pub mqtt_suffix: String,
}

impl Default for Pir {
    fn default() -> Self {
        Self {
            enabled: false,
            pin: None,
            mqtt_suffix: default_pir_suffix(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Mhz19 {
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval", deserialize_with = "duration::deserialize")]
    pub interval: Duration,
    /// Full topic, not prefixed by `mqtt.preffix`.
    #[serde(default = "default_co2_topic", alias = "mqtt-suffix")]
    pub mqtt_suffix: String,
    #[serde(default = "default_serial_port")]
    pub port: String,
    #[serde(default = "default_serial_timeout", deserialize_with = "duration::deserialize")]
    pub timeout: Duration,
}

impl Default for Mhz19 {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: default_poll_interval(),
            mqtt_suffix: default_co2_topic(),
            port: default_serial_port(),
            timeout: default_serial_timeout(),
        }
    }
}

/// A source section that is present is enabled unless it says otherwise;
/// an absent section is disabled.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logger: Logger,
    pub mqtt: Mqtt,
    #[serde(default)]
    pub bme280: Bme280,
    #[serde(default)]
    pub ble: Ble,
    #[serde(default)]
    pub pir: Pir,
    #[serde(default)]
    pub mhz19: Mhz19,
}

impl Settings {
    /// Loads `name` from the working directory, trying every extension the
    /// `config` crate knows (`config` → `config.toml`, `config.yaml`, ...),
    /// then applies `SENSORHUB__<SECTION>__<KEY>` environment overrides.
    pub fn new(name: &str) -> Result<Self, ConfigError> {
        Self::build(Config::builder().add_source(File::with_name(name)))
    }

    /// Loads settings from an in-memory document.
    pub fn parse(contents: &str, format: FileFormat) -> Result<Self, ConfigError> {
        Self::build(Config::builder().add_source(File::from_str(contents, format)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("SENSORHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.mqtt.address()?;

        if !self.mqtt.keep_alive.is_zero() && self.mqtt.keep_alive < Duration::from_secs(1) {
            return Err(ConfigError::Message(
                "mqtt.keep_alive must be zero or at least one second".into(),
            ));
        }

        if self.mqtt.heartbeat {
            require_positive("mqtt.heartbeat_interval", self.mqtt.heartbeat_interval)?;
        }

        if self.bme280.enabled {
            require_positive("bme280.interval", self.bme280.interval)?;

            if !matches!(self.bme280.address, 0x76 | 0x77) {
                return Err(ConfigError::Message(format!(
                    "bme280.address must be 0x76 or 0x77, got {:#04x}",
                    self.bme280.address
                )));
            }
        }

        if self.ble.enabled {
            require_positive("ble.interval", self.ble.interval)?;
            require_positive("ble.duration", self.ble.duration)?;

            if self.ble.duration > self.ble.interval {
                return Err(ConfigError::Message(format!(
                    "ble.duration ({:?}) must not exceed ble.interval ({:?})",
                    self.ble.duration, self.ble.interval
                )));
            }
        }

        if self.pir.enabled && self.pir.pin.is_none() {
            return Err(ConfigError::Message("pir.pin is required when pir is enabled".into()));
        }

        if self.mhz19.enabled {
            require_positive("mhz19.interval", self.mhz19.interval)?;

            if self.mhz19.port.is_empty() {
                return Err(ConfigError::Message("mhz19.port must not be empty".into()));
            }
            if self.mhz19.mqtt_suffix.is_empty() {
                return Err(ConfigError::Message("mhz19.mqtt_suffix must not be empty".into()));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

impl BrokerAddress {
    pub const DEFAULT_PORT: u16 = 1883;

    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let value = value.trim();
        let address = value
            .strip_prefix("tcp://")
            .or_else(|| value.strip_prefix("mqtt://"))
            .unwrap_or(value)
            .trim_end_matches('/');

        if address.contains("://") {
            return Err(ConfigError::Message(format!(
                "mqtt.broker {value:?} uses an unsupported scheme"
            )));
        }

        let (host, port) = match address.rsplit_once(':') {
            Some((host, port)) if !host.ends_with(':') => {
                let port = port.parse::<u16>().map_err(|_| {
                    ConfigError::Message(format!("mqtt.broker {value:?} has an invalid port"))
                })?;
                (host, port)
            }
            _ => (address, Self::DEFAULT_PORT),
        };

        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(ConfigError::Message("mqtt.broker must name a host".into()));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

fn require_positive(key: &str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        Err(ConfigError::Message(format!("{key} must be greater than zero")))
    } else {
        Ok(())
    }
}

fn deserialize_address<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    struct AddressVisitor;

    impl<'de> Visitor<'de> for AddressVisitor {
        type Value = u8;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an I2C address such as 0x76 or 118")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u8, E> {
            u8::try_from(value).map_err(|_| E::custom(format!("I2C address {value} out of range")))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<u8, E> {
            u8::try_from(value).map_err(|_| E::custom(format!("I2C address {value} out of range")))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<u8, E> {
            let value = value.trim();
            let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
                Some(hex) => u8::from_str_radix(hex, 16),
                None => value.parse(),
            };
            parsed.map_err(|_| E::custom(format!("invalid I2C address {value:?}")))
        }
    }

    deserializer.deserialize_any(AddressVisitor)
}

fn enabled() -> bool {
    true
}

fn default_level() -> String {
    String::from("info")
}

fn default_client_id() -> String {
    String::from("rpi")
}

fn default_keep_alive() -> Duration {
    Duration::from_secs(30)
}

fn default_heartbeat_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_scan_duration() -> Duration {
    Duration::from_secs(10)
}

fn default_bme280_address() -> u8 {
    0x76
}

fn default_i2c_bus() -> String {
    String::from("/dev/i2c-1")
}

fn default_pir_suffix() -> String {
    String::from("motion")
}

fn default_co2_topic() -> String {
    String::from("co2")
}

fn default_serial_port() -> String {
    String::from("/dev/serial0")
}

fn default_serial_timeout() -> Duration {
    Duration::from_secs(1)
}
