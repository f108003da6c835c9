use std::sync::Arc;

use crate::configs::Settings;
use crate::devices::Devices;
use crate::errors::{DeviceError, HubError};
use crate::services::{ClimateJob, Co2Job, HeartbeatJob, MotionJob, PresenceJob, Publisher, Scheduler};

/// Builds one task per enabled source, plus the heartbeat.
pub fn create_scheduler(settings: &Settings, publisher: Arc<dyn Publisher>, devices: Devices) -> Result<Scheduler, HubError> {
    let mut scheduler = Scheduler::new();
    let mqtt = &settings.mqtt;

    if mqtt.heartbeat {
        scheduler.register_periodic(
            "heartbeat",
            mqtt.heartbeat_interval,
            HeartbeatJob::new(Arc::clone(&publisher), mqtt.topic("heartbeat")),
        )?;
    }

    if settings.bme280.enabled {
        let sensor = devices.environment.ok_or(DeviceError::Missing("bme280"))?;
        scheduler.register_periodic(
            "bme280",
            settings.bme280.interval,
            ClimateJob::new(sensor, Arc::clone(&publisher), &mqtt.preffix),
        )?;
    }

    if settings.ble.enabled {
        let scanner = devices.scanner.ok_or(DeviceError::Missing("ble"))?;
        scheduler.register_periodic(
            "ble",
            settings.ble.interval,
            PresenceJob::new(
                scanner,
                Arc::clone(&publisher),
                settings.ble.known_devices.clone(),
                &settings.ble.mqtt_preffix,
                settings.ble.duration,
            ),
        )?;
    }

    if settings.pir.enabled {
        let source = devices.motion.ok_or(DeviceError::Missing("pir"))?;
        let topic = mqtt.topic(&settings.pir.mqtt_suffix);
        scheduler.register_edge_trigger(
            "pir",
            source,
            MotionJob::detected(Arc::clone(&publisher), topic.clone()),
            MotionJob::stopped(Arc::clone(&publisher), topic),
        );
    }

    if settings.mhz19.enabled {
        let transport = devices.co2.ok_or(DeviceError::Missing("mhz19"))?;
        scheduler.register_periodic(
            "mhz19",
            settings.mhz19.interval,
            Co2Job::new(transport, Arc::clone(&publisher), &settings.mhz19.mqtt_suffix),
        )?;
    }

    Ok(scheduler)
}
