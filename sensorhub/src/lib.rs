use std::sync::Arc;
use std::time::Duration;

use crate::app::create_scheduler;
use crate::configs::settings::Settings;
use crate::devices::Devices;
use crate::errors::HubError;
use crate::services::MqttService;

pub mod app;
pub mod configs;
pub mod devices;
pub mod errors;
pub mod protocol;
pub mod services;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);

pub async fn run(settings: &Arc<Settings>) -> Result<(), HubError> {
    let devices = Devices::open(settings).await?;

    let mqtt = MqttService::connect(&settings.mqtt).await?;

    let scheduler = create_scheduler(settings, Arc::new(mqtt.publisher()), devices)?;
    tracing::info!("starting {} tasks", scheduler.len());
    let handle = scheduler.start()?;

    shutdown_signal().await;
    tracing::info!("shutting down");

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle.shutdown()).await.is_err() {
        tracing::warn!("tasks did not stop within {:?}", SHUTDOWN_TIMEOUT);
    }

    mqtt.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
