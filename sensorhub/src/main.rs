use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use sensorhub::configs::settings::Settings;
use sensorhub::run;

#[derive(Parser)]
#[command(version, about = "Publishes Raspberry Pi sensor readings to MQTT")]
struct Args {
    /// Configuration file name, with or without extension
    #[arg(short, long, default_value = "config")]
    config: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let settings = Settings::new(&args.config);

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let app_name = env!("CARGO_PKG_NAME").replace('-', "_");
            let level = settings
                .as_ref()
                .map(|settings| settings.logger.level.as_str())
                .unwrap_or("info");

            format!("{app_name}={level}").into()
        }))
        .init();

    let settings = match settings {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            tracing::error!("Failed to load settings from {:?}: {}", args.config, e);
            return ExitCode::FAILURE;
        }
    };

    match run(&settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
