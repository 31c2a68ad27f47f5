use std::{env, process};

use dotenvy::dotenv;
use log::{error, info, warn};
use tokio::sync::watch;

use sensor_producer::reading::seeded_rng;
use sensor_producer::{logging, Broker, Config, TelemetryPublisher};

#[tokio::main]
async fn main() {
    // Docker supplies the environment directly; elsewhere a .env file may.
    let running_in_docker = env::var("RUNNING_IN_DOCKER").is_ok();
    let dotenv_path = if running_in_docker { None } else { dotenv().ok() };

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    if let Err(e) = logging::init(config.log_level, config.log_file.as_deref()) {
        eprintln!("Failed to initialise logging: {}", e);
        process::exit(1);
    }

    info!("Starting sensor data generator...");
    match dotenv_path {
        Some(path) => info!("Loaded environment variables from {}", path.display()),
        None if running_in_docker => info!("Running in Docker, using Docker environment variables"),
        None => {}
    }

    let broker = match Broker::connect(&config).await {
        Ok(broker) => broker,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Shutdown signal received, stopping publisher");
        let _ = shutdown_tx.send(true);
    });

    let mut publisher = TelemetryPublisher::from_config(broker, seeded_rng(), &config);
    publisher.run(shutdown_rx).await;

    if let Err(e) = publisher.into_sink().close().await {
        warn!("{}", e);
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!("Failed to listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
