mod app;

use anyhow::{Context, Result};
use std::{
    env,
    fs::{self, OpenOptions},
    sync::{Arc, Mutex},
    time::Duration,
};

use nexus_core::{
    config::{self, AppConfig},
    ContentRegistry, MissionService, SystemClock,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    info!(?config, "configuration loaded");

    let service = Arc::new(MissionService::from_config(
        &config,
        ContentRegistry::builtin(),
        Arc::new(SystemClock),
    ));
    let team_name = env::args().nth(1).unwrap_or_else(|| "Operator".to_string());

    let mut app = app::NexusApp::new(
        service,
        &team_name,
        Duration::from_millis(config.tick_interval_ms),
    )?;
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("nexus.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::from_default_env();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
