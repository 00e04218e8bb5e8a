mod bootstrap;
mod health;

use anyhow::Result;
use mcdowell_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use mcdowell_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.effective_log_level().parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging needs the config, so config errors surface through anyhow on stderr
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(&app.config.server.bind_address, app.config.server.health_check_port).await?;

    tracing::info!(
        event_name = "system.server.started",
        bot_name = %app.config.bot.name,
        bot_id = app.bot.identity().id().unwrap_or("unresolved"),
        "McDowell's is now open for business"
    );

    tokio::select! {
        result = app.rtm_runner.start() => {
            result?;
            tracing::warn!(
                event_name = "system.server.rtm_stopped",
                "slack event stream stopped; waiting for shutdown"
            );
            wait_for_shutdown().await?;
        }
        result = wait_for_shutdown() => result?,
    }

    tracing::info!(event_name = "system.server.stopping", "mcdowell stopping");
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
