use anyhow::Result;
use erabee_core::config::{AppConfig, LoadOptions};
use erabee_server::{bootstrap, routes, scheduler};

fn init_logging(config: &AppConfig) {
    use erabee_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(error) = run().await {
        tracing::error!(
            event_name = "system.server.failed",
            error = %format!("{error:#}"),
            "erabee-server terminated"
        );
        return Err(error);
    }
    Ok(())
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;

    if app.config.digest.enabled {
        let run_at = app.config.digest.run_at_time()?;
        scheduler::spawn(app.handler.clone(), scheduler::daily_schedule(run_at)?);
        tracing::info!(
            event_name = "system.scheduler.started",
            correlation_id = "bootstrap",
            run_at = %run_at,
            "daily digest scheduler started"
        );
    }

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "erabee-server listening"
    );

    axum::serve(listener, routes::router(app.state()))
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "erabee-server stopping"
    );
    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(
            event_name = "system.server.signal_failed",
            error = %error,
            "could not listen for ctrl-c"
        );
    }
}
