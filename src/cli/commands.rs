//! CLI command implementations

use anyhow::Result;
use std::fs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{error, info, success, warn};
use crate::config;

/// Initialize a new courier.toml configuration file
pub async fn init() -> Result<()> {
    let config_path = std::path::Path::new("courier.toml");

    if config_path.exists() {
        warn("courier.toml already exists");
        return Ok(());
    }

    let content = config::default_config_content();
    fs::write(config_path, content)?;

    success("Created courier.toml");
    info("Edit the configuration file and run 'courier serve' to start the hub");

    Ok(())
}

/// Run the hub server
pub async fn serve(host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = config::load_config()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.tracing_directive())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info(&format!("Starting Courier at http://{}:{}", host, port));
    crate::api::run_server(config, &host, port).await?;

    Ok(())
}

/// Query a running hub's /stats endpoint
pub async fn stats(url: &str) -> Result<()> {
    let endpoint = format!("{}/stats", url.trim_end_matches('/'));

    let response = match reqwest::get(&endpoint).await {
        Ok(response) => response,
        Err(e) => {
            error(&format!("Failed to reach {}: {}", endpoint, e));
            return Err(e.into());
        }
    };

    let body: serde_json::Value = response.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);

    Ok(())
}
