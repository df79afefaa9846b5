mod client;
mod config;
mod dispatcher;
mod error;
mod mcp;
mod models;
mod session;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use config::Config;
use mcp::ReflectMcp;
use session::Session;

const DEFAULT_CONFIG_PATH: &str = "reflect.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config_path =
        std::env::var("REFLECT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    init_logging(&config.logging.level);
    log::info!("Starting Reflect MCP server...");

    let session = Session::new(&config);
    log::info!(
        "Configuration loaded (API {}, auth state {:?})",
        session.api_base_url(),
        session.state()
    );

    // stdout carries the protocol; logs go to stderr
    ReflectMcp::new(session)
        .serve_stdio()
        .await
        .context("MCP server terminated with an error")?;

    log::info!("Server stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let mut builder = pretty_env_logger::formatted_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.parse_filters(level),
    };
    builder.init();
}
