mod app;
mod config;
mod error;
mod logging;
mod router;
mod server;
mod tools;
mod zoho;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "zoho-creator-mcp")]
#[command(about = "Model Context Protocol server for Zoho Creator")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/zoho-mcp/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Zoho environment to talk to
  #[arg(short, long, value_enum)]
  environment: Option<config::Environment>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override environment if specified on command line
  let config = if let Some(environment) = args.environment {
    config::Config {
      zoho: config::ZohoConfig {
        environment,
        ..config.zoho
      },
      ..config
    }
  } else {
    config
  };

  let _log_guard = logging::init(&config.logging)?;
  tracing::info!(environment = ?config.zoho.environment, "starting Zoho Creator MCP server");

  let app = app::App::new(&config)?;
  let result = app.run().await;
  app.shutdown().await;

  result
}
