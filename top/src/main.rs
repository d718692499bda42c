use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use top::{AppConfig, SERVICE};
use top_core::{init_tracing, serve, ServiceConfig};
use top_oidc::OidcProvider;
use tracing::info;

/// Test OpenID Connect provider for integration tests
#[derive(Parser, Debug)]
#[command(name = "top", version, about, long_about = None)]
struct Cli {
    /// YAML configuration file (default: TOP_CONFIG_YAML or ./top.yaml)
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = ServiceConfig::load_from(SERVICE, cli.config.as_deref())?.with_typed::<AppConfig>()?;
    init_tracing(&config.server.log_level, config.server.log_format)?;

    let provider = Arc::new(OidcProvider::new(config.oidc.clone())?);
    let router = top::app(provider, &config.server)?;

    info!(
        service = %config.server.service_name,
        root_url = %config.server.root_url(),
        "Starting test OIDC provider"
    );
    serve(router, &config.server.bind_addr()).await?;
    Ok(())
}
