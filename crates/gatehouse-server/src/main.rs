use clap::Parser;
use gatehouse_server::ServerBuilder;
use gatehouse_server::config::loader::{DEFAULT_CONFIG_PATH, load_config};

/// Login throttling and role-gated HTTP server.
#[derive(Debug, Parser)]
#[command(name = "gatehouse-server", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "GATEHOUSE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    // Initialize tracing early with the default level
    gatehouse_server::observability::init_tracing();

    let cli = Cli::parse();
    let cfg = load_config(Some(cli.config.as_str()))
        .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?;

    tracing::info!(
        path = %cli.config,
        cache_backend = ?cfg.cache.backend,
        "Configuration loaded"
    );
    gatehouse_server::observability::apply_logging_level(&cfg.logging.level);

    let server = ServerBuilder::new().with_config(cfg).build().await?;
    server.run().await
}
