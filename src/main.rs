use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use cache_proxy::config::load_config;
use cache_proxy::lifecycle;
use cache_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "cache-proxy")]
#[command(about = "Caching reverse proxy for the main and resource sites", long_about = None)]
struct Cli {
    /// Configuration file (JSON or TOML).
    #[arg(short, long, default_value = "config/config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {}", cli.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.observability) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        bind_address = %config.listener.bind_address,
        cache_root = %config.cache.root_dir,
        "cache-proxy starting"
    );

    match lifecycle::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Proxy stopped with an error");
            ExitCode::FAILURE
        }
    }
}
