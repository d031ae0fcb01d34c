//! `tasklight` server binary.
//!
//! ```bash
//! # Run on the default address 127.0.0.1:8080
//! cargo run
//!
//! # Run on a custom address with access logging disabled
//! cargo run -- --bind 0.0.0.0:9090 --no-access-log
//! ```

use clap::Parser;
use tasklight::config::{CliArgs, Config};
use tasklight::server::{self, AppState};

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();
    let config = Config::resolve(&cli);

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, version = tasklight::VERSION, "starting tasklight");

    if let Err(err) = server::serve(&config, AppState::new()).await {
        tracing::error!(error = %err, "server failed");
        std::process::exit(1);
    }
}
