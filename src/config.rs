//! Server configuration from CLI arguments and environment variables.

/// CLI arguments for the `tasklight` server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "tasklight task tracking server")]
pub struct CliArgs {
    /// Address to bind the HTTP server to.
    #[arg(short, long, env = "TASKLIGHT_ADDR", default_value = "127.0.0.1:8080")]
    pub bind: String,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKLIGHT_LOG")]
    pub log_level: String,

    /// Disable per-request access logging.
    #[arg(long)]
    pub no_access_log: bool,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to (e.g. `127.0.0.1:8080`).
    pub bind_addr: String,
    /// Log level filter string.
    pub log_level: String,
    /// Whether to log each request.
    pub access_log: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            log_level: "info".to_string(),
            access_log: true,
        }
    }
}

impl Config {
    /// Resolve the configuration from parsed CLI arguments.
    #[must_use]
    pub fn resolve(cli: &CliArgs) -> Self {
        Self {
            bind_addr: cli.bind.clone(),
            log_level: cli.log_level.clone(),
            access_log: !cli.no_access_log,
        }
    }
}
