pub mod config;
pub mod crypto;
pub mod db;
pub mod maintenance;
pub mod models;
pub mod roles;

use tracing_subscriber::EnvFilter;

/// Initialize tracing to stderr; stdout is reserved for reports.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}
