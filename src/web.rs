#![cfg(not(tarpaulin_include))]

use risk_dashboard::app;
use risk_dashboard::config::Config;
use std::env;

/// Main entry point for the dashboard server
///
/// Settings come from `RISK_DASHBOARD_*` environment variables, then from
/// the optional positional arguments.
///
/// # Arguments
/// * `[bind_addr] [db_path]` - Optional overrides
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let config = Config::from_env().with_args(&args);

    app::run(config).await
}
