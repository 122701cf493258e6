use crate::graph::GraphOptions;
use crate::saving::DEFAULT_DB_PATH;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_ADDR: &str = "RISK_DASHBOARD_ADDR";
pub const ENV_DB: &str = "RISK_DASHBOARD_DB";
pub const ENV_UPLOAD_LIMIT: &str = "RISK_DASHBOARD_UPLOAD_LIMIT";

const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// Runtime settings of the dashboard server
#[derive(Clone, Debug)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// SQLite file exports are persisted into
    pub db_path: PathBuf,

    /// Largest accepted upload in bytes
    pub upload_limit: usize,

    /// How long a login stays valid
    pub session_ttl: Duration,

    pub pie: GraphOptions,
    pub bar: GraphOptions,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "127.0.0.1:3000".to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            upload_limit: 10 * 1024 * 1024,
            session_ttl: Duration::from_secs(SESSION_DURATION),
            pie: GraphOptions {
                width: 800,
                height: 600,
            },
            bar: GraphOptions {
                width: 1000,
                height: 400,
            },
        }
    }
}

impl Config {
    /// Defaults overridden by `RISK_DASHBOARD_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable name.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        if let Some(addr) = lookup(ENV_ADDR).filter(|v| !v.is_empty()) {
            config.bind_addr = addr;
        }
        if let Some(db) = lookup(ENV_DB).filter(|v| !v.is_empty()) {
            config.db_path = PathBuf::from(db);
        }
        if let Some(limit) = lookup(ENV_UPLOAD_LIMIT).and_then(|v| v.parse().ok()) {
            config.upload_limit = limit;
        }
        config
    }

    /// Apply positional command-line arguments: `[bind_addr] [db_path]`.
    pub fn with_args(mut self, args: &[String]) -> Self {
        if let Some(addr) = args.first() {
            self.bind_addr = addr.clone();
        }
        if let Some(db) = args.get(1) {
            self.db_path = PathBuf::from(db);
        }
        self
    }
}
