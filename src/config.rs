use anyhow::Context;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://progress.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_BATCH_SIZE: usize = 20;
pub const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    /// Mirror that every review is synced to, best effort.
    pub remote_database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub batch_size: usize,
    pub cache_max_age: Duration,
    /// Directory of the static site to serve next to the API, if any.
    pub static_dir: Option<PathBuf>,
}

impl Config {
    /// Reads `NIHONGO_*` variables, after loading `.env` when present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("NIHONGO_DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let remote_database_url = lookup("NIHONGO_REMOTE_DATABASE_URL").filter(|url| !url.is_empty());

        let bind_addr = lookup("NIHONGO_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("NIHONGO_BIND_ADDR is not a socket address")?;

        let batch_size = match lookup("NIHONGO_BATCH_SIZE") {
            Some(raw) => raw.parse().context("NIHONGO_BATCH_SIZE is not a number")?,
            None => DEFAULT_BATCH_SIZE,
        };
        anyhow::ensure!(batch_size > 0, "NIHONGO_BATCH_SIZE must be positive");

        let cache_max_age = match lookup("NIHONGO_CACHE_MAX_AGE_SECS") {
            Some(raw) => raw.parse().context("NIHONGO_CACHE_MAX_AGE_SECS is not a number")?,
            None => DEFAULT_CACHE_MAX_AGE_SECS,
        };

        let static_dir = lookup("NIHONGO_STATIC_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);

        Ok(Config {
            database_url,
            remote_database_url,
            bind_addr,
            batch_size,
            cache_max_age: Duration::from_secs(cache_max_age),
            static_dir,
        })
    }
}
