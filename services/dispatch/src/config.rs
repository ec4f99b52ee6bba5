use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use lifeboat_catalog::DbConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub dev_mode: bool,
    pub ranking_base_url: String,
    pub cache_path: PathBuf,
    /// When set, rescue outcomes are recorded in a JSON log at this path
    /// instead of the catalog.
    pub rescue_log_path: Option<PathBuf>,
    pub database: DbConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let listen_addr = std::env::var("DISPATCH_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8081".to_string())
            .parse()?;

        let log_level = std::env::var("DISPATCH_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let dev_mode = std::env::var("DISPATCH_DEV")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let ranking_base_url = std::env::var("RANKING_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8082".to_string());

        let cache_path = std::env::var("DISPATCH_CACHE_PATH")
            .unwrap_or_else(|_| "./data/ranking_cache.json".to_string())
            .into();

        let rescue_log_path = std::env::var("RESCUE_LOG_PATH").ok().map(PathBuf::from);

        let database = DbConfig::from_env();

        Ok(Self {
            listen_addr,
            log_level,
            dev_mode,
            ranking_base_url,
            cache_path,
            rescue_log_path,
            database,
        })
    }
}
