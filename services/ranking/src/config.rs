use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use lifeboat_catalog::DbConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub dev_mode: bool,
    pub recompute_interval: Duration,
    pub database: DbConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let listen_addr = std::env::var("RANKING_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8082".to_string())
            .parse()?;

        let log_level = std::env::var("RANKING_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let dev_mode = std::env::var("RANKING_DEV")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let recompute_secs = std::env::var("RANKING_RECOMPUTE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120);

        let database = DbConfig::from_env();

        Ok(Self {
            listen_addr,
            log_level,
            dev_mode,
            recompute_interval: Duration::from_secs(recompute_secs),
            database,
        })
    }
}
