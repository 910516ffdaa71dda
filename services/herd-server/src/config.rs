use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use herd_tag::{TagAllocator, PREFIX_CAPACITY};

use crate::db::DbConfig;

/// Default session lifetime, matching a typical "remember me" window.
const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub dev_mode: bool,
    pub database: DbConfig,
    pub auth: AuthConfig,
    pub tag_capacity: u32,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// How long a session stays valid after sign-in.
    pub session_ttl_days: i64,

    /// Mark the session cookie `Secure` (enable behind TLS).
    pub secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
            secure_cookies: false,
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let listen_addr = std::env::var("HERD_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .context("HERD_LISTEN_ADDR must be a socket address")?;

        let log_level = std::env::var("HERD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let dev_mode = env_flag("HERD_DEV");

        let tag_capacity = match std::env::var("HERD_TAG_CAPACITY") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("HERD_TAG_CAPACITY must be an integer, got '{raw}'"))?,
            Err(_) => PREFIX_CAPACITY,
        };
        // Reject bad capacities at startup rather than on the first add.
        TagAllocator::new(tag_capacity).context("HERD_TAG_CAPACITY out of range")?;

        let session_ttl_days = match std::env::var("HERD_SESSION_TTL_DAYS") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("HERD_SESSION_TTL_DAYS must be an integer, got '{raw}'"))?,
            Err(_) => DEFAULT_SESSION_TTL_DAYS,
        };
        if session_ttl_days < 1 {
            bail!("HERD_SESSION_TTL_DAYS must be at least 1");
        }

        let auth = AuthConfig {
            session_ttl_days,
            secure_cookies: env_flag("HERD_SECURE_COOKIES"),
        };

        let database = DbConfig::from_env()?;

        Ok(Self {
            listen_addr,
            log_level,
            dev_mode,
            database,
            auth,
            tag_capacity,
        })
    }
}
