//! Process configuration, sourced entirely from the environment (§6).

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone)]
pub struct Config {
    pub admin_key: String,
    pub https_addr: String,
    pub rpc_addr: String,
    pub db_path: String,
    pub tls_cert: String,
    pub tls_key: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl Config {
    /// Load configuration from the process environment, validating required fields.
    pub fn from_env() -> ConfigResult<Self> {
        let admin_key = std::env::var("ADMIN_KEY").unwrap_or_default();
        if admin_key.is_empty() {
            return Err(ConfigError::MissingAdminKey);
        }

        let log_format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        Ok(Self {
            admin_key,
            https_addr: env_or("HTTPS_ADDR", ":13313"),
            rpc_addr: env_or("RPC_ADDR", ":13312"),
            db_path: env_or("DB_PATH", "glitchd.db"),
            tls_cert: env_or("TLS_CERT", "server.crt"),
            tls_key: env_or("TLS_KEY", "server.key"),
            log_format,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

/// Normalizes a Go-style `:PORT` address (no host) into one `ToSocketAddrs` accepts.
pub fn normalize_addr(addr: &str) -> String {
    if let Some(stripped) = addr.strip_prefix(':') {
        format!("0.0.0.0:{stripped}")
    } else {
        addr.to_string()
    }
}
