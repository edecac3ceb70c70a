//! Service configuration.
//!
//! # Purpose
//! Sources configuration from environment variables with development-friendly
//! defaults, with an optional YAML file (`PACKWISE_CONFIG`) overriding
//! individual fields for ops deployments.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_CACHE_SIZE: usize = 1000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
pub const DEFAULT_RATE_LIMIT_BURST: u32 = 20;
pub const DEFAULT_RATE_LIMIT_REFILL_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP bind address for the API.
    pub bind_addr: SocketAddr,
    /// Prometheus metrics bind address.
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    /// Result cache entry capacity.
    pub cache_size: usize,
    /// Time-to-live for cached calculations.
    pub cache_ttl: Duration,
    /// Optional secret gating pack-size mutations.
    pub api_key: Option<String>,
    pub rate_limit_burst: u32,
    pub rate_limit_refill: Duration,
}

#[derive(Debug, Deserialize)]
struct AppConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    cache_size: Option<usize>,
    cache_ttl_secs: Option<u64>,
    api_key: Option<String>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let port = env_or("PORT", "8080");
        let bind_addr = format!("0.0.0.0:{port}")
            .parse()
            .with_context(|| "parse PORT")?;
        let metrics_bind = env_or("METRICS_BIND", "0.0.0.0:9100")
            .parse()
            .with_context(|| "parse METRICS_BIND")?;

        let storage = match env_or("STORE_BACKEND", "postgres").as_str() {
            "memory" => StorageBackend::Memory,
            "postgres" => StorageBackend::Postgres,
            other => anyhow::bail!("unknown STORE_BACKEND: {other}"),
        };
        // DATABASE_URL wins; otherwise the URL is assembled from the
        // individual connection variables.
        let url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                let host = env_or("DB_HOST", "localhost");
                let port = env_or("DB_PORT", "5432");
                let user = env_or("DB_USER", "postgres");
                let password = env_or("DB_PASSWORD", "postgres");
                let name = env_or("DB_NAME", "packwise");
                format!("postgres://{user}:{password}@{host}:{port}/{name}")
            }
        };
        let postgres = Some(PostgresConfig {
            url,
            max_connections: env_or("DB_MAX_CONNECTIONS", "50")
                .parse()
                .with_context(|| "parse DB_MAX_CONNECTIONS")?,
            acquire_timeout_ms: 5000,
        });

        let cache_size = env_or("CACHE_SIZE", &DEFAULT_CACHE_SIZE.to_string())
            .parse()
            .with_context(|| "parse CACHE_SIZE")?;
        let cache_ttl_secs: u64 = env_or("CACHE_TTL_SECS", &DEFAULT_CACHE_TTL_SECS.to_string())
            .parse()
            .with_context(|| "parse CACHE_TTL_SECS")?;
        let api_key = std::env::var("API_KEY").ok().filter(|key| !key.is_empty());
        let rate_limit_burst = env_or("RATE_LIMIT_BURST", &DEFAULT_RATE_LIMIT_BURST.to_string())
            .parse()
            .with_context(|| "parse RATE_LIMIT_BURST")?;
        let rate_limit_refill_ms: u64 = env_or(
            "RATE_LIMIT_REFILL_MS",
            &DEFAULT_RATE_LIMIT_REFILL_MS.to_string(),
        )
        .parse()
        .with_context(|| "parse RATE_LIMIT_REFILL_MS")?;

        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            cache_size,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            api_key,
            rate_limit_burst,
            rate_limit_refill: Duration::from_millis(rate_limit_refill_ms),
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("PACKWISE_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read PACKWISE_CONFIG: {path}"))?;
            let override_cfg: AppConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse config yaml")?;
            if let Some(value) = override_cfg.bind_addr {
                config.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
            }
            if let Some(value) = override_cfg.metrics_bind {
                config.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
            }
            if let Some(value) = override_cfg.cache_size {
                config.cache_size = value;
            }
            if let Some(value) = override_cfg.cache_ttl_secs {
                config.cache_ttl = Duration::from_secs(value);
            }
            if let Some(value) = override_cfg.api_key {
                config.api_key = Some(value).filter(|key| !key.is_empty());
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    const VARS: &[&str] = &[
        "PORT",
        "METRICS_BIND",
        "STORE_BACKEND",
        "DATABASE_URL",
        "DB_HOST",
        "DB_PORT",
        "DB_USER",
        "DB_PASSWORD",
        "DB_NAME",
        "DB_MAX_CONNECTIONS",
        "CACHE_SIZE",
        "CACHE_TTL_SECS",
        "API_KEY",
        "RATE_LIMIT_BURST",
        "RATE_LIMIT_REFILL_MS",
        "PACKWISE_CONFIG",
    ];

    fn clear_env() {
        for key in VARS {
            unsafe {
                env::remove_var(key);
            }
        }
    }

    #[serial]
    #[test]
    fn from_env_uses_defaults() {
        clear_env();
        let config = AppConfig::from_env().expect("from_env");
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.metrics_bind.to_string(), "0.0.0.0:9100");
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.cache_size, 1000);
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.api_key, None);
        assert_eq!(config.rate_limit_burst, 20);
        assert_eq!(config.rate_limit_refill, Duration::from_millis(100));
        clear_env();
    }

    #[serial]
    #[test]
    fn from_env_respects_env_vars() {
        clear_env();
        unsafe {
            env::set_var("PORT", "9000");
            env::set_var("STORE_BACKEND", "memory");
            env::set_var("CACHE_SIZE", "50");
            env::set_var("API_KEY", "sekret");
            env::set_var("DATABASE_URL", "postgres://app:app@db:5432/packs");
        }
        let config = AppConfig::from_env().expect("from_env");
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:9000");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.cache_size, 50);
        assert_eq!(config.api_key.as_deref(), Some("sekret"));
        assert_eq!(
            config.postgres.as_ref().map(|pg| pg.url.as_str()),
            Some("postgres://app:app@db:5432/packs")
        );
        clear_env();
    }

    #[serial]
    #[test]
    fn empty_api_key_means_open_writes() {
        clear_env();
        unsafe {
            env::set_var("API_KEY", "");
        }
        let config = AppConfig::from_env().expect("from_env");
        assert_eq!(config.api_key, None);
        clear_env();
    }

    #[serial]
    #[test]
    fn from_env_rejects_invalid_values() {
        clear_env();
        unsafe {
            env::set_var("PORT", "not-a-port");
        }
        assert!(AppConfig::from_env().is_err());
        clear_env();
        unsafe {
            env::set_var("STORE_BACKEND", "sqlite");
        }
        assert!(AppConfig::from_env().is_err());
        clear_env();
    }

    #[serial]
    #[test]
    fn from_env_or_yaml_overrides_fields() {
        clear_env();
        let tmpdir = TempDir::new().unwrap();
        let config_path = tmpdir.path().join("config.yml");
        fs::write(
            &config_path,
            r#"
bind_addr: "127.0.0.1:7443"
cache_size: 25
cache_ttl_secs: 60
"#,
        )
        .unwrap();
        unsafe {
            env::set_var("PACKWISE_CONFIG", config_path.to_str().unwrap());
        }

        let config = AppConfig::from_env_or_yaml().expect("from_env_or_yaml");
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:7443");
        assert_eq!(config.cache_size, 25);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        clear_env();
    }

    #[serial]
    #[test]
    fn from_env_or_yaml_missing_file_fails() {
        clear_env();
        let tmpdir = TempDir::new().unwrap();
        let nonexistent = tmpdir.path().join("missing.yml");
        unsafe {
            env::set_var("PACKWISE_CONFIG", nonexistent.to_str().unwrap());
        }
        assert!(AppConfig::from_env_or_yaml().is_err());
        clear_env();
    }

    #[serial]
    #[test]
    fn from_env_or_yaml_invalid_yaml_fails() {
        clear_env();
        let tmpdir = TempDir::new().unwrap();
        let config_path = tmpdir.path().join("bad.yml");
        fs::write(&config_path, "this is not: valid: yaml:").unwrap();
        unsafe {
            env::set_var("PACKWISE_CONFIG", config_path.to_str().unwrap());
        }
        assert!(AppConfig::from_env_or_yaml().is_err());
        clear_env();
    }
}
