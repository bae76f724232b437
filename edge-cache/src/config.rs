//! Configuration keys, read once at process start and thereafter
//! treated as read-only (§5's "module-level configuration" note).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration for an `edge-cache` deployment.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "snake_case")]
pub struct EngineConfig {
    /// Redis connection settings.
    pub redis: RedisConfig,
    /// Redis logical database index used for cache entries and the
    /// expiry index.
    pub redis_database: u8,
    /// Redis logical database index used by the out-of-process
    /// revalidation worker queue. Not opened by this crate; recorded so
    /// it can be handed to the worker runtime.
    pub redis_qless_database: u8,
    /// Upstream origin host. Used to derive the default proxy target
    /// when `proxy_location` isn't set explicitly.
    pub upstream_host: String,
    /// Upstream origin port. Used to derive the default proxy target
    /// when `proxy_location` isn't set explicitly.
    pub upstream_port: u16,
    /// Explicit override for the path prefix prepended to
    /// `uri_relative` on every origin call, e.g. `http://origin:8080`.
    /// When unset, [`EngineConfig::proxy_location`] derives it from
    /// `upstream_host`/`upstream_port` instead.
    #[serde(rename = "proxy_location")]
    pub proxy_location_override: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            redis_database: 0,
            redis_qless_database: 1,
            upstream_host: "127.0.0.1".to_string(),
            upstream_port: 8080,
            proxy_location_override: None,
        }
    }
}

impl EngineConfig {
    /// The effective proxy target: `proxy_location` if set, else
    /// `http://{upstream_host}:{upstream_port}`.
    pub fn proxy_location(&self) -> String {
        self.proxy_location_override
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.upstream_host, self.upstream_port))
    }
}

/// Redis connection and pooling settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "snake_case")]
pub struct RedisConfig {
    /// Redis hostname.
    pub host: String,
    /// Redis TCP port.
    pub port: u16,
    /// Optional Unix socket path; when set, takes precedence over
    /// `host`/`port`.
    pub socket: Option<String>,
    /// Connection timeout.
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
    /// Pool keepalive settings.
    pub keepalive: KeepaliveConfig,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            socket: None,
            timeout: default_timeout(),
            keepalive: KeepaliveConfig::default(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_millis(1000)
}

/// Pool sizing and idle-connection lifetime.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "snake_case")]
pub struct KeepaliveConfig {
    /// Maximum time a pooled connection may sit idle before recycling.
    #[serde(with = "humantime_serde", default = "default_max_idle_timeout")]
    pub max_idle_timeout: Duration,
    /// Maximum number of pooled connections.
    pub pool_size: usize,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self { max_idle_timeout: default_max_idle_timeout(), pool_size: default_pool_size() }
    }
}

fn default_max_idle_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_pool_size() -> usize {
    100
}

impl RedisConfig {
    /// Build the `redis://` URL this configuration describes for logical
    /// database `db`. Ignores `socket`; callers wanting Unix-socket
    /// connections should branch on `socket.is_some()` before calling
    /// this.
    pub fn url(&self, db: u8) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, db)
    }
}

/// Load configuration from an optional file path layered under
/// environment variables prefixed `EDGE_CACHE_` (e.g.
/// `EDGE_CACHE_UPSTREAM_PORT=9090`), following the layered
/// file-then-env convention used elsewhere in the pack's config loaders.
pub fn load(path: Option<&str>) -> Result<EngineConfig, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(path).required(false));
    }
    builder = builder.add_source(config::Environment::with_prefix("EDGE_CACHE").separator("__"));
    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_config_keys() {
        let config = EngineConfig::default();
        assert_eq!(config.redis.timeout, Duration::from_millis(1000));
        assert_eq!(config.redis.keepalive.pool_size, 100);
        assert_eq!(config.redis_database, 0);
    }

    #[test]
    fn proxy_location_derives_from_upstream_host_and_port_by_default() {
        let config = EngineConfig::default();
        assert_eq!(config.proxy_location(), "http://127.0.0.1:8080");
    }

    #[test]
    fn proxy_location_override_wins_over_the_derived_default() {
        let mut config = EngineConfig::default();
        config.upstream_host = "internal.example".to_string();
        config.upstream_port = 9090;
        config.proxy_location_override = Some("http://explicit.example:1234".to_string());
        assert_eq!(config.proxy_location(), "http://explicit.example:1234");
    }

    #[test]
    fn proxy_location_reflects_a_changed_upstream_host_when_unset() {
        let mut config = EngineConfig::default();
        config.upstream_host = "origin.internal".to_string();
        config.upstream_port = 9090;
        assert_eq!(config.proxy_location(), "http://origin.internal:9090");
    }
}
