//! Runtime configuration read from `PUPPETRY_*` environment variables

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::providers::ProviderSelection;
use crate::transport::{
    DEFAULT_CLIENT_QUEUE_CAPACITY, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_MAX_BUFFER_SIZE,
    DEFAULT_SSE_PATH, ReplayMode, TransportConfig,
};

pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:3100";

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the event stream HTTP server binds to
    pub http_addr: SocketAddr,
    pub transport: TransportConfig,
    pub providers: ProviderSelection,
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let http_addr: SocketAddr = match var("PUPPETRY_HTTP_ADDR") {
            Some(raw) => parse("PUPPETRY_HTTP_ADDR", &raw)?,
            None => parse("PUPPETRY_HTTP_ADDR", DEFAULT_HTTP_ADDR)?,
        };

        let path = var("PUPPETRY_SSE_PATH").unwrap_or_else(|| DEFAULT_SSE_PATH.to_string());
        if !path.starts_with('/') {
            return Err(ConfigError::invalid("PUPPETRY_SSE_PATH", &path, "must start with '/'"));
        }

        let max_buffer_size = match var("PUPPETRY_SSE_BUFFER_SIZE") {
            Some(raw) => {
                let size: i64 = parse("PUPPETRY_SSE_BUFFER_SIZE", &raw)?;
                usize::try_from(size).map_err(|_| {
                    ConfigError::invalid("PUPPETRY_SSE_BUFFER_SIZE", &raw, "must be non-negative")
                })?
            }
            None => DEFAULT_MAX_BUFFER_SIZE,
        };

        let heartbeat_interval = match var("PUPPETRY_SSE_HEARTBEAT_MS") {
            Some(raw) => {
                let ms: u64 = parse("PUPPETRY_SSE_HEARTBEAT_MS", &raw)?;
                if ms == 0 {
                    return Err(ConfigError::invalid(
                        "PUPPETRY_SSE_HEARTBEAT_MS",
                        &raw,
                        "must be positive",
                    ));
                }
                Duration::from_millis(ms)
            }
            None => DEFAULT_HEARTBEAT_INTERVAL,
        };

        let client_queue_capacity = match var("PUPPETRY_SSE_CLIENT_QUEUE") {
            Some(raw) => {
                let capacity: usize = parse("PUPPETRY_SSE_CLIENT_QUEUE", &raw)?;
                if capacity == 0 {
                    return Err(ConfigError::invalid(
                        "PUPPETRY_SSE_CLIENT_QUEUE",
                        &raw,
                        "must be positive",
                    ));
                }
                capacity
            }
            None => DEFAULT_CLIENT_QUEUE_CAPACITY,
        };

        let replay_mode = match var("PUPPETRY_SSE_REPLAY").as_deref() {
            None | Some("off") => ReplayMode::Off,
            Some("reconnect") => ReplayMode::Reconnect,
            Some(other) => {
                return Err(ConfigError::invalid(
                    "PUPPETRY_SSE_REPLAY",
                    other,
                    "expected \"off\" or \"reconnect\"",
                ));
            }
        };

        let defaults = ProviderSelection::default();
        let providers = ProviderSelection {
            mouse: var("PUPPETRY_MOUSE_PROVIDER").unwrap_or(defaults.mouse),
            keyboard: var("PUPPETRY_KEYBOARD_PROVIDER").unwrap_or(defaults.keyboard),
            screen: var("PUPPETRY_SCREEN_PROVIDER").unwrap_or(defaults.screen),
            clipboard: var("PUPPETRY_CLIPBOARD_PROVIDER").unwrap_or(defaults.clipboard),
        };

        Ok(Self {
            http_addr,
            transport: TransportConfig {
                path,
                max_buffer_size,
                heartbeat_interval,
                client_queue_capacity,
                replay_mode,
            },
            providers,
        })
    }
}

fn parse<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(var, raw, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.http_addr.to_string(), DEFAULT_HTTP_ADDR);
        assert_eq!(config.transport.path, "/mcp/sse");
        assert_eq!(config.transport.max_buffer_size, 100);
        assert_eq!(config.transport.heartbeat_interval, Duration::from_millis(25_000));
        assert_eq!(config.transport.replay_mode, ReplayMode::Off);
        assert_eq!(config.providers.mouse, "auto");
        assert_eq!(config.providers.clipboard, "command");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PUPPETRY_HTTP_ADDR", "0.0.0.0:8080"),
            ("PUPPETRY_SSE_PATH", "/events"),
            ("PUPPETRY_SSE_BUFFER_SIZE", "0"),
            ("PUPPETRY_SSE_HEARTBEAT_MS", "1000"),
            ("PUPPETRY_SSE_CLIENT_QUEUE", "8"),
            ("PUPPETRY_SSE_REPLAY", "reconnect"),
            ("PUPPETRY_MOUSE_PROVIDER", "x11"),
        ])
        .unwrap();

        assert_eq!(config.http_addr.port(), 8080);
        assert_eq!(config.transport.path, "/events");
        assert_eq!(config.transport.max_buffer_size, 0);
        assert_eq!(config.transport.heartbeat_interval, Duration::from_secs(1));
        assert_eq!(config.transport.client_queue_capacity, 8);
        assert_eq!(config.transport.replay_mode, ReplayMode::Reconnect);
        assert_eq!(config.providers.mouse, "x11");
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = config_from(&[("PUPPETRY_SSE_BUFFER_SIZE", "  ")]).unwrap();
        assert_eq!(config.transport.max_buffer_size, 100);
    }

    #[test]
    fn test_negative_buffer_size_rejected() {
        let err = config_from(&[("PUPPETRY_SSE_BUFFER_SIZE", "-1")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { var: "PUPPETRY_SSE_BUFFER_SIZE", .. }
        ));
    }

    #[test]
    fn test_zero_heartbeat_rejected() {
        assert!(config_from(&[("PUPPETRY_SSE_HEARTBEAT_MS", "0")]).is_err());
    }

    #[test]
    fn test_bad_path_and_replay_mode_rejected() {
        assert!(config_from(&[("PUPPETRY_SSE_PATH", "events")]).is_err());
        assert!(config_from(&[("PUPPETRY_SSE_REPLAY", "always")]).is_err());
        assert!(config_from(&[("PUPPETRY_HTTP_ADDR", "nowhere")]).is_err());
    }
}
