use log::warn;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Relay server settings, read from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            static_dir: PathBuf::from("./static"),
        }
    }
}

impl RelayConfig {
    /// Reads `CHESS_RELAY_HOST`, `PORT` and `CHESS_STATIC_DIR`, falling back
    /// to the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = RelayConfig::default();
        if let Some(host) = lookup("CHESS_RELAY_HOST").filter(|h| !h.is_empty()) {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => config.port = port,
                Err(e) => warn!("Ignoring invalid PORT {:?}: {}", port, e),
            }
        }
        if let Some(dir) = lookup("CHESS_STATIC_DIR").filter(|d| !d.is_empty()) {
            config.static_dir = PathBuf::from(dir);
        }
        config
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

/// Timing constants for one peer's game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchConfig {
    pub initial_clock_ms: u64,
    pub tick_interval: Duration,
    pub ai_poll_interval: Duration,
    pub ai_think_base: Duration,
    /// Upper bound of the random extra thinking time.
    pub ai_think_jitter: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            initial_clock_ms: 10 * 60 * 1000,
            tick_interval: Duration::from_millis(200),
            ai_poll_interval: Duration::from_millis(650),
            ai_think_base: Duration::from_millis(420),
            ai_think_jitter: Duration::from_millis(420),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = RelayConfig::from_lookup(|_| None);
        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.bind_address(), ("127.0.0.1".to_string(), 3000));
    }

    #[test]
    fn reads_overrides_and_skips_bad_port() {
        let vars: HashMap<&str, &str> = [
            ("CHESS_RELAY_HOST", "0.0.0.0"),
            ("PORT", "not-a-port"),
            ("CHESS_STATIC_DIR", "/srv/chess"),
        ]
        .into_iter()
        .collect();
        let config = RelayConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.static_dir, PathBuf::from("/srv/chess"));

        let config = RelayConfig::from_lookup(|k| (k == "PORT").then(|| "8080".to_string()));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn match_defaults() {
        let config = MatchConfig::default();
        assert_eq!(config.initial_clock_ms, 600_000);
        assert_eq!(config.tick_interval, Duration::from_millis(200));
    }
}
