//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::game::settings::{MatchSettings, SettingsError};
use crate::util::time::DEFAULT_TICK_MILLIS;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (comma-separated)
    pub client_origin: String,
    /// Real-time length of one shot clock second
    pub tick_period: Duration,
    /// Settings for sessions created without their own
    pub match_defaults: MatchSettings,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let tick_millis: u64 = parse_or(&lookup, "SHOT_CLOCK_TICK_MS", DEFAULT_TICK_MILLIS)?;
        if tick_millis == 0 {
            return Err(ConfigError::Invalid("SHOT_CLOCK_TICK_MS"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origin: lookup("CLIENT_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            tick_period: Duration::from_millis(tick_millis),
            match_defaults: match_defaults(&lookup)?,
        })
    }
}

fn match_defaults(lookup: &impl Fn(&str) -> Option<String>) -> Result<MatchSettings, ConfigError> {
    let base = MatchSettings::default();
    let settings = MatchSettings {
        shot_time: parse_or(lookup, "SHOT_TIME", base.shot_time)?,
        extension_time: parse_or(lookup, "EXTENSION_TIME", base.extension_time)?,
        extensions_allowed: parse_or(lookup, "EXTENSIONS_ALLOWED", base.extensions_allowed)?,
        first_shot_bonus: parse_or(lookup, "FIRST_SHOT_BONUS", base.first_shot_bonus)?,
        warning_time: parse_or(lookup, "WARNING_TIME", base.warning_time)?,
        audio_enabled: parse_or(lookup, "AUDIO_ENABLED", base.audio_enabled)?,
        breaking_player: parse_or(lookup, "BREAKING_PLAYER", base.breaking_player)?,
        format: parse_or(lookup, "MATCH_FORMAT", base.format)?,
        target: parse_or(lookup, "MATCH_TARGET", base.target)?,
        game_type: parse_or(lookup, "GAME_TYPE", base.game_type)?,
        three_foul_rule: parse_or(lookup, "THREE_FOUL_RULE", base.three_foul_rule)?,
    };
    Ok(settings.validated()?)
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid match defaults: {0}")]
    Settings(#[from] SettingsError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::{MatchFormat, PlayerId};
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_addr.port(), 8080);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.tick_period, Duration::from_secs(1));
        assert_eq!(config.match_defaults, MatchSettings::default());
    }

    #[test]
    fn port_overrides_server_addr() {
        let config = load(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:7000")]).unwrap();
        assert_eq!(config.server_addr.port(), 9000);
    }

    #[test]
    fn reads_match_defaults() {
        let config = load(&[
            ("SHOT_TIME", "45"),
            ("MATCH_FORMAT", "race"),
            ("MATCH_TARGET", "7"),
            ("BREAKING_PLAYER", "two"),
            ("THREE_FOUL_RULE", "true"),
        ])
        .unwrap();
        let defaults = config.match_defaults;
        assert_eq!(defaults.shot_time, 45);
        assert_eq!(defaults.format, MatchFormat::Race);
        assert_eq!(defaults.target, 7);
        assert_eq!(defaults.breaking_player, PlayerId::Two);
        assert!(defaults.three_foul_rule);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            load(&[("SHOT_TIME", "soon")]),
            Err(ConfigError::Invalid("SHOT_TIME"))
        ));
        assert!(matches!(
            load(&[("SHOT_CLOCK_TICK_MS", "0")]),
            Err(ConfigError::Invalid("SHOT_CLOCK_TICK_MS"))
        ));
        assert!(matches!(
            load(&[("SERVER_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddress)
        ));
        assert!(matches!(
            load(&[("SHOT_TIME", "5"), ("FIRST_SHOT_BONUS", "0")]),
            Err(ConfigError::Settings(SettingsError::WarningExceedsShotTime { .. }))
        ));
    }
}
