//! Configuration loading and validation.

use crate::error::ConfigError;
use serenity::model::id::{ChannelId, MessageId};

/// Default command prefix when `PREFIX` is not set.
pub const DEFAULT_PREFIX: &str = "!!";

/// Radio bot configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token. The process refuses to start without it.
    pub token: String,

    /// Text command prefix.
    pub prefix: String,

    /// Dedicated text channel hosting the control panel. The panel feature
    /// is disabled when absent.
    pub panel_channel: Option<ChannelId>,

    /// Persisted control-message identifier from a previous run. Stale or
    /// absent means a fresh panel message is created on startup.
    pub panel_message: Option<MessageId>,

    /// Optional TOML file overriding the built-in station catalog.
    pub stations_file: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_values(
            std::env::var("BOT_TOKEN").ok(),
            std::env::var("PREFIX").ok(),
            std::env::var("DEDICATED_TEXT_ID").ok(),
            std::env::var("RADIO_CONTROLS_ID").ok(),
            std::env::var("RADIO_STATIONS_FILE").ok(),
        )
    }

    /// Build a configuration from already-read values. `load` is a thin
    /// wrapper over this so validation stays testable without touching the
    /// process environment.
    pub fn from_values(
        token: Option<String>,
        prefix: Option<String>,
        panel_channel: Option<String>,
        panel_message: Option<String>,
        stations_file: Option<String>,
    ) -> Result<Self, ConfigError> {
        let token = match token {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Err(ConfigError::MissingKey("BOT_TOKEN")),
        };

        let prefix = match prefix {
            Some(p) if !p.is_empty() => p,
            _ => DEFAULT_PREFIX.to_string(),
        };

        let panel_channel = parse_id("DEDICATED_TEXT_ID", panel_channel)?.map(ChannelId::new);
        let panel_message = parse_id("RADIO_CONTROLS_ID", panel_message)?.map(MessageId::new);

        Ok(Self {
            token,
            prefix,
            panel_channel,
            panel_message,
            stations_file,
        })
    }
}

/// Parse an optional snowflake value. Empty strings count as unset; a
/// present but non-numeric (or zero) value is a configuration error rather
/// than something to silently ignore.
fn parse_id(key: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = value else { return Ok(None) };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<u64>() {
        Ok(id) if id != 0 => Ok(Some(id)),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn missing_token_aborts_startup() {
        let err = Config::from_values(None, None, None, None, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey("BOT_TOKEN")));
    }

    #[test]
    fn blank_token_aborts_startup() {
        let err = Config::from_values(some("   "), None, None, None, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey("BOT_TOKEN")));
    }

    #[test]
    fn prefix_defaults_when_unset() {
        let config = Config::from_values(some("tok"), None, None, None, None).unwrap();
        assert_eq!(config.prefix, DEFAULT_PREFIX);
    }

    #[test]
    fn panel_ids_are_optional() {
        let config = Config::from_values(some("tok"), some("!"), None, some(""), None).unwrap();
        assert_eq!(config.prefix, "!");
        assert!(config.panel_channel.is_none());
        assert!(config.panel_message.is_none());
    }

    #[test]
    fn panel_ids_parse_as_snowflakes() {
        let config = Config::from_values(
            some("tok"),
            None,
            some("123456789012345678"),
            some("876543210987654321"),
            None,
        )
        .unwrap();
        assert_eq!(config.panel_channel, Some(ChannelId::new(123456789012345678)));
        assert_eq!(config.panel_message, Some(MessageId::new(876543210987654321)));
    }

    #[test]
    fn non_numeric_id_is_rejected() {
        let err =
            Config::from_values(some("tok"), None, some("not-a-number"), None, None).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "DEDICATED_TEXT_ID",
                ..
            }
        ));
    }
}
