//! Configuration types.

use chrono::{FixedOffset, Offset, Utc};
use secrecy::SecretString;

use crate::error::ConfigError;
use crate::questions::store::DEFAULT_CAPACITY;

/// Default number of unanswered questions kept in memory.
pub const DEFAULT_MAX_QUESTIONS: usize = DEFAULT_CAPACITY;

/// Default long-poll timeout for `getUpdates`, in seconds.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

/// Greeting sent in reply to `/start`.
pub const START_GREETING: &str = "سلام! ربات زجاج کلاب فعال است.";

/// Relay behaviour, independent of the transport.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Store capacity; the oldest question is evicted beyond this.
    pub max_questions: usize,
    /// When set, only questions asked in this chat are stored.
    pub group_id: Option<i64>,
    /// Offset used for the date stamp in captions.
    pub utc_offset: FixedOffset,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_questions: DEFAULT_MAX_QUESTIONS,
            group_id: None,
            utc_offset: Utc.fix(),
        }
    }
}

/// Full bot configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: SecretString,
    pub relay: RelayConfig,
    pub poll_timeout_secs: u64,
    /// Drop the update backlog when the webhook is removed at startup.
    pub drop_pending_updates: bool,
}

impl BotConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".into()))?;

        let max_questions: usize =
            parse_or(&lookup, "QA_MAX_QUESTIONS", DEFAULT_MAX_QUESTIONS)?;
        if max_questions == 0 {
            return Err(ConfigError::InvalidValue {
                key: "QA_MAX_QUESTIONS".into(),
                message: "must be at least 1".into(),
            });
        }

        let group_id = match lookup("QA_GROUP_ID") {
            Some(raw) if !raw.trim().is_empty() => Some(parse_value("QA_GROUP_ID", &raw)?),
            _ => None,
        };

        let offset_minutes: i32 = parse_or(&lookup, "QA_UTC_OFFSET_MINUTES", 0)?;
        let utc_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "QA_UTC_OFFSET_MINUTES".into(),
                message: format!("{offset_minutes} is outside ±24h"),
            })?;

        let poll_timeout_secs =
            parse_or(&lookup, "QA_POLL_TIMEOUT_SECS", DEFAULT_POLL_TIMEOUT_SECS)?;
        let drop_pending_updates = parse_or(&lookup, "QA_DROP_PENDING_UPDATES", true)?;

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            relay: RelayConfig {
                max_questions,
                group_id,
                utc_offset,
            },
            poll_timeout_secs,
            drop_pending_updates,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => parse_value(key, &raw),
        _ => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_only_token_set() {
        let config = load(&[("TELEGRAM_BOT_TOKEN", "123:ABC")]).unwrap();
        assert_eq!(config.bot_token.expose_secret(), "123:ABC");
        assert_eq!(config.relay.max_questions, 100);
        assert_eq!(config.relay.group_id, None);
        assert_eq!(config.poll_timeout_secs, 30);
        assert!(config.drop_pending_updates);
        assert_eq!(config.relay.utc_offset.local_minus_utc(), 0);
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn blank_token_is_an_error() {
        assert!(load(&[("TELEGRAM_BOT_TOKEN", "   ")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("QA_MAX_QUESTIONS", "5"),
            ("QA_GROUP_ID", "-1001700701292"),
            ("QA_POLL_TIMEOUT_SECS", "10"),
            ("QA_DROP_PENDING_UPDATES", "false"),
            ("QA_UTC_OFFSET_MINUTES", "210"),
        ])
        .unwrap();
        assert_eq!(config.relay.max_questions, 5);
        assert_eq!(config.relay.group_id, Some(-1001700701292));
        assert_eq!(config.poll_timeout_secs, 10);
        assert!(!config.drop_pending_updates);
        assert_eq!(config.relay.utc_offset.local_minus_utc(), 210 * 60);
    }

    #[test]
    fn out_of_range_offset_rejected() {
        let err = load(&[("TELEGRAM_BOT_TOKEN", "t"), ("QA_UTC_OFFSET_MINUTES", "1500")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "QA_UTC_OFFSET_MINUTES"));
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = load(&[("TELEGRAM_BOT_TOKEN", "t"), ("QA_MAX_QUESTIONS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "QA_MAX_QUESTIONS"));
    }

    #[test]
    fn garbage_number_rejected() {
        let err = load(&[("TELEGRAM_BOT_TOKEN", "t"), ("QA_GROUP_ID", "group")]).unwrap_err();
        assert!(err.to_string().contains("QA_GROUP_ID"));
    }
}
