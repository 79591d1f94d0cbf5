// Runtime configuration, read once from the environment at startup.
// `.env` is loaded by main before this runs, so either source works.

use crate::core::roles::{TierParseError, TierTable};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DB_PATH: &str = "points_db.json";
const DEFAULT_LOG_FILE: &str = "bot_logs.txt";
const DEFAULT_LEADERBOARD_CHANNEL: u64 = 711250866581274624;
const DEFAULT_ANNOUNCE_CHANNEL: u64 = 706503185266769993;
const DEFAULT_AWARD_INTERVAL_SECS: u64 = 60;
const DEFAULT_GRANT_DEBOUNCE_SECS: u64 = 600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.")]
    MissingToken,

    #[error("{name} must be a number, got `{value}`")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("Invalid ROLE_TIERS: {0}")]
    Tiers(#[from] TierParseError),
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub http_port: u16,
    pub db_path: String,
    pub log_file: String,
    pub leaderboard_channel_id: u64,
    /// `None` turns tier announcements off.
    pub announce_channel_id: Option<u64>,
    pub award_interval: Duration,
    pub grant_debounce: Duration,
    pub tiers: TierTable,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let token = var("DISCORD_TOKEN").ok_or(ConfigError::MissingToken)?;

        let tiers = match var("ROLE_TIERS") {
            Some(raw) => TierTable::parse(&raw)?,
            None => TierTable::clan_ranks(),
        };

        let announce_channel_id =
            Some(number(&var, "ANNOUNCE_CHANNEL_ID", DEFAULT_ANNOUNCE_CHANNEL)?).filter(|id| *id != 0);

        let award_interval_secs = number(&var, "AWARD_INTERVAL_SECS", DEFAULT_AWARD_INTERVAL_SECS)?;
        if award_interval_secs == 0 {
            return Err(ConfigError::Zero("AWARD_INTERVAL_SECS"));
        }

        Ok(Self {
            token,
            http_port: number(&var, "PORT", DEFAULT_PORT)?,
            db_path: var("POINTS_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            log_file: var("BOT_LOG_FILE").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
            leaderboard_channel_id: number(
                &var,
                "LEADERBOARD_CHANNEL_ID",
                DEFAULT_LEADERBOARD_CHANNEL,
            )?,
            announce_channel_id,
            award_interval: Duration::from_secs(award_interval_secs),
            grant_debounce: Duration::from_secs(number(
                &var,
                "GRANT_DEBOUNCE_SECS",
                DEFAULT_GRANT_DEBOUNCE_SECS,
            )?),
            tiers,
        })
    }
}

fn number<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_token_is_set() {
        let config = config_from(&[("DISCORD_TOKEN", "abc")]).unwrap();

        assert_eq!(config.token, "abc");
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.db_path, "points_db.json");
        assert_eq!(config.log_file, "bot_logs.txt");
        assert_eq!(config.award_interval, Duration::from_secs(60));
        assert_eq!(config.announce_channel_id, Some(DEFAULT_ANNOUNCE_CHANNEL));
        assert_eq!(config.tiers, TierTable::clan_ranks());
    }

    #[test]
    fn missing_or_blank_token_is_fatal() {
        assert!(matches!(config_from(&[]), Err(ConfigError::MissingToken)));
        assert!(matches!(
            config_from(&[("DISCORD_TOKEN", "  ")]),
            Err(ConfigError::MissingToken)
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("PORT", "3000"),
            ("ANNOUNCE_CHANNEL_ID", "0"),
            ("AWARD_INTERVAL_SECS", "5"),
            ("ROLE_TIERS", "10:1:Rookie"),
        ])
        .unwrap();

        assert_eq!(config.http_port, 3000);
        assert_eq!(config.announce_channel_id, None);
        assert_eq!(config.award_interval, Duration::from_secs(5));
        assert_eq!(config.tiers.len(), 1);
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = config_from(&[("DISCORD_TOKEN", "abc"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { name: "PORT", .. }));

        let err = config_from(&[("DISCORD_TOKEN", "abc"), ("AWARD_INTERVAL_SECS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Zero("AWARD_INTERVAL_SECS")));

        let err = config_from(&[("DISCORD_TOKEN", "abc"), ("ROLE_TIERS", "oops")]).unwrap_err();
        assert!(matches!(err, ConfigError::Tiers(_)));
    }
}
