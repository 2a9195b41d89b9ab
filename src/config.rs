use std::{env, str::FromStr, time::Duration};

use thiserror::Error;

use crate::{constants, model::Interval};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Runtime settings, read from the environment (and `.env` via dotenv).
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub http_timeout: Duration,
    pub interval: Interval,
    pub limit: u32,
    pub chart_size: (u32, u32),
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: constants::BINANCE_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(constants::HTTP_TIMEOUT_SECS),
            interval: Interval::Week1,
            limit: constants::KLINE_LIMIT,
            chart_size: (constants::CHART_WIDTH, constants::CHART_HEIGHT),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();

        let base_url = lookup("BINANCE_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);

        let timeout_secs: u64 = parse_or("HTTP_TIMEOUT_SECS", &lookup, constants::HTTP_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "HTTP_TIMEOUT_SECS",
                reason: "must be greater than zero".into(),
            });
        }

        let interval = match lookup("KLINE_INTERVAL") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::InvalidValue {
                key: "KLINE_INTERVAL",
                reason,
            })?,
            None => defaults.interval,
        };

        let limit = check_limit(parse_or("KLINE_LIMIT", &lookup, constants::KLINE_LIMIT)?)
            .map_err(|reason| ConfigError::InvalidValue {
                key: "KLINE_LIMIT",
                reason,
            })?;

        let width = parse_or("CHART_WIDTH", &lookup, constants::CHART_WIDTH)?;
        let height = parse_or("CHART_HEIGHT", &lookup, constants::CHART_HEIGHT)?;

        Ok(Settings {
            base_url,
            http_timeout: Duration::from_secs(timeout_secs),
            interval,
            limit,
            chart_size: (width, height),
        })
    }
}

/// Validates a kline count against the exchange's bounds.
pub fn check_limit(limit: u32) -> Result<u32, String> {
    if (1..=constants::KLINE_LIMIT_MAX).contains(&limit) {
        Ok(limit)
    } else {
        Err(format!(
            "limit {} outside 1..={}",
            limit,
            constants::KLINE_LIMIT_MAX
        ))
    }
}

fn parse_or<T, F>(key: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key,
                reason: e.to_string(),
            }),
        None => Ok(default),
    }
}
