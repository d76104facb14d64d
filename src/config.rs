use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use tracing::warn;

use crate::limits::*;

/// Runtime settings, read from `STAYCART_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub booking_prefix: String,
    pub debounce: Duration,
    pub timeout: Duration,
    pub utc_offset_minutes: i32,
    pub metrics_port: Option<u16>,
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            booking_prefix: DEFAULT_BOOKING_PREFIX.into(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            metrics_port: None,
            token: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable numbers fall back to defaults
    /// with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            api_url: lookup("STAYCART_API_URL").unwrap_or(defaults.api_url),
            booking_prefix: lookup("STAYCART_BOOKING_PREFIX").unwrap_or(defaults.booking_prefix),
            debounce: Duration::from_millis(parse_or(&lookup, "STAYCART_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS)),
            timeout: Duration::from_millis(parse_or(&lookup, "STAYCART_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)),
            utc_offset_minutes: parse_or(&lookup, "STAYCART_UTC_OFFSET_MINUTES", DEFAULT_UTC_OFFSET_MINUTES),
            metrics_port: parse_opt(&lookup, "STAYCART_METRICS_PORT"),
            token: lookup("STAYCART_TOKEN").filter(|t| !t.is_empty()),
        }
    }

    /// Hotel offset; out-of-range minutes fall back to UTC.
    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                warn!(minutes = self.utc_offset_minutes, "invalid UTC offset, using UTC");
                Utc.fix()
            })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    parse_opt(lookup, key).unwrap_or(default)
}

/// `None` when unset or unparseable; the latter is logged.
fn parse_opt<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "unparseable setting, using default");
            None
        }
    }
}
