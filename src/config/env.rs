//! Typed reads over an environment-like key lookup.

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Source of configuration values. `from_process` reads the real
/// environment; tests build one from a map.
pub struct EnvReader {
    lookup: Box<dyn Fn(&str) -> Option<String> + Send + Sync>,
}

impl EnvReader {
    pub fn from_process() -> Self {
        Self {
            lookup: Box::new(|key| env::var(key).ok()),
        }
    }

    pub fn from_map<K: Into<String>, V: Into<String>>(
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        let map: HashMap<String, String> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            lookup: Box::new(move |key| map.get(key).cloned()),
        }
    }

    /// Trimmed value; empty counts as unset
    pub fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.string(key) {
            Some(raw) => raw
                .parse::<T>()
                .map_err(|e| anyhow!("Failed to parse {}={:?}: {}", key, raw, e)),
            None => Ok(default),
        }
    }

    /// Accepts true/false/1/0/yes/no
    pub fn flag(&self, key: &str, default: bool) -> Result<bool> {
        match self.string(key).map(|v| v.to_lowercase()) {
            None => Ok(default),
            Some(v) => match v.as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(anyhow!("Failed to parse {}={:?}: expected a boolean", key, v)),
            },
        }
    }

    /// Comma separated, blanks dropped
    pub fn list(&self, key: &str, default: &[&str]) -> Vec<String> {
        match self.string(key) {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => default.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_blank_keys_use_default() {
        let env = EnvReader::from_map([("INTERVAL_MS", "  ")]);
        assert_eq!(env.parse::<u64>("INTERVAL_MS", 60_000).unwrap(), 60_000);
        assert_eq!(env.parse::<u64>("OTHER", 7).unwrap(), 7);
    }

    #[test]
    fn test_parse_error_names_the_key() {
        let env = EnvReader::from_map([("CANDLE_LIMIT", "many")]);
        let err = env.parse::<usize>("CANDLE_LIMIT", 100).unwrap_err();
        assert!(err.to_string().contains("CANDLE_LIMIT"));
    }

    #[test]
    fn test_flag_and_list() {
        let env = EnvReader::from_map([("DRY_RUN", "No"), ("SYMBOLS", "BTCUSDT, ,eth/usdt")]);
        assert!(!env.flag("DRY_RUN", true).unwrap());
        assert_eq!(env.list("SYMBOLS", &[]), vec!["BTCUSDT", "eth/usdt"]);
        assert_eq!(env.list("MISSING", &["A"]), vec!["A"]);

        let bad = EnvReader::from_map([("DRY_RUN", "maybe")]);
        assert!(bad.flag("DRY_RUN", true).is_err());
    }
}
