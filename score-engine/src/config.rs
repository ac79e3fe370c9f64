use std::env;
use std::path::PathBuf;

pub const DEFAULT_DATABASE_PATH: &str = "scoreboard.db";
pub const DATABASE_ENV: &str = "SCOREBOARD_DB";
pub const SEED_ENV: &str = "SCOREBOARD_SEED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_path: PathBuf,
    /// Load the built-in dataset when every table is empty.
    pub seed_on_empty: bool,
}

impl StoreConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            seed_on_empty: true,
        }
    }

    pub fn without_seed(mut self) -> Self {
        self.seed_on_empty = false;
        self
    }

    /// Reads `SCOREBOARD_DB` and `SCOREBOARD_SEED`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_path = lookup(DATABASE_ENV)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());
        let seed_on_empty = lookup(SEED_ENV)
            .and_then(|value| parse_flag(&value))
            .unwrap_or(true);
        Self {
            database_path: PathBuf::from(database_path),
            seed_on_empty,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE_PATH)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = StoreConfig::from_lookup(lookup(&[]));
        assert_eq!(config, StoreConfig::default());
        assert!(config.seed_on_empty);
    }

    #[test]
    fn test_environment_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            (DATABASE_ENV, "/tmp/night.db"),
            (SEED_ENV, "false"),
        ]));
        assert_eq!(config.database_path, PathBuf::from("/tmp/night.db"));
        assert!(!config.seed_on_empty);
    }

    #[test]
    fn test_unrecognised_seed_flag_keeps_default() {
        let config = StoreConfig::from_lookup(lookup(&[(SEED_ENV, "maybe"), (DATABASE_ENV, "  ")]));
        assert!(config.seed_on_empty);
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
    }
}
