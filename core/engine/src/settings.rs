use std::path::PathBuf;

use crate::memory::DEFAULT_MAX_SESSIONS;

pub const DEFAULT_DB_PATH: &str = "querybot.db";
pub const DEFAULT_LEXICON_PATH: &str = "config/lexicon.json";
pub const DEFAULT_ADDR: &str = "127.0.0.1:5001";

/// Process settings, read from the environment at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub lexicon_path: PathBuf,
    pub addr: String,
    pub max_sessions: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            lexicon_path: PathBuf::from(DEFAULT_LEXICON_PATH),
            addr: DEFAULT_ADDR.to_string(),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl Settings {
    /// `QUERYBOT_DB_PATH`, `QUERYBOT_LEXICON`, `QUERYBOT_ADDR` and
    /// `QUERYBOT_MAX_SESSIONS`, each optional
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            db_path: lookup("QUERYBOT_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            lexicon_path: lookup("QUERYBOT_LEXICON")
                .map(PathBuf::from)
                .unwrap_or(defaults.lexicon_path),
            addr: lookup("QUERYBOT_ADDR").unwrap_or(defaults.addr),
            max_sessions: lookup("QUERYBOT_MAX_SESSIONS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_sessions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_lookup(|_| None);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.addr, "127.0.0.1:5001");
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(|key| match key {
            "QUERYBOT_DB_PATH" => Some("/tmp/q.db".to_string()),
            "QUERYBOT_ADDR" => Some("0.0.0.0:8080".to_string()),
            _ => None,
        });
        assert_eq!(settings.db_path, PathBuf::from("/tmp/q.db"));
        assert_eq!(settings.lexicon_path, PathBuf::from(DEFAULT_LEXICON_PATH));
        assert_eq!(settings.addr, "0.0.0.0:8080");
        assert_eq!(settings.max_sessions, DEFAULT_MAX_SESSIONS);
    }

    #[test]
    fn test_max_sessions() {
        let settings = Settings::from_lookup(|key| match key {
            "QUERYBOT_MAX_SESSIONS" => Some("25".to_string()),
            _ => None,
        });
        assert_eq!(settings.max_sessions, 25);

        let settings = Settings::from_lookup(|key| match key {
            "QUERYBOT_MAX_SESSIONS" => Some("lots".to_string()),
            _ => None,
        });
        assert_eq!(settings.max_sessions, DEFAULT_MAX_SESSIONS);
    }
}
