//! Runtime configuration resolved from the environment.

use std::path::PathBuf;

pub const API_URL_ENV: &str = "TODO_API_URL";
pub const DATA_DIR_ENV: &str = "TODO_DATA_DIR";
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to.
    pub api_url: String,
    /// Directory holding the persisted token.
    pub data_dir: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            api_url: get(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            data_dir: get(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(Self::default_data_dir),
        }
    }

    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("todo-client")
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset_or_blank() {
        let config = ClientConfig::from_lookup(|key| (key == API_URL_ENV).then(|| "  ".to_string()));
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.data_dir, ClientConfig::default_data_dir());
    }

    #[test]
    fn overrides_are_read() {
        let config = ClientConfig::from_lookup(|key| match key {
            API_URL_ENV => Some("http://127.0.0.1:9999/api".to_string()),
            DATA_DIR_ENV => Some("/tmp/todo".to_string()),
            _ => None,
        });
        assert_eq!(config.api_url, "http://127.0.0.1:9999/api");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/todo"));
    }
}
