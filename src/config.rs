//! User configuration from `~/.filterq/rc`
//!
//! The rc file holds `key=value` lines; `#` starts a comment. `FILTERQ_RC`
//! points at a different file.

use anyhow::{Context, Result};
use log::warn;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const RC_ENV: &str = "FILTERQ_RC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Quiet period before a suggestion request fires
    pub debounce: Duration,
    pub suggest_limit: usize,
    /// Column names offered by local suggestions
    pub columns: Vec<String>,
    /// Emit JSON by default
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(250),
            suggest_limit: 10,
            columns: Vec::new(),
            json: false,
        }
    }
}

impl Config {
    /// Path of the rc file: `$FILTERQ_RC`, else `~/.filterq/rc`
    pub fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(RC_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|home| home.join(".filterq").join("rc"))
    }

    /// Load the rc file, falling back to defaults when there is none
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Ok(Self::parse(&content, path))
    }

    /// Parse rc content. Bad lines are warned about and skipped.
    pub fn parse(content: &str, origin: &Path) -> Self {
        let mut config = Self::default();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                warn!("{}:{}: ignoring line without '='", origin.display(), number + 1);
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            let applied = match key {
                "editor.debounce_ms" => value.parse().map(|ms| config.debounce = Duration::from_millis(ms)).is_ok(),
                "suggest.limit" => value.parse().map(|limit| config.suggest_limit = limit).is_ok(),
                "suggest.columns" => {
                    config.columns = split_list(value);
                    true
                }
                "output.json" => parse_bool(value).map(|json| config.json = json).is_some(),
                _ => {
                    warn!("{}:{}: unknown key '{}'", origin.display(), number + 1, key);
                    continue;
                }
            };
            if !applied {
                warn!("{}:{}: invalid value '{}' for {}", origin.display(), number + 1, value, key);
            }
        }

        config
    }
}

/// Split a comma-separated list, dropping blanks
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_keys() {
        let content = "\
# editor settings
editor.debounce_ms = 100
suggest.limit=5
suggest.columns=host, service,,state
output.json=yes
";
        let config = Config::parse(content, Path::new("rc"));
        assert_eq!(config.debounce, Duration::from_millis(100));
        assert_eq!(config.suggest_limit, 5);
        assert_eq!(config.columns, vec!["host", "service", "state"]);
        assert!(config.json);
    }

    #[test]
    fn test_bad_lines_keep_defaults() {
        let content = "editor.debounce_ms=soon\ncolor=red\nnot a setting\n";
        assert_eq!(Config::parse(content, Path::new("rc")), Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let rc = temp_dir.path().join("rc");
        fs::write(&rc, "suggest.limit=3\n").unwrap();
        let config = Config::load_from(&rc).unwrap();
        assert_eq!(config.suggest_limit, 3);

        assert!(Config::load_from(&temp_dir.path().join("missing")).is_err());
    }
}
