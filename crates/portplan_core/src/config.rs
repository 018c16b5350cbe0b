//! Report configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use crate::report::projector::ProjectorSettings;
use crate::schema::portfolio::HIDDEN_TABLES;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_COLUMNS: &[&str] = &[
    "name",
    "abstract",
    "maturity",
    "drivers",
    "latest_dispositions",
    "flavor",
];

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Report columns used when a request names none.
    pub default_columns: Vec<String>,
    pub page_length: usize,
    /// Text longer than this many characters is truncated in reports.
    pub truncate_at: usize,
    /// Tables never offered to the resolver.
    pub hidden_tables: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_columns: DEFAULT_COLUMNS.iter().map(|key| key.to_string()).collect(),
            page_length: 25,
            truncate_at: 100,
            hidden_tables: HIDDEN_TABLES.iter().map(|table| table.to_string()).collect(),
        }
    }
}

impl ReportConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn projector_settings(&self) -> ProjectorSettings {
        ProjectorSettings {
            page_length: self.page_length,
            truncate_at: self.truncate_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ReportConfig;

    #[test]
    fn empty_object_yields_defaults() {
        let config = ReportConfig::from_json_str("{}").expect("empty config parses");
        assert_eq!(config, ReportConfig::default());
        assert_eq!(config.page_length, 25);
        assert_eq!(config.hidden_tables, vec!["fiscalyears", "user"]);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = ReportConfig::from_json_str(r#"{"default_columns": ["name", "sponsor"]}"#)
            .expect("partial config parses");
        assert_eq!(config.default_columns, vec!["name", "sponsor"]);
        assert_eq!(config.truncate_at, 100);
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(ReportConfig::from_json_str("{page_length: }").is_err());
    }
}
