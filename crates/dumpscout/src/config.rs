//! Configuration for topology discovery
//!
//! Parsed from TOML. The binary layers command-line overrides on top before
//! calling [`DiscoveryConfig::validate`].

use crate::error::{DiscoveryError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Filter applied when `source.filter` is not configured: every table except
/// those in system schemas.
pub const DEFAULT_FILTER: &[&str] = &[
    "*.*",
    "!mysql.*",
    "!sys.*",
    "!INFORMATION_SCHEMA.*",
    "!PERFORMANCE_SCHEMA.*",
    "!METRICS_SCHEMA.*",
    "!INSPECTION_SCHEMA.*",
];

/// Main configuration for discovery
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub source: SourceConfig,

    /// Legacy do/ignore lists; take precedence over `source.filter` when set
    #[serde(default)]
    pub black_white_list: ReplicationRules,

    /// Legacy table renaming rules
    #[serde(default)]
    pub routes: Vec<TableRouteRule>,
}

/// Where the dump lives and how to read it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root directory of the dump
    #[serde(default)]
    pub dir: String,

    /// Accept data files without schema declarations
    #[serde(default)]
    pub no_schema: bool,

    /// Character set of schema files: auto, utf8mb4, latin1 or binary
    #[serde(default = "default_character_set")]
    pub character_set: String,

    #[serde(default)]
    pub case_sensitive: bool,

    /// Append the built-in mydumper naming rules after `files`.
    /// Defaults to on when no `files` rules are given.
    #[serde(default)]
    pub default_file_rules: Option<bool>,

    /// New-style table filter rules
    #[serde(default)]
    pub filter: Option<Vec<String>>,

    /// Path routing rules
    #[serde(default)]
    pub files: Vec<FileRouteRule>,
}

fn default_character_set() -> String {
    "auto".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            no_schema: false,
            character_set: default_character_set(),
            case_sensitive: false,
            default_file_rules: None,
            filter: None,
            files: Vec::new(),
        }
    }
}

impl SourceConfig {
    pub fn uses_default_file_rules(&self) -> bool {
        self.default_file_rules.unwrap_or(self.files.is_empty())
    }

    pub fn filter_rules(&self) -> Vec<String> {
        match &self.filter {
            Some(rules) => rules.clone(),
            None => DEFAULT_FILTER.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Maps a path to a table identity.
///
/// Exactly one of `pattern` (regex) or `path` (glob) must be set. The other
/// fields are templates expanded with the match's captures (`$1`, `${name}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRouteRule {
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub table: String,
    /// schema-schema, table-schema, sql, csv, parquet or ignore
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub compression: String,
}

/// Renames tables matching the patterns. An empty `table_pattern` makes a
/// schema-level rule; an empty `target_table` keeps the table name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRouteRule {
    pub schema_pattern: String,
    #[serde(default)]
    pub table_pattern: String,
    pub target_schema: String,
    #[serde(default)]
    pub target_table: String,
}

/// Legacy MySQL-replication style filter lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationRules {
    #[serde(default)]
    pub do_dbs: Vec<String>,
    #[serde(default)]
    pub ignore_dbs: Vec<String>,
    #[serde(default)]
    pub do_tables: Vec<TableRule>,
    #[serde(default)]
    pub ignore_tables: Vec<TableRule>,
}

impl ReplicationRules {
    pub fn is_empty(&self) -> bool {
        self.do_dbs.is_empty()
            && self.ignore_dbs.is_empty()
            && self.do_tables.is_empty()
            && self.ignore_tables.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRule {
    pub db_name: String,
    pub tbl_name: String,
}

/// Character set used to decode extracted schema text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterSet {
    /// UTF-8 when valid, latin1 otherwise. GB18030 input is not detected and
    /// decodes as latin1.
    #[default]
    Auto,
    Utf8mb4,
    Latin1,
    /// Bytes passed through, invalid UTF-8 replaced
    Binary,
}

impl CharacterSet {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "" | "auto" => Some(Self::Auto),
            "utf8mb4" | "utf8" => Some(Self::Utf8mb4),
            "latin1" => Some(Self::Latin1),
            "binary" => Some(Self::Binary),
            _ => None,
        }
    }
}

impl DiscoveryConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DiscoveryError::Config(e.to_string()))
    }

    pub fn has_legacy_black_white_list(&self) -> bool {
        !self.black_white_list.is_empty()
    }

    pub fn character_set(&self) -> Result<CharacterSet> {
        CharacterSet::parse(&self.source.character_set).ok_or_else(|| {
            DiscoveryError::Config(format!(
                "unsupported character set '{}'",
                self.source.character_set
            ))
        })
    }

    /// Reject incompatible combinations before discovery starts.
    pub fn validate(&self) -> Result<()> {
        if !self.routes.is_empty() && !self.source.files.is_empty() {
            return Err(DiscoveryError::ConfigurationConflict(
                "table route is deprecated, can't config both [routes] and [source.files]"
                    .to_string(),
            ));
        }
        if self.has_legacy_black_white_list() && self.source.filter.is_some() {
            return Err(DiscoveryError::ConfigurationConflict(
                "`source.filter` and `black_white_list` cannot be configured at the same time"
                    .to_string(),
            ));
        }
        self.character_set()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiscoveryConfig::default();
        assert!(!config.source.no_schema);
        assert!(config.source.uses_default_file_rules());
        assert_eq!(config.source.filter_rules().len(), DEFAULT_FILTER.len());
        assert_eq!(config.character_set().unwrap(), CharacterSet::Auto);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_toml() {
        let config = DiscoveryConfig::from_toml(
            r#"
            [source]
            dir = "/data/dump"
            no_schema = true
            character_set = "latin1"
            filter = ["shop.*"]

            [[source.files]]
            pattern = '^(\w+)\.(\w+)\.csv$'
            schema = "$1"
            table = "$2"
            type = "csv"
            "#,
        )
        .unwrap();
        assert_eq!(config.source.dir, "/data/dump");
        assert!(config.source.no_schema);
        assert_eq!(config.character_set().unwrap(), CharacterSet::Latin1);
        assert_eq!(config.source.files.len(), 1);
        assert_eq!(config.source.files[0].kind, "csv");
        assert!(!config.source.uses_default_file_rules());
    }

    #[test]
    fn test_routes_and_file_rules_conflict() {
        let mut config = DiscoveryConfig::default();
        config.routes.push(TableRouteRule {
            schema_pattern: "a".to_string(),
            target_schema: "b".to_string(),
            ..Default::default()
        });
        config.validate().unwrap();

        config.source.files.push(FileRouteRule {
            path: Some("*.sql".to_string()),
            kind: "sql".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            config.validate(),
            Err(DiscoveryError::ConfigurationConflict(_))
        ));
    }

    #[test]
    fn test_legacy_list_and_filter_conflict() {
        let mut config = DiscoveryConfig::default();
        config.black_white_list.do_dbs.push("shop".to_string());
        config.validate().unwrap();

        config.source.filter = Some(vec!["*.*".to_string()]);
        assert!(matches!(
            config.validate(),
            Err(DiscoveryError::ConfigurationConflict(_))
        ));
    }

    #[test]
    fn test_unsupported_character_set() {
        let mut config = DiscoveryConfig::default();
        config.source.character_set = "gbk".to_string();
        assert!(matches!(config.validate(), Err(DiscoveryError::Config(_))));
    }
}
