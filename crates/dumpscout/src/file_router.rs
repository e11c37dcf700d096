//! Path routing: classify a dump file path into a table identity
//!
//! Rules are evaluated in order and the first matching rule decides. A rule of
//! type `ignore` swallows the path; no matching rule means the same.

use crate::config::FileRouteRule;
use crate::error::RuleError;
use crate::patterns::path_glob_to_regex;
use crate::types::{Compression, FileKind, TableName};
use regex::{Captures, Regex};

/// Width numeric sort keys are zero-padded to, so string order is numeric order.
const SORT_KEY_WIDTH: usize = 20;

/// Classification of one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteResult {
    pub name: TableName,
    pub kind: FileKind,
    pub compression: Compression,
    pub sort_key: String,
}

/// Maps a path to its owner identity, or `None` to ignore the file.
pub trait PathRouter: Send + Sync {
    fn route(&self, path: &str) -> Result<Option<RouteResult>, RuleError>;
}

/// Built-in rules for the mydumper naming convention:
///
/// ```text
/// db    -- {db}-schema-create.sql
/// table -- {db}.{table}-schema.sql
/// data  -- {db}.{table}.{part}.{sql|csv|parquet}[.{codec}] / {db}.{table}.{sql|csv|parquet}
/// ```
pub fn default_file_rules() -> Vec<FileRouteRule> {
    vec![
        FileRouteRule {
            pattern: Some(r"(?i).*(-schema-trigger|-schema-post)\.sql$".to_string()),
            kind: "ignore".to_string(),
            ..Default::default()
        },
        FileRouteRule {
            pattern: Some(r"(?i)^(?:[^/]*/)*([^/.]+)-schema-create\.sql$".to_string()),
            schema: "${1}".to_string(),
            kind: "schema-schema".to_string(),
            ..Default::default()
        },
        FileRouteRule {
            pattern: Some(r"(?i)^(?:[^/]*/)*([^/.]+)\.(.*?)-schema\.sql$".to_string()),
            schema: "${1}".to_string(),
            table: "${2}".to_string(),
            kind: "table-schema".to_string(),
            ..Default::default()
        },
        FileRouteRule {
            pattern: Some(
                r"(?i)^(?:[^/]*/)*([^/.]+)\.(.*?)(?:\.([0-9]+))?\.(sql|csv|parquet)(?:\.(\w+))?$"
                    .to_string(),
            ),
            schema: "${1}".to_string(),
            table: "${2}".to_string(),
            kind: "${4}".to_string(),
            key: "${3}".to_string(),
            compression: "${5}".to_string(),
            ..Default::default()
        },
    ]
}

struct CompiledRule {
    regex: Regex,
    rule: FileRouteRule,
}

impl CompiledRule {
    fn compile(rule: &FileRouteRule) -> Result<Self, RuleError> {
        let source = match (&rule.pattern, &rule.path) {
            (Some(pattern), None) => pattern.clone(),
            (None, Some(path)) => path_glob_to_regex(path)?,
            _ => return Err(RuleError::MissingPattern),
        };
        let regex = Regex::new(&source).map_err(|e| RuleError::InvalidPattern {
            pattern: source.clone(),
            message: e.to_string(),
        })?;
        Ok(Self {
            regex,
            rule: rule.clone(),
        })
    }

    fn apply(&self, caps: &Captures<'_>) -> Result<Option<RouteResult>, RuleError> {
        let expand = |template: &str| {
            let mut out = String::new();
            caps.expand(template, &mut out);
            out
        };

        let kind = expand(&self.rule.kind);
        if kind.eq_ignore_ascii_case("ignore") {
            return Ok(None);
        }
        let kind = FileKind::parse(&kind).ok_or(RuleError::UnknownFileType(kind))?;
        let compression = expand(&self.rule.compression);
        let compression =
            Compression::parse(&compression).ok_or(RuleError::UnknownCompression(compression))?;

        let name = match kind {
            FileKind::DatabaseSchema => TableName::schema_only(expand(&self.rule.schema)),
            _ => TableName::new(expand(&self.rule.schema), expand(&self.rule.table)),
        };

        Ok(Some(RouteResult {
            name,
            kind,
            compression,
            sort_key: normalize_sort_key(expand(&self.rule.key)),
        }))
    }
}

/// Zero-pad purely numeric keys so that part 2 sorts before part 10.
fn normalize_sort_key(key: String) -> String {
    if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
        format!("{:0>width$}", key, width = SORT_KEY_WIDTH)
    } else {
        key
    }
}

/// Regex/glob rule based [`PathRouter`]
pub struct FileRouter {
    rules: Vec<CompiledRule>,
}

impl FileRouter {
    /// Compile `rules`, optionally followed by [`default_file_rules`].
    pub fn new(rules: &[FileRouteRule], include_defaults: bool) -> Result<Self, RuleError> {
        let defaults = if include_defaults {
            default_file_rules()
        } else {
            Vec::new()
        };
        let rules = rules
            .iter()
            .chain(defaults.iter())
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Router with only the built-in mydumper rules.
    pub fn mydumper() -> Result<Self, RuleError> {
        Self::new(&[], true)
    }
}

impl PathRouter for FileRouter {
    fn route(&self, path: &str) -> Result<Option<RouteResult>, RuleError> {
        for rule in &self.rules {
            if let Some(caps) = rule.regex.captures(path) {
                return rule.apply(&caps);
            }
        }
        Ok(None)
    }
}
