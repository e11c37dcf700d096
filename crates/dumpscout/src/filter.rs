//! Schema/table name filters
//!
//! Two rule syntaxes are supported: the new-style [`TableFilter`]
//! (`schema.table` wildcards, last match wins) and the legacy
//! [`ReplicationFilter`] (do/ignore lists). Both are case sensitive;
//! wrap them in [`CaseInsensitive`] to fold case.

use crate::config::{ReplicationRules, TableRule};
use crate::error::RuleError;
use crate::patterns::build_name_matcher;
use globset::GlobMatcher;

/// Predicate over schema and table identities.
pub trait NameFilter: Send + Sync {
    fn match_schema(&self, schema: &str) -> bool;
    fn match_table(&self, schema: &str, table: &str) -> bool;
}

/// A filter that can rebuild itself with lowercased patterns.
pub trait FoldCase: Sized {
    fn fold_case(&self) -> Result<Self, RuleError>;
}

// ============================================================================
// New-style rules
// ============================================================================

#[derive(Debug, Clone)]
struct Pattern {
    raw: String,
    matcher: GlobMatcher,
}

impl Pattern {
    fn new(raw: &str) -> Result<Self, RuleError> {
        Ok(Self {
            raw: raw.to_string(),
            matcher: build_name_matcher(raw, false)?,
        })
    }

    fn is_match(&self, name: &str) -> bool {
        self.matcher.is_match(name)
    }

    fn matches_everything(&self) -> bool {
        self.raw == "*"
    }
}

#[derive(Debug, Clone)]
struct FilterRule {
    positive: bool,
    schema: Pattern,
    table: Pattern,
}

impl FilterRule {
    fn parse(line: &str) -> Result<Self, RuleError> {
        let (positive, body) = match line.strip_prefix('!') {
            Some(rest) => (false, rest.trim()),
            None => (true, line),
        };
        let (schema, table) = body.split_once('.').ok_or_else(|| RuleError::InvalidPattern {
            pattern: line.to_string(),
            message: "expected `schema.table`".to_string(),
        })?;
        Ok(Self {
            positive,
            schema: Pattern::new(schema)?,
            table: Pattern::new(table)?,
        })
    }

    fn to_line(&self) -> String {
        let prefix = if self.positive { "" } else { "!" };
        format!("{}{}.{}", prefix, self.schema.raw, self.table.raw)
    }
}

/// New-style filter: `schema.table` wildcard rules, `!` negates, the last
/// matching rule decides. Blank lines and `#` comments are skipped.
#[derive(Debug, Clone)]
pub struct TableFilter {
    rules: Vec<FilterRule>,
}

impl TableFilter {
    pub fn parse<S: AsRef<str>>(rules: &[S]) -> Result<Self, RuleError> {
        let rules = rules
            .iter()
            .map(|line| line.as_ref().trim())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(FilterRule::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }
}

impl NameFilter for TableFilter {
    fn match_schema(&self, schema: &str) -> bool {
        // A negative rule only excludes a schema when it covers every table.
        self.rules
            .iter()
            .rev()
            .find(|rule| {
                rule.schema.is_match(schema) && (rule.positive || rule.table.matches_everything())
            })
            .map(|rule| rule.positive)
            .unwrap_or(false)
    }

    fn match_table(&self, schema: &str, table: &str) -> bool {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.schema.is_match(schema) && rule.table.is_match(table))
            .map(|rule| rule.positive)
            .unwrap_or(false)
    }
}

impl FoldCase for TableFilter {
    fn fold_case(&self) -> Result<Self, RuleError> {
        let lines: Vec<String> = self
            .rules
            .iter()
            .map(|rule| rule.to_line().to_lowercase())
            .collect();
        Self::parse(&lines)
    }
}

// ============================================================================
// Legacy do/ignore lists
// ============================================================================

#[derive(Debug, Clone)]
struct TablePattern {
    db: Pattern,
    table: Pattern,
}

/// Legacy replication-style filter built from [`ReplicationRules`].
#[derive(Debug, Clone)]
pub struct ReplicationFilter {
    rules: ReplicationRules,
    do_dbs: Vec<Pattern>,
    ignore_dbs: Vec<Pattern>,
    do_tables: Vec<TablePattern>,
    ignore_tables: Vec<TablePattern>,
}

impl ReplicationFilter {
    pub fn new(rules: &ReplicationRules) -> Result<Self, RuleError> {
        let dbs = |list: &[String]| {
            list.iter()
                .map(|p| Pattern::new(p))
                .collect::<Result<Vec<_>, _>>()
        };
        let tables = |list: &[TableRule]| {
            list.iter()
                .map(|rule| {
                    Ok(TablePattern {
                        db: Pattern::new(&rule.db_name)?,
                        table: Pattern::new(&rule.tbl_name)?,
                    })
                })
                .collect::<Result<Vec<_>, RuleError>>()
        };
        Ok(Self {
            rules: rules.clone(),
            do_dbs: dbs(&rules.do_dbs)?,
            ignore_dbs: dbs(&rules.ignore_dbs)?,
            do_tables: tables(&rules.do_tables)?,
            ignore_tables: tables(&rules.ignore_tables)?,
        })
    }
}

impl NameFilter for ReplicationFilter {
    fn match_schema(&self, schema: &str) -> bool {
        if !self.do_dbs.is_empty() || !self.do_tables.is_empty() {
            return self.do_dbs.iter().any(|p| p.is_match(schema))
                || self.do_tables.iter().any(|t| t.db.is_match(schema));
        }
        !self.ignore_dbs.iter().any(|p| p.is_match(schema))
    }

    fn match_table(&self, schema: &str, table: &str) -> bool {
        if !self.match_schema(schema) {
            return false;
        }
        let mut scoped = self
            .do_tables
            .iter()
            .filter(|t| t.db.is_match(schema))
            .peekable();
        if scoped.peek().is_some() {
            return scoped.any(|t| t.table.is_match(table));
        }
        !self
            .ignore_tables
            .iter()
            .any(|t| t.db.is_match(schema) && t.table.is_match(table))
    }
}

impl FoldCase for ReplicationFilter {
    fn fold_case(&self) -> Result<Self, RuleError> {
        let lower = |list: &[String]| list.iter().map(|s| s.to_lowercase()).collect::<Vec<_>>();
        let lower_tables = |list: &[TableRule]| {
            list.iter()
                .map(|rule| TableRule {
                    db_name: rule.db_name.to_lowercase(),
                    tbl_name: rule.tbl_name.to_lowercase(),
                })
                .collect::<Vec<_>>()
        };
        Self::new(&ReplicationRules {
            do_dbs: lower(&self.rules.do_dbs),
            ignore_dbs: lower(&self.rules.ignore_dbs),
            do_tables: lower_tables(&self.rules.do_tables),
            ignore_tables: lower_tables(&self.rules.ignore_tables),
        })
    }
}

// ============================================================================
// Case folding adapter
// ============================================================================

/// Matches names case-insensitively by lowercasing patterns once and
/// inputs on every call.
#[derive(Debug, Clone)]
pub struct CaseInsensitive<F> {
    inner: F,
}

impl<F: FoldCase> CaseInsensitive<F> {
    pub fn new(filter: F) -> Result<Self, RuleError> {
        Ok(Self {
            inner: filter.fold_case()?,
        })
    }
}

impl<F: NameFilter> NameFilter for CaseInsensitive<F> {
    fn match_schema(&self, schema: &str) -> bool {
        self.inner.match_schema(&schema.to_lowercase())
    }

    fn match_table(&self, schema: &str, table: &str) -> bool {
        self.inner
            .match_table(&schema.to_lowercase(), &table.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FILTER;

    #[test]
    fn test_last_matching_rule_wins() {
        let filter = TableFilter::parse(&["*.*", "!shop.audit*", "shop.audit_keep"]).unwrap();
        assert!(filter.match_table("shop", "orders"));
        assert!(!filter.match_table("shop", "audit_log"));
        assert!(filter.match_table("shop", "audit_keep"));
    }

    #[test]
    fn test_match_schema_ignores_partial_negations() {
        let filter = TableFilter::parse(&["*.*", "!shop.audit", "!tmp.*"]).unwrap();
        assert!(filter.match_schema("shop"));
        assert!(!filter.match_schema("tmp"));
    }

    #[test]
    fn test_default_filter_excludes_system_schemas() {
        let filter = TableFilter::parse(DEFAULT_FILTER).unwrap();
        assert!(filter.match_schema("shop"));
        assert!(!filter.match_schema("mysql"));
        assert!(!filter.match_table("sys", "x"));
        // Case sensitive: lowercase system schema names are not excluded
        assert!(filter.match_schema("information_schema"));
    }

    #[test]
    fn test_case_insensitive_adapter() {
        let filter = CaseInsensitive::new(TableFilter::parse(DEFAULT_FILTER).unwrap()).unwrap();
        assert!(!filter.match_schema("information_schema"));
        assert!(!filter.match_schema("MySQL"));

        let filter = CaseInsensitive::new(TableFilter::parse(&["Shop.Orders"]).unwrap()).unwrap();
        assert!(filter.match_table("SHOP", "orders"));
    }

    #[test]
    fn test_invalid_rules() {
        assert!(TableFilter::parse(&["no_dot"]).is_err());
        assert!(TableFilter::parse(&["db.[x"]).is_err());
        assert!(TableFilter::parse(&["# comment", "", "db.t"]).is_ok());
    }

    #[test]
    fn test_replication_do_lists() {
        let filter = ReplicationFilter::new(&ReplicationRules {
            do_dbs: vec!["shop".to_string()],
            do_tables: vec![TableRule {
                db_name: "crm".to_string(),
                tbl_name: "contacts".to_string(),
            }],
            ..Default::default()
        })
        .unwrap();
        assert!(filter.match_schema("shop"));
        assert!(filter.match_schema("crm"));
        assert!(!filter.match_schema("other"));
        assert!(filter.match_table("shop", "anything"));
        assert!(filter.match_table("crm", "contacts"));
        assert!(!filter.match_table("crm", "leads"));
    }

    #[test]
    fn test_replication_ignore_lists() {
        let filter = ReplicationFilter::new(&ReplicationRules {
            ignore_dbs: vec!["tmp*".to_string()],
            ignore_tables: vec![TableRule {
                db_name: "shop".to_string(),
                tbl_name: "audit".to_string(),
            }],
            ..Default::default()
        })
        .unwrap();
        assert!(!filter.match_schema("tmp_1"));
        assert!(filter.match_table("shop", "orders"));
        assert!(!filter.match_table("shop", "audit"));

        let folded = CaseInsensitive::new(filter).unwrap();
        assert!(!folded.match_table("SHOP", "Audit"));
    }
}
