//! Table renaming rules
//!
//! Table-level rules (with a `table_pattern`) take precedence over
//! schema-level rules. Matching more than one rule at the deciding level is an
//! error rather than a silent pick.

use crate::config::TableRouteRule;
use crate::error::RuleError;
use crate::patterns::build_name_matcher;
use globset::GlobMatcher;

/// Deterministic mapping from one (schema, table) identity to another.
pub trait TableRouter: Send + Sync {
    fn route(&self, schema: &str, table: &str) -> Result<(String, String), RuleError>;
}

struct CompiledRoute {
    schema: GlobMatcher,
    table: Option<GlobMatcher>,
    target_schema: String,
    target_table: String,
}

impl CompiledRoute {
    fn apply(&self, schema: &str, table: &str) -> (String, String) {
        let schema = if self.target_schema.is_empty() {
            schema
        } else {
            self.target_schema.as_str()
        };
        let table = if self.target_table.is_empty() {
            table
        } else {
            self.target_table.as_str()
        };
        (schema.to_string(), table.to_string())
    }
}

/// [`TableRouter`] built from `[[routes]]` configuration.
pub struct RuleTableRouter {
    table_rules: Vec<CompiledRoute>,
    schema_rules: Vec<CompiledRoute>,
}

impl RuleTableRouter {
    pub fn new(rules: &[TableRouteRule], case_sensitive: bool) -> Result<Self, RuleError> {
        let mut table_rules = Vec::new();
        let mut schema_rules = Vec::new();
        for rule in rules {
            let compiled = CompiledRoute {
                schema: build_name_matcher(&rule.schema_pattern, !case_sensitive)?,
                table: if rule.table_pattern.is_empty() {
                    None
                } else {
                    Some(build_name_matcher(&rule.table_pattern, !case_sensitive)?)
                },
                target_schema: rule.target_schema.clone(),
                target_table: rule.target_table.clone(),
            };
            if compiled.table.is_some() {
                table_rules.push(compiled);
            } else {
                schema_rules.push(compiled);
            }
        }
        Ok(Self {
            table_rules,
            schema_rules,
        })
    }
}

fn single<'a>(
    matched: Vec<&'a CompiledRoute>,
    level: &'static str,
) -> Result<Option<&'a CompiledRoute>, RuleError> {
    match matched.len() {
        0 => Ok(None),
        1 => Ok(matched.into_iter().next()),
        count => Err(RuleError::AmbiguousRoute { count, level }),
    }
}

impl TableRouter for RuleTableRouter {
    fn route(&self, schema: &str, table: &str) -> Result<(String, String), RuleError> {
        if !table.is_empty() {
            let matched: Vec<_> = self
                .table_rules
                .iter()
                .filter(|rule| {
                    rule.schema.is_match(schema)
                        && rule.table.as_ref().is_some_and(|t| t.is_match(table))
                })
                .collect();
            if let Some(rule) = single(matched, "table")? {
                return Ok(rule.apply(schema, table));
            }
        }

        let matched: Vec<_> = self
            .schema_rules
            .iter()
            .filter(|rule| rule.schema.is_match(schema))
            .collect();
        Ok(match single(matched, "schema")? {
            Some(rule) => rule.apply(schema, table),
            None => (schema.to_string(), table.to_string()),
        })
    }
}
