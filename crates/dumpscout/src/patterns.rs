//! Shared wildcard pattern helpers for filters, routes and path rules.

use crate::error::RuleError;
use globset::{GlobBuilder, GlobMatcher};

/// Build a matcher for a schema or table name wildcard (`*`, `?`, `[...]`).
pub fn build_name_matcher(pattern: &str, case_insensitive: bool) -> Result<GlobMatcher, RuleError> {
    GlobBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .literal_separator(false)
        .backslash_escape(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| RuleError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.kind().to_string(),
        })
}

/// Translate a path glob into an anchored regex source.
///
/// - `**` matches across directories, `*` and `?` stay within one segment
/// - `{name}` captures part of a segment as the named group `name`
/// - everything else matches literally
pub fn path_glob_to_regex(glob: &str) -> Result<String, RuleError> {
    let invalid = |message: &str| RuleError::InvalidPattern {
        pattern: glob.to_string(),
        message: message.to_string(),
    };

    let mut out = String::from("^");
    let mut chars = glob.trim_start_matches('/').chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("(?:[^/]*/)*");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) if c.is_ascii_alphanumeric() || c == '_' => name.push(c),
                        Some(_) => return Err(invalid("placeholder names must be alphanumeric")),
                        None => return Err(invalid("unclosed placeholder")),
                    }
                }
                if name.is_empty() {
                    return Err(invalid("empty placeholder"));
                }
                out.push_str(&format!("(?P<{name}>[^/]*?)"));
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    Ok(out)
}
