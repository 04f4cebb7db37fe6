//! Query safety validator.
//!
//! Defense-in-depth denylist over generated SQL, not a parser. It cannot
//! catch every injection strategy (encoded keywords, DML smuggled through
//! exotic syntax); a stronger design would parse to an AST and whitelist
//! node types. Known limitation, kept deliberately: the gate only decides,
//! it never executes anything itself.

/// Verdict on a generated query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Safe,
    Rejected(String),
}

impl Verdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, Verdict::Safe)
    }
}

/// Mutating/DDL keywords checked as substrings of the upper-cased query.
/// Substring (not word-boundary) matching is intentional: concatenation
/// tricks are the threat model, and false positives are acceptable here.
const DENYLIST: &[&str] = &[
    "DELETE", "UPDATE", "DROP", "INSERT", "ALTER", "CREATE", "TRUNCATE", "REPLACE", "EXEC",
    "PRAGMA", "ATTACH",
];

/// Applies the safety policy in order; the first failing rule wins.
///
/// The upper-cased copy exists for keyword checks only — callers execute
/// the original string with its casing intact.
pub fn validate(sql: &str) -> Verdict {
    let normalized = sql.trim().to_uppercase();

    if !normalized.starts_with("SELECT") {
        return Verdict::Rejected("only SELECT statements are allowed".to_string());
    }

    for keyword in DENYLIST {
        if normalized.contains(keyword) {
            return Verdict::Rejected(format!("forbidden keyword: {keyword}"));
        }
    }

    if sql.contains(';') {
        return Verdict::Rejected("statement separator ';' is not allowed".to_string());
    }
    if sql.contains("--") || sql.contains("/*") {
        return Verdict::Rejected("comment markers are not allowed".to_string());
    }

    Verdict::Safe
}
