//! SQL guard - safety layer for query execution
//!
//! Lexically strips string/identifier literals and comments from the SQL
//! text, then validates the remaining skeleton: it must be a single
//! statement, must start with SELECT or WITH, and must not contain a
//! mutating keyword anywhere. The original SQL is what gets executed; the
//! stripped skeleton exists only so literal contents cannot spoof keyword
//! detection in either direction.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{QueryError, SELECT_ONLY_MESSAGE};

static MUTATING_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(insert|update|delete|merge|alter|drop|truncate|create|replace|call)\b")
        .unwrap()
});

/// Validate that `sql` is a single read-only statement.
///
/// This is deliberately not a SQL parser. The database remains the authority
/// on validity; the guard only answers "could this statement mutate state"
/// and rejects when it cannot say no.
pub fn validate_read_only(sql: &str) -> Result<(), QueryError> {
    if sql.trim().is_empty() {
        return Err(QueryError::validation("SQL must not be blank."));
    }

    let skeleton = strip_literals_and_comments(sql);
    let trimmed = skeleton.trim_start();
    if trimmed.is_empty() {
        return Err(QueryError::validation("SQL must not be blank."));
    }

    let normalized = trimmed.to_lowercase();
    if !(normalized.starts_with("select") || normalized.starts_with("with")) {
        return Err(QueryError::validation(SELECT_ONLY_MESSAGE));
    }
    if MUTATING_KEYWORDS.is_match(&normalized) {
        return Err(QueryError::validation(SELECT_ONLY_MESSAGE));
    }

    ensure_single_statement(&normalized)
}

/// Replace quoted spans and comments with neutral whitespace.
///
/// Each single-quoted, double-quoted, or backtick-quoted span collapses to
/// one blank, with doubled-quote escapes (`''`, `""`, ` `` `) consumed as
/// part of the span. `--` comments blank out through end of line; `/* */`
/// blocks disappear entirely. Unterminated spans swallow the rest of the
/// input, so a literal the scanner cannot close still never contributes
/// keywords to the skeleton.
pub(crate) fn strip_literals_and_comments(sql: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut i = 0;

    while i < chars.len() {
        let current = chars[i];
        match current {
            '\'' | '"' | '`' => {
                out.push(' ');
                i += 1;
                while i < chars.len() {
                    if chars[i] == current {
                        if i + 1 < chars.len() && chars[i + 1] == current {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    i += 1;
                }
                // step past the closing quote, if any
                i += 1;
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                i += 2;
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                out.push('\n');
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                    i += 1;
                }
                i += 2;
            }
            _ => {
                out.push(current);
                i += 1;
            }
        }
    }

    out
}

/// Anything non-whitespace after the first semicolon is a second statement.
fn ensure_single_statement(normalized: &str) -> Result<(), QueryError> {
    if let Some(idx) = normalized.find(';') {
        if normalized[idx + 1..].chars().any(|c| !c.is_whitespace()) {
            return Err(QueryError::validation(
                "Multiple SQL statements are not allowed.",
            ));
        }
    }
    Ok(())
}
