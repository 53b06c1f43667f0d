//! CSV encoder for query result sets
//!
//! Header row first, then data rows in result order, `\n` terminated. The
//! quote mode decides which fields are force-quoted; independent of mode, a
//! field containing a delimiter, quote, or line break is always quoted, an
//! embedded quote is doubled, and NULL renders as an empty unquoted field.
//! An empty result set encodes to an empty string with no header row.

use std::fmt::Write;

use crate::types::{QueryError, QuoteMode, ResultSet, Value};

const LINE_TERMINATOR: &str = "\n";

/// Encode a result set as CSV text under the given quoting policy.
pub fn to_csv(result: &ResultSet, mode: QuoteMode) -> Result<String, QueryError> {
    if result.rows.is_empty() {
        return Ok(String::new());
    }

    let mut out = String::new();

    // column names are textual fields, so strings_only force-quotes them too
    let force_headers = matches!(
        mode,
        QuoteMode::HeadersOnly | QuoteMode::StringsOnly | QuoteMode::All
    );
    for (i, name) in result.columns.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_field(&mut out, name, force_headers)?;
    }
    out.push_str(LINE_TERMINATOR);

    for row in &result.rows {
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            if matches!(cell, Value::Null) {
                continue;
            }
            let force = match mode {
                QuoteMode::All => true,
                QuoteMode::StringsOnly => cell.is_textual(),
                QuoteMode::None | QuoteMode::HeadersOnly => false,
            };
            write_field(&mut out, &cell.render(), force)?;
        }
        out.push_str(LINE_TERMINATOR);
    }

    Ok(out)
}

fn write_field(out: &mut String, raw: &str, force: bool) -> Result<(), QueryError> {
    let needs_quotes = force || raw.contains([',', '"', '\r', '\n']);
    if needs_quotes {
        let escaped = raw.replace('"', "\"\"");
        write!(out, "\"{escaped}\"")
    } else {
        out.write_str(raw)
    }
    .map_err(|e| QueryError::Encoding(e.to_string()))
}
