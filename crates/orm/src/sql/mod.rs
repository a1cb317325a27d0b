//! SQL text helpers shared by the query builder and the backends
//!
//! Everything the builder emits uses the positional `?` marker; backends whose
//! driver wants numbered parameters rewrite the text just before preparing.

use crate::backends::SqlDialect;

/// SQL parameter placeholder for the given zero-based position
pub fn parameter_placeholder(index: usize, dialect: &SqlDialect) -> String {
    dialect.parameter_placeholder(index)
}

/// Escape SQL identifier for safe use in queries
pub fn escape_identifier(identifier: &str, dialect: &SqlDialect) -> String {
    let quote = dialect.identifier_quote();
    let doubled = format!("{}{}", quote, quote);
    format!("{}{}{}", quote, identifier.replace(quote, &doubled), quote)
}

/// Walk `sql` and call `on_marker` for every `?` outside quoted text.
///
/// Single-quoted literals and double-quoted identifiers are skipped; a doubled
/// quote inside them is an escaped quote.
fn scan_placeholders(sql: &str, mut on_marker: impl FnMut(usize), mut on_char: impl FnMut(char)) {
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();
    let mut index = 0;

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => {
                if chars.peek() == Some(&q) {
                    on_char(c);
                    if let Some(next) = chars.next() {
                        on_char(next);
                    }
                    continue;
                }
                quote = None;
                on_char(c);
            }
            Some(_) => on_char(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                on_char(c);
            }
            None if c == '?' => {
                on_marker(index);
                index += 1;
            }
            None => on_char(c),
        }
    }
}

/// Number of positional `?` markers in `sql`
pub fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    scan_placeholders(sql, |_| count += 1, |_| {});
    count
}

/// Rewrite positional `?` markers into the dialect's placeholder syntax
pub fn rewrite_placeholders(sql: &str, dialect: &SqlDialect) -> String {
    if !dialect.numbered_parameters() {
        return sql.to_string();
    }

    // The two callbacks both append to the output, so collect events first.
    enum Piece {
        Marker(usize),
        Char(char),
    }
    let pieces = std::cell::RefCell::new(Vec::with_capacity(sql.len()));
    scan_placeholders(
        sql,
        |i| pieces.borrow_mut().push(Piece::Marker(i)),
        |c| pieces.borrow_mut().push(Piece::Char(c)),
    );

    let mut out = String::with_capacity(sql.len() + 8);
    for piece in pieces.into_inner() {
        match piece {
            Piece::Marker(i) => out.push_str(&dialect.parameter_placeholder(i)),
            Piece::Char(c) => out.push(c),
        }
    }
    out
}

/// Remove credentials from a connection URL before it reaches logs or errors
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.password().is_some() && parsed.set_password(Some("***")).is_err() {
                return "[redacted]".to_string();
            }
            parsed.to_string()
        }
        Err(_) => "[redacted]".to_string(),
    }
}

/// `CreditTransaction` -> `credit_transaction`
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
