//! Line-oriented parser for program source.
//!
//! ```text
//! # comment
//! counter lines_total
//! /ERROR|WARN/ { problems_total++; lines_total++ }
//! ```

use super::CompileError;

/// A parsed statement with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Stmt {
    Counter {
        name: String,
        line: usize,
        column: usize,
    },
    Rule {
        pattern: String,
        line: usize,
        column: usize,
        /// Counter names to increment, with the column each was written at.
        actions: Vec<(String, usize)>,
    },
}

/// Parse every line, collecting statements and all diagnostics.
pub(crate) fn parse(file: &str, source: &str) -> (Vec<Stmt>, Vec<CompileError>) {
    let mut stmts = Vec::new();
    let mut errors = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        let indent = raw.len() - raw.trim_start().len();
        let text = raw.trim_start();

        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        let result = if let Some(rest) = text.strip_prefix("counter") {
            parse_counter(rest, line, indent + "counter".len())
        } else if text.starts_with('/') {
            parse_rule(text, line, indent)
        } else {
            Err((indent, "unknown statement, expected `counter` or `/regex/`".to_string()))
        };

        match result {
            Ok(stmt) => stmts.push(stmt),
            Err((offset, message)) => {
                errors.push(CompileError::new(file, line, offset + 1, message))
            }
        }
    }

    (stmts, errors)
}

type ParseResult = Result<Stmt, (usize, String)>;

fn parse_counter(rest: &str, line: usize, offset: usize) -> ParseResult {
    if !rest.starts_with(char::is_whitespace) {
        return Err((offset, "expected whitespace after `counter`".to_string()));
    }
    let name_offset = offset + (rest.len() - rest.trim_start().len());
    let rest = rest.trim_start();
    let (name, tail) = split_ident(rest);
    if name.is_empty() {
        return Err((name_offset, "expected counter name".to_string()));
    }
    check_trailing(tail, name_offset + name.len())?;

    Ok(Stmt::Counter {
        name: name.to_string(),
        line,
        column: name_offset + 1,
    })
}

fn parse_rule(text: &str, line: usize, offset: usize) -> ParseResult {
    // text starts with '/'
    let body = &text[1..];
    let mut end = None;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '/' if !escaped => {
                end = Some(i);
                break;
            }
            _ => escaped = false,
        }
    }
    let Some(end) = end else {
        return Err((offset, "unterminated regex".to_string()));
    };
    let pattern = body[..end].replace("\\/", "/");
    if pattern.is_empty() {
        return Err((offset, "empty regex".to_string()));
    }

    // Offsets below are relative to `text`.
    let after_regex = end + 2;
    let rest = &text[after_regex..];
    let brace = after_regex + (rest.len() - rest.trim_start().len());
    if !text[brace..].starts_with('{') {
        return Err((offset + brace, "expected `{` after regex".to_string()));
    }
    let Some(close) = text[brace..].find('}').map(|i| brace + i) else {
        return Err((offset + brace, "missing `}`".to_string()));
    };

    let mut actions = Vec::new();
    let mut cursor = brace + 1;
    for part in text[brace + 1..close].split(';') {
        let part_offset = cursor + (part.len() - part.trim_start().len());
        cursor += part.len() + 1;
        let action = part.trim();
        if action.is_empty() {
            continue;
        }
        let (name, tail) = split_ident(action);
        if name.is_empty() || tail.trim() != "++" {
            return Err((offset + part_offset, format!("expected `<counter>++`, found `{action}`")));
        }
        actions.push((name.to_string(), offset + part_offset + 1));
    }
    if actions.is_empty() {
        return Err((offset + brace, "rule has no actions".to_string()));
    }
    check_trailing(&text[close + 1..], offset + close + 1)?;

    Ok(Stmt::Rule {
        pattern,
        line,
        column: offset + 1,
        actions,
    })
}

/// Split a leading identifier (`[A-Za-z_][A-Za-z0-9_]*`) off `s`.
fn split_ident(s: &str) -> (&str, &str) {
    let mut end = 0;
    for (i, c) in s.char_indices() {
        let ok = if i == 0 {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_'
        };
        if !ok {
            break;
        }
        end = i + c.len_utf8();
    }
    s.split_at(end)
}

/// Only whitespace or a comment may follow a complete statement.
fn check_trailing(tail: &str, offset: usize) -> Result<(), (usize, String)> {
    let trimmed = tail.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        Ok(())
    } else {
        let at = offset + (tail.len() - trimmed.len());
        Err((at, format!("unexpected trailing input `{trimmed}`")))
    }
}
