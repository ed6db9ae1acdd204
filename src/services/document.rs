//! Path navigation over the response document.
//!
//! A step's validations and extractions address one JSON document with the
//! roots `status_code`, `response_time`, `headers`, `body` and `sql`.
//! `content.` is an accepted alias for `body.`, and a path with an unknown
//! root is taken to mean a body path.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq)]
enum PathPart {
    Key(String),
    Index(usize),
}

/// Rewrite a user-facing path to its canonical document form
pub fn normalize_path(path: &str) -> String {
    let (root, rest) = match path.split_once('.') {
        Some((root, rest)) => (root, Some(rest)),
        None => (path, None),
    };

    match root {
        "content" => match rest {
            Some(rest) => format!("body.{}", rest),
            None => "body".to_string(),
        },
        // Header names compare case-insensitively; the document stores them
        // lowercased
        "headers" => match rest {
            Some(rest) => {
                let (name, tail) = match rest.split_once('.') {
                    Some((name, tail)) => (name, Some(tail)),
                    None => (rest, None),
                };
                match tail {
                    Some(tail) => format!("headers.{}.{}", name.to_ascii_lowercase(), tail),
                    None => format!("headers.{}", name.to_ascii_lowercase()),
                }
            }
            None => "headers".to_string(),
        },
        "status_code" | "response_time" | "body" | "sql" => path.to_string(),
        _ => format!("body.{}", path),
    }
}

/// Look a path up in the document. `Ok(None)` means the path is well formed
/// but nothing is there; a syntactically broken path is an error.
pub fn lookup_path(document: &Value, path: &str) -> AppResult<Option<Value>> {
    if path.trim().is_empty() {
        return Err(AppError::MalformedExtraction("empty path".to_string()));
    }

    let normalized = normalize_path(path);
    let parts = parse_path(&normalized)?;

    let mut current = document;
    for part in &parts {
        match part {
            PathPart::Key(key) => match current {
                Value::Object(map) => match map.get(key) {
                    Some(next) => current = next,
                    None => return Ok(None),
                },
                _ => return Ok(None),
            },
            PathPart::Index(index) => match current {
                Value::Array(items) => match items.get(*index) {
                    Some(next) => current = next,
                    None => return Ok(None),
                },
                // JSON objects may key on numeral strings
                Value::Object(map) => match map.get(&index.to_string()) {
                    Some(next) => current = next,
                    None => return Ok(None),
                },
                _ => return Ok(None),
            },
        }
    }

    Ok(Some(current.clone()))
}

/// Evaluate an `extract` spec (`{variable name: document path}`) against the
/// document. All paths must hit; on the first miss or malformed entry the
/// whole extraction fails and nothing is handed to the caller.
pub fn apply_extract(document: &Value, extract: &Value) -> AppResult<HashMap<String, Value>> {
    let entries = match extract {
        Value::Null => return Ok(HashMap::new()),
        Value::Object(map) => map,
        _ => {
            return Err(AppError::MalformedExtraction(
                "extract must map variable names to document paths".to_string(),
            ))
        }
    };

    let mut extracted = HashMap::with_capacity(entries.len());
    for (name, path) in entries {
        let path = path.as_str().ok_or_else(|| {
            AppError::MalformedExtraction(format!("path for '{}' must be a string", name))
        })?;
        let value = lookup_path(document, path)?.ok_or_else(|| {
            AppError::MalformedExtraction(format!("path '{}' for '{}' not found", path, name))
        })?;
        extracted.insert(name.clone(), value);
    }

    Ok(extracted)
}

fn parse_path(path: &str) -> AppResult<Vec<PathPart>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '.' => flush_segment(&mut parts, &mut current),
            '[' => {
                flush_segment(&mut parts, &mut current);

                let mut index = String::new();
                let mut closed = false;
                for ch in chars.by_ref() {
                    if ch == ']' {
                        closed = true;
                        break;
                    }
                    index.push(ch);
                }
                if !closed {
                    return Err(AppError::MalformedExtraction(format!(
                        "unterminated index in '{}'",
                        path
                    )));
                }

                let index: usize = index.parse().map_err(|_| {
                    AppError::MalformedExtraction(format!(
                        "invalid array index '{}' in '{}'",
                        index, path
                    ))
                })?;
                parts.push(PathPart::Index(index));
            }
            _ => current.push(ch),
        }
    }
    flush_segment(&mut parts, &mut current);

    if parts.is_empty() {
        return Err(AppError::MalformedExtraction(format!(
            "'{}' addresses nothing",
            path
        )));
    }

    Ok(parts)
}

/// A bare numeral segment indexes into an array
fn flush_segment(parts: &mut Vec<PathPart>, current: &mut String) {
    if current.is_empty() {
        return;
    }
    let segment = std::mem::take(current);
    match segment.parse::<usize>() {
        Ok(index) => parts.push(PathPart::Index(index)),
        Err(_) => parts.push(PathPart::Key(segment)),
    }
}
