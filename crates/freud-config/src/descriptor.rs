//! Reads service descriptors from disk.
//!
//! Descriptors are JSON documents that may carry `//` line comments and
//! `/* */` block comments. Comments are blanked out before parsing; string
//! literals are left untouched so URLs and globs survive.

use std::fs;

use camino::Utf8Path;
use serde_json::{Map, Value};

use crate::errors::ConfigError;

/// Reads and parses the descriptor stored at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::ReadDescriptor`] when the file cannot be read,
/// [`ConfigError::ParseDescriptor`] for malformed JSON and
/// [`ConfigError::Validation`] when the document is not an object.
pub fn load_descriptor(path: &Utf8Path) -> Result<Map<String, Value>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadDescriptor {
        path: path.to_path_buf(),
        source,
    })?;
    parse_descriptor(&text, path)
}

/// Parses descriptor text after stripping comments. `origin` names the
/// source in diagnostics.
///
/// # Errors
///
/// Returns [`ConfigError::ParseDescriptor`] for malformed JSON and
/// [`ConfigError::Validation`] when the document is not an object.
pub fn parse_descriptor(text: &str, origin: &Utf8Path) -> Result<Map<String, Value>, ConfigError> {
    let stripped = strip_comments(text);
    let value: Value =
        serde_json::from_str(&stripped).map_err(|source| ConfigError::ParseDescriptor {
            path: origin.to_path_buf(),
            source,
        })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ConfigError::Validation {
            key: "descriptor".to_owned(),
            expected: "an object",
        }),
    }
}

/// Replaces comments with whitespace, keeping line numbers stable for
/// parser diagnostics.
#[must_use]
pub fn strip_comments(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    while let Some(current) = chars.next() {
        if in_string {
            output.push(current);
            match current {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        output.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        let next = chars.peek().copied();
        match (current, next) {
            ('"', _) => {
                in_string = true;
                output.push(current);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        output.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                output.push(' ');
                let mut previous = '\0';
                for skipped in chars.by_ref() {
                    if previous == '*' && skipped == '/' {
                        break;
                    }
                    if skipped == '\n' {
                        output.push('\n');
                    }
                    previous = skipped;
                }
            }
            _ => output.push(current),
        }
    }
    output
}
