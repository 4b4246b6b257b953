//! Type checks applied to the merged descriptor tree before interpolation.

use serde_json::{Map, Value};

use crate::errors::ConfigError;

const STRING_KEYS: &[&str] = &["name", "root", "pidfile", "logfile", "sudo_user"];
const BOOLEAN_KEYS: &[&str] = &["background", "create_pidfile", "reset_env"];
const STRING_MAP_KEYS: &[&str] = &["vars", "env", "commands"];

/// Checks that every known key in `tree` is absent or holds the right type.
///
/// Mapping fields are checked one level deep: their values must be strings.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] naming the first offending key.
pub fn validate(tree: &Map<String, Value>) -> Result<(), ConfigError> {
    for key in STRING_KEYS {
        expect(tree, key, Value::is_string, "a string")?;
    }
    for key in BOOLEAN_KEYS {
        expect(tree, key, Value::is_boolean, "a boolean")?;
    }
    for key in STRING_MAP_KEYS {
        expect(tree, key, Value::is_object, "a mapping")?;
        if let Some(Value::Object(entries)) = tree.get(*key) {
            for (name, value) in entries {
                if !value.is_string() {
                    return Err(invalid(format!("{key}.{name}"), "a string"));
                }
            }
        }
    }
    Ok(())
}

fn expect(
    tree: &Map<String, Value>,
    key: &str,
    check: fn(&Value) -> bool,
    expected: &'static str,
) -> Result<(), ConfigError> {
    match tree.get(key) {
        Some(value) if !check(value) => Err(invalid(key.to_owned(), expected)),
        _ => Ok(()),
    }
}

const fn invalid(key: String, expected: &'static str) -> ConfigError {
    ConfigError::Validation { key, expected }
}
