//! Deep merging and key normalisation for descriptor trees.

use serde_json::{Map, Value};

/// Recursively merges `over` onto `under`.
///
/// Leaves in `over` replace those in `under` at the same path. Recursion only
/// happens where both sides hold a mapping under the same key, so branches
/// that `over` does not mention are preserved untouched.
#[must_use]
pub fn deep_merge(mut under: Map<String, Value>, over: Map<String, Value>) -> Map<String, Value> {
    for (key, over_value) in over {
        let merged = match (under.remove(&key), over_value) {
            (Some(Value::Object(under_map)), Value::Object(over_map)) => {
                Value::Object(deep_merge(under_map, over_map))
            }
            (_, over_value) => over_value,
        };
        under.insert(key, merged);
    }
    under
}

/// Normalises the keys of `map` to `snake_case`.
///
/// Only the top level is rewritten; nested mappings keep their keys verbatim
/// so user-supplied names such as environment variables survive intact.
#[must_use]
pub fn snakify_keys(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| (snakify(&key), value))
        .collect()
}

/// Converts a `CamelCase` or `mixedCase` identifier to `snake_case`.
///
/// An underscore is inserted before a capitalised word that follows another
/// character, before a digit run that follows a non-digit, and between a
/// lowercase letter or digit and an uppercase letter. The result is
/// lowercased.
#[must_use]
pub fn snakify(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut output = String::with_capacity(input.len() + 4);
    let mut previous: Option<char> = None;
    for (index, &current) in chars.iter().enumerate() {
        if let Some(before) = previous
            && before != '_'
            && starts_word(before, current, chars.get(index + 1).copied())
        {
            output.push('_');
        }
        output.extend(current.to_lowercase());
        previous = Some(current);
    }
    output
}

fn starts_word(before: char, current: char, next: Option<char>) -> bool {
    let capitalised = current.is_ascii_uppercase() && next.is_some_and(|c| c.is_ascii_lowercase());
    let digit_run = current.is_ascii_digit() && !before.is_ascii_digit();
    let case_change = current.is_ascii_uppercase()
        && (before.is_ascii_lowercase() || before.is_ascii_digit());
    capitalised || digit_run || case_change
}
