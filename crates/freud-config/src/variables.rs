//! Variable bindings and the `%name` template language.
//!
//! Templates take three forms: `%name`, `%{name}` and `%{name|default}`. A
//! backslash before the sigil (`\%name`) suppresses evaluation; once every
//! placeholder has been substituted, the remaining `\%` pairs collapse to a
//! literal `%`. Resolved values are expanded recursively so bindings and
//! defaults may themselves reference other variables. Each expansion carries
//! its own stack of names being evaluated, which turns self-referential
//! chains into [`VariableError::Cycle`] instead of unbounded recursion.

use std::collections::BTreeMap;

use thiserror::Error;

const SIGIL: char = '%';
const ESCAPED_SIGIL: &str = "\\%";

/// Errors raised while resolving variables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariableError {
    /// A template referenced a variable that is not bound and has no default.
    #[error("unknown variable: {name}")]
    Undefined {
        /// Name of the missing variable.
        name: String,
    },
    /// A variable expanded, directly or indirectly, into itself.
    #[error("infinite loop evaluating '%{name}' in '{input}'")]
    Cycle {
        /// Variable that re-entered its own expansion.
        name: String,
        /// Template text being expanded when the cycle was detected.
        input: String,
    },
}

/// Ordered name to value bindings used to expand templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableStore {
    bindings: BTreeMap<String, String>,
}

impl VariableStore {
    /// Builds an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `updates` into the store, overwriting existing names.
    pub fn bind<I, K, V>(&mut self, updates: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in updates {
            self.bindings.insert(name.into(), value.into());
        }
        self
    }

    /// Binds a single variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    /// Returns the value bound to `name`.
    ///
    /// # Errors
    ///
    /// Returns [`VariableError::Undefined`] when `name` is unbound.
    pub fn get(&self, name: &str) -> Result<&str, VariableError> {
        self.bindings
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| VariableError::Undefined {
                name: name.to_owned(),
            })
    }

    /// Returns the value bound to `name`, or `default` when unbound.
    #[must_use]
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.bindings.get(name).map_or(default, String::as_str)
    }

    /// Iterates over the bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Reports whether `input` contains at least one unescaped placeholder.
    #[must_use]
    pub fn test(&self, input: &str) -> bool {
        scan(input)
            .iter()
            .any(|segment| matches!(segment, Segment::Placeholder { .. }))
    }

    /// Expands every placeholder in `input`.
    ///
    /// # Errors
    ///
    /// Returns [`VariableError::Undefined`] for unbound names without a
    /// default and [`VariableError::Cycle`] for self-referential bindings.
    pub fn apply(&self, input: &str) -> Result<String, VariableError> {
        let mut stack = Vec::new();
        self.expand(input, &mut stack)
    }

    fn expand(&self, input: &str, stack: &mut Vec<String>) -> Result<String, VariableError> {
        let mut output = String::with_capacity(input.len());
        for segment in scan(input) {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Placeholder { name, default } => {
                    if stack.iter().any(|active| active == name) {
                        return Err(VariableError::Cycle {
                            name: name.to_owned(),
                            input: input.to_owned(),
                        });
                    }
                    let resolved = match (self.bindings.get(name), default) {
                        (Some(value), _) => value.as_str(),
                        (None, Some(fallback)) => fallback,
                        (None, None) => {
                            return Err(VariableError::Undefined {
                                name: name.to_owned(),
                            });
                        }
                    };
                    stack.push(name.to_owned());
                    let expanded = self.expand(resolved, stack);
                    stack.pop();
                    output.push_str(&expanded?);
                }
            }
        }
        Ok(unescape(&output))
    }
}

/// Collapses escaped sigils (`\%`) into literal `%` characters.
#[must_use]
pub fn unescape(input: &str) -> String {
    input.replace(ESCAPED_SIGIL, "%")
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Placeholder {
        name: &'a str,
        default: Option<&'a str>,
    },
}

/// Splits `input` into literal text and placeholders.
fn scan(input: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;
    while let Some(offset) = input.get(cursor..).and_then(|rest| rest.find(SIGIL)) {
        let at = cursor + offset;
        let after = at + SIGIL.len_utf8();
        if input.get(..at).is_some_and(|head| head.ends_with('\\')) {
            cursor = after;
            continue;
        }
        let Some((name, default, consumed)) = input.get(after..).and_then(parse_placeholder)
        else {
            cursor = after;
            continue;
        };
        if let Some(text) = input.get(literal_start..at).filter(|text| !text.is_empty()) {
            segments.push(Segment::Literal(text));
        }
        segments.push(Segment::Placeholder { name, default });
        cursor = after + consumed;
        literal_start = cursor;
    }
    if let Some(text) = input.get(literal_start..).filter(|text| !text.is_empty()) {
        segments.push(Segment::Literal(text));
    }
    segments
}

/// Parses the text following a sigil, returning the name, the optional
/// default and the number of bytes consumed.
fn parse_placeholder(rest: &str) -> Option<(&str, Option<&str>, usize)> {
    if let Some(braced) = rest.strip_prefix('{') {
        let name_len = word_length(braced);
        if name_len == 0 {
            return None;
        }
        let name = braced.get(..name_len)?;
        let tail = braced.get(name_len..)?;
        if tail.starts_with('}') {
            return Some((name, None, name_len + 2));
        }
        let body = tail.strip_prefix('|')?;
        let default_len = closing_brace(body)?;
        let default = body.get(..default_len)?;
        return Some((name, Some(default), name_len + default_len + 3));
    }
    let name_len = word_length(rest);
    if name_len == 0 {
        return None;
    }
    Some((rest.get(..name_len)?, None, name_len))
}

fn word_length(text: &str) -> usize {
    text.bytes()
        .take_while(|byte| byte.is_ascii_alphanumeric() || *byte == b'_')
        .count()
}

/// Finds the brace that closes a default, honouring nested braces.
fn closing_brace(body: &str) -> Option<usize> {
    let mut depth = 0_usize;
    for (index, byte) in body.bytes().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' if depth == 0 => return Some(index),
            b'}' => depth -= 1,
            _ => {}
        }
    }
    None
}
