//! Validation of caller-supplied arguments.
//!
//! Turns an untyped JSON object into an [`ArgumentRecord`] whose every entry is
//! declared by the tool, carries the declared type, and (for enumerations) holds an
//! allowed value. Validation never touches the filesystem or network.

use serde_json::{Map, Value};
use thiserror::Error;

use super::{ParamKind, ParameterSpec, ToolDefinition};

/// Why caller arguments were rejected. Always recoverable; reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Unknown parameter '{field}' for tool '{tool}'")]
    UnknownParameter { tool: String, field: String },

    #[error("Missing required parameter '{field}'")]
    MissingParameter { field: String },

    #[error("Invalid type for parameter '{field}': expected {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error(
        "Invalid value '{value}' for parameter '{field}': expected one of {}",
        .allowed.join(", ")
    )]
    NotInEnum {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("Invalid command: {reason}")]
    InvalidCommand { reason: String },
}

impl ValidationError {
    /// The argument that failed validation, if the failure is tied to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::UnknownParameter { field, .. }
            | ValidationError::MissingParameter { field }
            | ValidationError::TypeMismatch { field, .. }
            | ValidationError::NotInEnum { field, .. } => Some(field),
            ValidationError::InvalidCommand { .. } => Some("command"),
        }
    }
}

/// A validated argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Bool(bool),
    /// Plain strings and enumeration members.
    Str(String),
    Number(f64),
    List(Vec<String>),
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Str(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Number(value)
    }
}

impl From<Vec<String>> for ArgValue {
    fn from(value: Vec<String>) -> Self {
        ArgValue::List(value)
    }
}

impl From<&[&str]> for ArgValue {
    fn from(value: &[&str]) -> Self {
        ArgValue::List(value.iter().map(|s| s.to_string()).collect())
    }
}

/// Ordered, typed arguments for one tool call.
///
/// Iteration follows insertion order. Records produced by [`validate`] are inserted
/// in the tool's declaration order, independent of how the caller ordered its keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentRecord {
    entries: Vec<(String, ArgValue)>,
}

impl ArgumentRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ArgValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// JSON type name used in validation messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validates `raw` against `tool`'s declared parameters.
///
/// A missing argument object is treated as empty, and a JSON `null` value counts as
/// absent. Unknown keys are rejected rather than silently dropped.
pub fn validate(
    tool: &ToolDefinition,
    raw: Option<&Map<String, Value>>,
) -> Result<ArgumentRecord, ValidationError> {
    let empty = Map::new();
    let raw = raw.unwrap_or(&empty);

    if let Some(unknown) = raw.keys().find(|key| tool.parameter(key).is_none()) {
        return Err(ValidationError::UnknownParameter {
            tool: tool.name.to_string(),
            field: unknown.clone(),
        });
    }

    let mut record = ArgumentRecord::new();
    for spec in tool.parameters {
        match raw.get(spec.name) {
            None | Some(Value::Null) => {
                if spec.required {
                    return Err(ValidationError::MissingParameter {
                        field: spec.name.to_string(),
                    });
                }
            }
            Some(value) => record.insert(spec.name, check_value(spec, value)?),
        }
    }
    Ok(record)
}

fn check_value(spec: &ParameterSpec, value: &Value) -> Result<ArgValue, ValidationError> {
    let mismatch = |field: String, expected: &'static str, found: &Value| {
        ValidationError::TypeMismatch {
            field,
            expected,
            found: json_type_name(found),
        }
    };

    match (spec.kind, value) {
        (ParamKind::Boolean, Value::Bool(b)) => Ok(ArgValue::Bool(*b)),
        (ParamKind::String, Value::String(s)) => Ok(ArgValue::Str(s.clone())),
        (ParamKind::Number, Value::Number(n)) => n
            .as_f64()
            .map(ArgValue::Number)
            .ok_or_else(|| mismatch(spec.name.to_string(), "number", value)),
        (ParamKind::StringList, Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| mismatch(format!("{}[{}]", spec.name, i), "string", item))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ArgValue::List),
        (ParamKind::Enum(allowed), Value::String(s)) => {
            if allowed.contains(&s.as_str()) {
                Ok(ArgValue::Str(s.clone()))
            } else {
                Err(ValidationError::NotInEnum {
                    field: spec.name.to_string(),
                    value: s.clone(),
                    allowed: allowed.iter().map(|v| v.to_string()).collect(),
                })
            }
        }
        (kind, other) => Err(mismatch(spec.name.to_string(), kind.describe(), other)),
    }
}

/// Splits a raw command line into words, honouring shell-style quoting.
///
/// The words are handed to the CLI as separate arguments; no shell ever sees them.
pub fn split_command(command: &str) -> Result<Vec<String>, ValidationError> {
    if command.trim().is_empty() {
        return Err(ValidationError::InvalidCommand {
            reason: "command must not be empty".to_string(),
        });
    }
    shlex::split(command).ok_or_else(|| ValidationError::InvalidCommand {
        reason: "unbalanced quotes or trailing escape".to_string(),
    })
}

/// Validates the custom-command escape hatch.
///
/// Only checks that a non-blank `command` string is present and splits it into
/// words; every other key is ignored.
pub fn validate_raw_command(raw: Option<&Map<String, Value>>) -> Result<Vec<String>, ValidationError> {
    match raw.and_then(|args| args.get("command")) {
        None | Some(Value::Null) => Err(ValidationError::MissingParameter {
            field: "command".to_string(),
        }),
        Some(Value::String(command)) => split_command(command),
        Some(other) => Err(ValidationError::TypeMismatch {
            field: "command".to_string(),
            expected: "string",
            found: json_type_name(other),
        }),
    }
}
