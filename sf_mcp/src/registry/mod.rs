//! # Argument Schema Registry
//!
//! Declares every tool the server exposes and the parameters each one accepts.
//!
//! The catalog is a `'static` table (see [`catalog`]) indexed once, on first use,
//! into a process-wide [`ToolRegistry`]. Nothing mutates it afterwards, so callers on
//! any task can share it without locking.
//!
//! Validation of untyped caller input against a [`ToolDefinition`] lives in
//! [`validation`]; it produces the strongly typed [`ArgumentRecord`] consumed by the
//! flag translator.

pub mod catalog;
mod validation;

pub use validation::{
    ArgValue, ArgumentRecord, ValidationError, json_type_name, split_command,
    validate, validate_raw_command,
};

use std::collections::HashMap;
use std::sync::LazyLock;

/// The closed set of parameter shapes a tool may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Boolean,
    String,
    Number,
    /// A JSON array of strings, passed to the CLI comma-joined.
    StringList,
    /// A string restricted to the listed values.
    Enum(&'static [&'static str]),
}

impl ParamKind {
    /// The JSON Schema `type` keyword for this kind.
    pub fn json_type(&self) -> &'static str {
        match self {
            ParamKind::Boolean => "boolean",
            ParamKind::String | ParamKind::Enum(_) => "string",
            ParamKind::Number => "number",
            ParamKind::StringList => "array",
        }
    }

    /// Human readable name used in validation messages.
    pub fn describe(&self) -> &'static str {
        match self {
            ParamKind::Boolean => "boolean",
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::StringList => "array of strings",
            ParamKind::Enum(_) => "string (enumerated)",
        }
    }

    pub fn allowed_values(&self) -> Option<&'static [&'static str]> {
        match self {
            ParamKind::Enum(values) => Some(values),
            _ => None,
        }
    }
}

/// Declared shape of one named tool argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSpec {
    /// camelCase argument name, as callers send it.
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: Option<&'static str>,
}

impl ParameterSpec {
    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description: Some(description),
        }
    }

    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description: Some(description),
        }
    }

    /// Drops the description, for parameters the CLI documents by their values alone.
    pub const fn undocumented(self) -> Self {
        Self {
            description: None,
            ..self
        }
    }
}

/// How a tool's arguments become a CLI invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTemplate {
    /// Fixed `sf` subcommand tokens, followed by flags derived from the arguments.
    Prefix(&'static [&'static str]),
    /// The caller supplies the whole command line after `sf`.
    ///
    /// This is the deliberate low-safety escape hatch: only the presence of a
    /// `command` string is validated, never what it asks the CLI to do.
    RawCommand,
}

/// A named, schema-described operation backed by one `sf` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub command: CommandTemplate,
    pub parameters: &'static [ParameterSpec],
}

impl ToolDefinition {
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(|p| p.required)
    }

    pub fn is_raw_command(&self) -> bool {
        matches!(self.command, CommandTemplate::RawCommand)
    }
}

/// Read-only index over the tool catalog.
#[derive(Debug)]
pub struct ToolRegistry {
    tools: &'static [ToolDefinition],
    by_name: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    /// Indexes `tools` by name.
    ///
    /// # Panics
    ///
    /// Panics if two tools share a name or a tool declares a parameter twice.
    /// The catalog is compiled in, so this can only trip on a programming error.
    pub fn new(tools: &'static [ToolDefinition]) -> Self {
        let mut by_name = HashMap::with_capacity(tools.len());
        for (index, tool) in tools.iter().enumerate() {
            assert!(
                by_name.insert(tool.name, index).is_none(),
                "duplicate tool name '{}'",
                tool.name
            );
            for (i, param) in tool.parameters.iter().enumerate() {
                assert!(
                    !tool.parameters[..i].iter().any(|p| p.name == param.name),
                    "tool '{}' declares parameter '{}' twice",
                    tool.name,
                    param.name
                );
            }
        }
        Self { tools, by_name }
    }

    pub fn lookup(&self, name: &str) -> Option<&'static ToolDefinition> {
        self.by_name.get(name).map(|&index| &self.tools[index])
    }

    /// Tools in catalog order.
    pub fn tools(&self) -> &'static [ToolDefinition] {
        self.tools
    }
}

static REGISTRY: LazyLock<ToolRegistry> = LazyLock::new(|| ToolRegistry::new(catalog::TOOLS));

/// The process-wide tool registry.
pub fn registry() -> &'static ToolRegistry {
    &REGISTRY
}

/// Shorthand for `registry().lookup(name)`.
pub fn lookup(name: &str) -> Option<&'static ToolDefinition> {
    registry().lookup(name)
}
