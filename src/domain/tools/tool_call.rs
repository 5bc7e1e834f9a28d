//! Tool call directives - candidate and validated function invocations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::tool_specification::CATCH_ALL_TOOL;

/// A candidate function call decoded from model output.
///
/// Not yet checked against any catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDirective {
    /// Name of the function to invoke.
    pub name: String,
    /// Arguments as produced by the model.
    pub arguments: Map<String, Value>,
}

impl ToolCallDirective {
    /// Creates a new directive.
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Creates a directive with a single `value` argument.
    pub fn with_value(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut arguments = Map::new();
        arguments.insert("value".to_string(), value.into());
        Self::new(name, arguments)
    }

    /// Returns true if this directive names the catch-all tool.
    pub fn is_catch_all(&self) -> bool {
        self.name == CATCH_ALL_TOOL
    }
}

/// A directive that passed schema validation.
///
/// Arguments are coerced to the declared parameter types, so handlers can
/// read them without re-checking. Only the validator constructs these.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCall {
    name: String,
    arguments: Map<String, Value>,
}

impl ValidatedCall {
    pub(crate) fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    /// Returns an argument as a string slice, if present and textual.
    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).and_then(Value::as_str)
    }

    pub fn is_catch_all(&self) -> bool {
        self.name == CATCH_ALL_TOOL
    }
}
