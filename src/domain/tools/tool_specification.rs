//! Tool specification - schema and metadata for an invocable function.
//!
//! A specification is what the model is offered (name, description,
//! typed parameters) and what the validator checks directives against.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Name of the reserved catch-all tool.
///
/// The model routes questions and unclassifiable input here; the pipeline
/// treats it as "no specific function matched" rather than as an action.
pub const CATCH_ALL_TOOL: &str = "generic_response";

/// Type tag of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ParameterType {
    /// Returns the JSON Schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Number => "number",
            ParameterType::Integer => "integer",
            ParameterType::Boolean => "boolean",
            ParameterType::Array => "array",
            ParameterType::Object => "object",
        }
    }
}

impl std::fmt::Display for ParameterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single named, typed parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    name: String,
    param_type: ParameterType,
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
}

impl ParameterSpec {
    /// Creates a parameter with no default.
    pub fn new(
        name: impl Into<String>,
        param_type: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            default: None,
        }
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_type(&self) -> ParameterType {
        self.param_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Definition of a function the model may invoke.
///
/// Parameters keep their declaration order, which is also the order they
/// are presented to the model.
///
/// # Examples
///
/// ```
/// use verification_agent::domain::tools::{ParameterType, ToolSpecification};
///
/// let spec = ToolSpecification::new("check_otp_valid", "Validate the OTP code")
///     .with_parameter("value", ParameterType::String, "six digit code", true);
///
/// assert!(spec.is_required("value"));
/// assert_eq!(spec.to_openai_format()["function"]["name"], "check_otp_valid");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpecification {
    name: String,
    description: String,
    parameters: Vec<ParameterSpec>,
    required: Vec<String>,
}

impl ToolSpecification {
    /// Creates a specification with no parameters.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            required: Vec::new(),
        }
    }

    /// Adds a parameter, optionally marking it required.
    pub fn with_parameter(
        self,
        name: impl Into<String>,
        param_type: ParameterType,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.with_parameter_spec(ParameterSpec::new(name, param_type, description), required)
    }

    /// Adds a fully configured parameter.
    ///
    /// Re-declaring a parameter replaces the earlier declaration in place.
    pub fn with_parameter_spec(mut self, spec: ParameterSpec, required: bool) -> Self {
        let name = spec.name.clone();
        match self.parameters.iter_mut().find(|p| p.name == name) {
            Some(existing) => *existing = spec,
            None => self.parameters.push(spec),
        }
        self.required.retain(|r| r != &name);
        if required {
            self.required.push(name);
        }
        self
    }

    /// The reserved catch-all specification.
    pub fn catch_all() -> Self {
        Self::new(
            CATCH_ALL_TOOL,
            "Generate a generic response for user input when none of the functions match",
        )
        .with_parameter("value", ParameterType::String, "the user input", true)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Parameters in declaration order.
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Names of the required parameters.
    pub fn required_parameters(&self) -> &[String] {
        &self.required
    }

    /// Looks up a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    pub fn is_catch_all(&self) -> bool {
        self.name == CATCH_ALL_TOOL
    }

    /// Converts to the OpenAI function-tool shape offered to the model.
    pub fn to_openai_format(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut property = Map::new();
            property.insert("type".to_string(), json!(param.param_type.as_str()));
            if !param.description.is_empty() {
                property.insert("description".to_string(), json!(param.description));
            }
            if let Some(default) = &param.default {
                property.insert("default".to_string(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(property));
        }

        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": self.required
                }
            }
        })
    }
}
