//! Schema validator - checks directives against the tool catalog.
//!
//! Checks run in a fixed order: the function must exist, every required
//! parameter must be present, and every supplied argument must match (or
//! be coercible to) its declared type. Validation is pure.

use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::tool_call::{ToolCallDirective, ValidatedCall};
use super::tool_catalog::ToolCatalog;
use super::tool_specification::{ParameterType, ToolSpecification};

/// Why a directive was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("{function}: missing required parameter '{parameter}'")]
    MissingRequired { function: String, parameter: String },

    #[error("{function}: parameter '{parameter}' expected {expected}, got {actual}")]
    TypeMismatch {
        function: String,
        parameter: String,
        expected: ParameterType,
        actual: String,
    },
}

/// Result of validating one directive.
pub type ValidationOutcome = Result<ValidatedCall, ValidationFailure>;

/// Validates directives against catalog entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validates a directive, returning its coerced form on success.
    pub fn validate(&self, directive: &ToolCallDirective, catalog: &ToolCatalog) -> ValidationOutcome {
        let spec = catalog
            .lookup(&directive.name)
            .map_err(|_| ValidationFailure::UnknownFunction {
                name: directive.name.clone(),
            })?;

        for required in spec.required_parameters() {
            match directive.arguments.get(required) {
                None | Some(Value::Null) => {
                    return Err(ValidationFailure::MissingRequired {
                        function: spec.name().to_string(),
                        parameter: required.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        let arguments = coerce_arguments(spec, &directive.arguments)?;
        Ok(ValidatedCall::new(spec.name(), arguments))
    }
}

fn coerce_arguments(
    spec: &ToolSpecification,
    arguments: &Map<String, Value>,
) -> Result<Map<String, Value>, ValidationFailure> {
    let mut coerced = Map::new();

    for (name, value) in arguments {
        let Some(param) = spec.parameter(name) else {
            tracing::debug!(function = spec.name(), parameter = %name, "Ignoring undeclared argument");
            coerced.insert(name.clone(), value.clone());
            continue;
        };

        if value.is_null() {
            // Required parameters were rejected above, so this one is optional.
            continue;
        }

        let value = coerce(param.param_type(), value).ok_or_else(|| {
            ValidationFailure::TypeMismatch {
                function: spec.name().to_string(),
                parameter: name.clone(),
                expected: param.param_type(),
                actual: json_type_name(value).to_string(),
            }
        })?;
        coerced.insert(name.clone(), value);
    }

    for param in spec.parameters() {
        if !coerced.contains_key(param.name()) {
            if let Some(default) = param.default() {
                coerced.insert(param.name().to_string(), default.clone());
            }
        }
    }

    Ok(coerced)
}

/// Coerces a value to the declared type, or `None` if impossible.
fn coerce(expected: ParameterType, value: &Value) -> Option<Value> {
    match (expected, value) {
        (ParameterType::String, Value::String(_)) => Some(value.clone()),
        (ParameterType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (ParameterType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

        (ParameterType::Number, Value::Number(_)) => Some(value.clone()),
        (ParameterType::Number, Value::String(s)) => {
            let parsed = s.trim().parse::<f64>().ok()?;
            Number::from_f64(parsed).map(Value::Number)
        }

        (ParameterType::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => {
            Some(value.clone())
        }
        (ParameterType::Integer, Value::String(s)) => {
            s.trim().parse::<i64>().ok().map(|i| Value::Number(i.into()))
        }

        (ParameterType::Boolean, Value::Bool(_)) => Some(value.clone()),
        (ParameterType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },

        (ParameterType::Array, Value::Array(_)) => Some(value.clone()),
        (ParameterType::Object, Value::Object(_)) => Some(value.clone()),

        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tools::ParameterSpec;
    use serde_json::json;

    fn catalog() -> ToolCatalog {
        ToolCatalog::from_specifications(vec![
            ToolSpecification::new("check_otp_valid", "Validate OTP").with_parameter(
                "value",
                ParameterType::String,
                "code",
                true,
            ),
            ToolSpecification::new("request_amount", "Requested amount")
                .with_parameter("amount", ParameterType::Number, "", true)
                .with_parameter("term_months", ParameterType::Integer, "", false)
                .with_parameter("insured", ParameterType::Boolean, "", false)
                .with_parameter_spec(
                    ParameterSpec::new("currency", ParameterType::String, "")
                        .with_default(json!("MXN")),
                    false,
                ),
        ])
        .unwrap()
    }

    fn directive(name: &str, args: Value) -> ToolCallDirective {
        let Value::Object(map) = args else {
            panic!("arguments must be an object");
        };
        ToolCallDirective::new(name, map)
    }

    #[test]
    fn accepts_known_function_with_required_argument() {
        let call = SchemaValidator::new()
            .validate(&directive("check_otp_valid", json!({"value": "123456"})), &catalog())
            .unwrap();
        assert_eq!(call.name(), "check_otp_valid");
        assert_eq!(call.str_arg("value"), Some("123456"));
    }

    #[test]
    fn rejects_unknown_function_first() {
        let result = SchemaValidator::new().validate(&directive("transfer", json!({})), &catalog());
        assert_eq!(
            result,
            Err(ValidationFailure::UnknownFunction {
                name: "transfer".to_string()
            })
        );
    }

    #[test]
    fn rejects_missing_required_parameter() {
        let result =
            SchemaValidator::new().validate(&directive("check_otp_valid", json!({})), &catalog());
        assert!(matches!(result, Err(ValidationFailure::MissingRequired { ref parameter, .. }) if parameter == "value"));
    }

    #[test]
    fn null_required_parameter_counts_as_missing() {
        let result = SchemaValidator::new()
            .validate(&directive("check_otp_valid", json!({"value": null})), &catalog());
        assert!(matches!(result, Err(ValidationFailure::MissingRequired { .. })));
    }

    #[test]
    fn coerces_numeric_and_boolean_strings() {
        let call = SchemaValidator::new()
            .validate(
                &directive(
                    "request_amount",
                    json!({"amount": "15000.50", "term_months": "12", "insured": "TRUE"}),
                ),
                &catalog(),
            )
            .unwrap();

        assert_eq!(call.arguments()["amount"], json!(15000.5));
        assert_eq!(call.arguments()["term_months"], json!(12));
        assert_eq!(call.arguments()["insured"], json!(true));
    }

    #[test]
    fn string_parameter_accepts_scalars() {
        let call = SchemaValidator::new()
            .validate(&directive("check_otp_valid", json!({"value": 123456})), &catalog())
            .unwrap();
        assert_eq!(call.str_arg("value"), Some("123456"));
    }

    #[test]
    fn rejects_non_coercible_values() {
        let result = SchemaValidator::new().validate(
            &directive("request_amount", json!({"amount": "lots"})),
            &catalog(),
        );
        assert_eq!(
            result,
            Err(ValidationFailure::TypeMismatch {
                function: "request_amount".to_string(),
                parameter: "amount".to_string(),
                expected: ParameterType::Number,
                actual: "string".to_string(),
            })
        );

        let fractional = SchemaValidator::new().validate(
            &directive("request_amount", json!({"amount": 1, "term_months": 1.5})),
            &catalog(),
        );
        assert!(matches!(fractional, Err(ValidationFailure::TypeMismatch { .. })));

        let object_as_string = SchemaValidator::new().validate(
            &directive("check_otp_valid", json!({"value": {"code": 1}})),
            &catalog(),
        );
        assert!(matches!(object_as_string, Err(ValidationFailure::TypeMismatch { .. })));
    }

    #[test]
    fn fills_defaults_and_keeps_undeclared_arguments() {
        let call = SchemaValidator::new()
            .validate(
                &directive("request_amount", json!({"amount": 100, "note": "x"})),
                &catalog(),
            )
            .unwrap();
        assert_eq!(call.arguments()["currency"], json!("MXN"));
        assert_eq!(call.arguments()["note"], json!("x"));
    }

    #[test]
    fn catch_all_is_always_valid_with_value() {
        let call = SchemaValidator::new()
            .validate(
                &directive("generic_response", json!({"value": "¿cuánto tarda?"})),
                &ToolCatalog::new(),
            )
            .unwrap();
        assert!(call.is_catch_all());
    }
}
