//! Tool calling - how model output becomes validated function calls.
//!
//! ## Key Types
//!
//! - [`ToolSpecification`] - Schema and metadata for an invocable function
//! - [`ToolCatalog`] - Registry of specifications, always holding the catch-all
//! - [`ResponseParser`] - Extracts [`ToolCallDirective`]s from model text
//! - [`SchemaValidator`] - Turns directives into [`ValidatedCall`]s
//! - [`StructuredOutcome`] - Uniform result of a handler invocation

mod response_parser;
mod schema_validator;
mod structured_outcome;
mod tool_call;
mod tool_catalog;
mod tool_specification;

pub use response_parser::{
    DecodeError, MarkupError, ParsedResponse, ResponseParser, ToolCallExtraction,
};
pub use schema_validator::{SchemaValidator, ValidationFailure, ValidationOutcome};
pub use structured_outcome::StructuredOutcome;
pub use tool_call::{ToolCallDirective, ValidatedCall};
pub use tool_catalog::{CatalogError, ToolCatalog};
pub use tool_specification::{ParameterSpec, ParameterType, ToolSpecification, CATCH_ALL_TOOL};
