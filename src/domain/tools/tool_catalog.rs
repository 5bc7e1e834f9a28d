//! Tool catalog - the set of functions offered to the model.
//!
//! Built once per client profile. The catch-all tool is always present so
//! that input matching no function still has a non-error classification.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use super::tool_specification::{ToolSpecification, CATCH_ALL_TOOL};

/// Errors raised by catalog operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    #[error("tool not found: {0}")]
    NotFound(String),
}

/// Registry of tool specifications, keyed by name.
///
/// Registration order is preserved so prompts and subsets are stable.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: HashMap<String, ToolSpecification>,
    order: Vec<String>,
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolCatalog {
    /// Creates a catalog containing only the catch-all tool.
    pub fn new() -> Self {
        let catch_all = ToolSpecification::catch_all();
        let mut tools = HashMap::new();
        tools.insert(CATCH_ALL_TOOL.to_string(), catch_all);
        Self {
            tools,
            order: vec![CATCH_ALL_TOOL.to_string()],
        }
    }

    /// Creates a catalog from a list of specifications.
    pub fn from_specifications(
        specs: impl IntoIterator<Item = ToolSpecification>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for spec in specs {
            catalog.register(spec)?;
        }
        Ok(catalog)
    }

    /// Registers a tool.
    ///
    /// Names are unique; the catch-all name is reserved.
    pub fn register(&mut self, spec: ToolSpecification) -> Result<(), CatalogError> {
        let name = spec.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(CatalogError::DuplicateTool(name));
        }
        self.order.push(name.clone());
        self.tools.insert(name, spec);
        Ok(())
    }

    /// Looks up a tool by name.
    pub fn lookup(&self, name: &str) -> Result<&ToolSpecification, CatalogError> {
        self.tools
            .get(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }

    /// Checks whether a tool is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Returns the specifications for the given names, in registration order.
    ///
    /// Unknown names are ignored.
    pub fn subset<S: AsRef<str>>(&self, names: &[S]) -> Vec<ToolSpecification> {
        self.order
            .iter()
            .filter(|name| names.iter().any(|n| n.as_ref() == name.as_str()))
            .filter_map(|name| self.tools.get(name))
            .cloned()
            .collect()
    }

    /// Returns a catalog restricted to the given names plus the catch-all.
    pub fn restricted_to<S: AsRef<str>>(&self, names: &[S]) -> ToolCatalog {
        let mut restricted = ToolCatalog::new();
        for spec in self.subset(names) {
            if !spec.is_catch_all() {
                restricted.order.push(spec.name().to_string());
                restricted.tools.insert(spec.name().to_string(), spec);
            }
        }
        restricted
    }

    /// All specifications, in registration order.
    pub fn specifications(&self) -> impl Iterator<Item = &ToolSpecification> {
        self.order.iter().filter_map(|name| self.tools.get(name))
    }

    /// Tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Converts all tools to OpenAI format.
    pub fn to_openai_tools(&self) -> Vec<Value> {
        self.specifications().map(|t| t.to_openai_format()).collect()
    }

    /// Number of registered tools, including the catch-all.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Always false: the catch-all is never absent.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
