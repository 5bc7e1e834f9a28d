//! Client Functions Port - the capability set of a client profile.
//!
//! A profile declares which text tools the model may call (with their
//! handlers) and which media validators exist. The catalog and the
//! dispatcher table are both built once from it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::tools::ToolSpecification;

use super::media_handler::MediaHandler;
use super::tool_handler::ToolHandler;

/// A catalog entry paired with the handler that executes it.
#[derive(Clone)]
pub struct RegisteredTool {
    pub specification: ToolSpecification,
    pub handler: Arc<dyn ToolHandler>,
}

impl RegisteredTool {
    pub fn new(specification: ToolSpecification, handler: Arc<dyn ToolHandler>) -> Self {
        Self {
            specification,
            handler,
        }
    }

    pub fn name(&self) -> &str {
        self.specification.name()
    }
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("name", &self.specification.name())
            .finish()
    }
}

/// Port implemented once per client profile.
pub trait ClientFunctions: Send + Sync {
    /// Text tools and their handlers.
    fn tools(&self) -> Vec<RegisteredTool>;

    /// Media validators keyed by step function id.
    fn media_tools(&self) -> HashMap<String, Arc<dyn MediaHandler>>;

    /// Specifications of the text tools.
    fn tool_specifications(&self) -> Vec<ToolSpecification> {
        self.tools().into_iter().map(|t| t.specification).collect()
    }
}
