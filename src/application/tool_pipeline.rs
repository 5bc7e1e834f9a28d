//! Tool-call pipeline - model → parser → validator → dispatcher.
//!
//! One run interprets a single client message for the active step: the
//! model sees only the functions the step offers plus the catch-all, its
//! reply is parsed into directives, and the directives are validated and
//! dispatched against that same restricted catalog.

use std::sync::Arc;

use crate::domain::journey::StepDescriptor;
use crate::domain::tools::{MarkupError, ResponseParser, ToolCallExtraction, ToolCatalog};
use crate::ports::{AIError, AIProvider, CompletionRequest, ExecutionContext, MessageRole, RequestMetadata};

use super::dispatcher::{BatchOutcome, DispatchedCall, FunctionDispatcher, NoActionReason};

/// Request purpose recorded on tool-call completions.
pub const TOOL_CALL_PURPOSE: &str = "tool_call";

/// Model settings for tool-call requests.
#[derive(Debug, Clone)]
pub struct ToolPipelineConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ToolPipelineConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 512,
        }
    }
}

/// What a pipeline run produced.
#[derive(Debug)]
pub enum PipelineResult {
    /// Nothing to act on; the caller falls back to a conversational reply.
    NoDirective(NoActionReason),
    /// Outcomes of the dispatched calls, in parse order.
    Outcomes(Vec<DispatchedCall>),
    /// The tool-call markup could not be located at all.
    ParseFailure(MarkupError),
    /// The model could not be reached.
    Unavailable(AIError),
}

/// Runs client messages through the tool-calling pipeline.
pub struct ToolCallPipeline {
    ai_provider: Arc<dyn AIProvider>,
    dispatcher: Arc<FunctionDispatcher>,
    catalog: Arc<ToolCatalog>,
    parser: ResponseParser,
    config: ToolPipelineConfig,
}

impl ToolCallPipeline {
    pub fn new(
        ai_provider: Arc<dyn AIProvider>,
        dispatcher: Arc<FunctionDispatcher>,
        catalog: Arc<ToolCatalog>,
    ) -> Self {
        Self {
            ai_provider,
            dispatcher,
            catalog,
            parser: ResponseParser::new(),
            config: ToolPipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ToolPipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Interprets `input` against the functions offered by `step`.
    pub async fn run(
        &self,
        input: &str,
        step: &StepDescriptor,
        context: &ExecutionContext,
    ) -> PipelineResult {
        let offered = self.catalog.restricted_to(&step.offered_functions());

        let request = CompletionRequest::new(RequestMetadata::for_client(
            context.client_id.clone(),
            TOOL_CALL_PURPOSE,
        ))
        .with_system_prompt(tool_calling_prompt(&offered))
        .with_message(MessageRole::User, input)
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens);

        let raw = match self.ai_provider.complete(request).await {
            Ok(response) => response.content,
            Err(err) => {
                tracing::warn!(
                    client_id = %context.client_id,
                    step = %step.function_id,
                    error = %err,
                    "Model unavailable for tool call"
                );
                return PipelineResult::Unavailable(err);
            }
        };

        match self.parser.extract(&raw) {
            ToolCallExtraction::NoDirective { errors } => {
                tracing::debug!(
                    client_id = %context.client_id,
                    decode_errors = errors.len(),
                    "No tool call in model reply"
                );
                PipelineResult::NoDirective(NoActionReason::NoToolCall)
            }
            ToolCallExtraction::ParseFailure(err) => {
                tracing::warn!(client_id = %context.client_id, error = %err, "Unparseable tool call reply");
                PipelineResult::ParseFailure(err)
            }
            ToolCallExtraction::Directives(parsed) => {
                match self
                    .dispatcher
                    .dispatch_batch(&parsed.directives, &offered, context)
                    .await
                {
                    BatchOutcome::Dispatched(calls) => PipelineResult::Outcomes(calls),
                    BatchOutcome::NoActionable(reason) => PipelineResult::NoDirective(reason),
                }
            }
        }
    }
}

/// System prompt offering `catalog` to the model.
pub fn tool_calling_prompt(catalog: &ToolCatalog) -> String {
    let tools = catalog
        .to_openai_tools()
        .iter()
        .map(|tool| tool.to_string())
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a function calling AI model. You are provided with function signatures \
within <tools></tools> XML tags. You may call one or more functions to assist with the user \
query. Don't make assumptions about what values to plug into functions. Transform quantities \
to numbers. Here are the available tools:\n<tools>\n{tools}\n</tools>\n\n\
For each function call return a json object with function name and arguments within \
<tool_call></tool_call> XML tags as follows:\n\
<tool_call>\n{{\"name\": <function-name>, \"arguments\": <args-dict>}}\n</tool_call>\n\n\
If the input is a question or a doubt from the user, or matches none of the functions, \
always call generic_response."
    )
}
