//! Application layer - Orchestration, tool dispatch and command handlers.
//!
//! This layer coordinates domain operations through ports. The message
//! handler drives one conversational turn; the tool pipeline and the
//! dispatcher turn model output into handler invocations.

pub mod client_locks;
pub mod dispatcher;
pub mod handlers;
pub mod instruction_writer;
pub mod messages;
pub mod profiles;
pub mod tool_pipeline;

pub use client_locks::{ClientLocks, ClientTurnGuard};
pub use dispatcher::{BatchOutcome, DispatchedCall, FunctionDispatcher, NoActionReason};
pub use handlers::{
    ConversationTurn, HandleMessageHandler, InboundMessage, RegisterContactCommand,
    RegisterContactError, RegisterContactHandler, RegisterContactResult, RemoveContactHandler,
};
pub use instruction_writer::{InstructionConfig, InstructionWriter};
pub use messages::ConversationMessages;
pub use profiles::{IdentityProfile, IdentityProfileConfig};
pub use tool_pipeline::{PipelineResult, ToolCallPipeline, ToolPipelineConfig};
