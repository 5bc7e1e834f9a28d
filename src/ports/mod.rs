//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Collaborator Ports
//!
//! - `AIProvider` - Text generation by a language model
//! - `JourneyStore` - Persistence of client journeys
//! - `MessageSender` - Outbound messages on the messaging channel
//! - `MediaFetcher` - Download of media sent by clients
//! - `VerificationService` - External identity-verification API
//!
//! ## Handler Ports
//!
//! - `ToolHandler` - Business handler behind a catalog function
//! - `MediaHandler` - Validator for media steps
//! - `ClientFunctions` - The tool and media capability set of a client profile

mod ai_provider;
mod client_functions;
mod journey_store;
mod media_fetcher;
mod media_handler;
mod message_sender;
mod tool_handler;
mod verification_service;

pub use ai_provider::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, Message,
    MessageRole, ProviderInfo, RequestMetadata, TokenUsage,
};
pub use client_functions::{ClientFunctions, RegisteredTool};
pub use journey_store::{JourneyStore, JourneyStoreError};
pub use media_fetcher::{FetchedMedia, MediaFetchError, MediaFetcher};
pub use media_handler::{MediaDisposition, MediaHandler, MediaVerdict};
pub use message_sender::{MessageSender, SendError};
pub use tool_handler::{ExecutionContext, HandlerError, ToolHandler};
pub use verification_service::{
    AddressExtraction, FaceQuality, IdExtraction, LivenessCheck, VerificationError,
    VerificationService,
};
