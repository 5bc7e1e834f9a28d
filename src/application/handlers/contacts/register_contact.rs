//! RegisterContactHandler - Command handler for inviting a client.

use std::sync::Arc;

use thiserror::Error;

use crate::application::client_locks::ClientLocks;
use crate::application::messages::ConversationMessages;
use crate::domain::foundation::{ClientId, ReportId};
use crate::domain::journey::StepDescriptor;
use crate::ports::{JourneyStore, JourneyStoreError, MessageSender};

/// Command to register (or refresh) a contact.
#[derive(Debug, Clone)]
pub struct RegisterContactCommand {
    pub client_id: ClientId,
    pub report_id: ReportId,
    pub steps: Vec<StepDescriptor>,
    /// Overrides the configured welcome text.
    pub welcome_message: Option<String>,
}

/// Errors from contact registration.
#[derive(Debug, Error)]
pub enum RegisterContactError {
    #[error("a contact needs at least one step")]
    NoSteps,

    #[error(transparent)]
    Store(#[from] JourneyStoreError),
}

/// Result of a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterContactResult {
    pub client_id: ClientId,
    pub staged_steps: usize,
    /// Whether the welcome messages were delivered.
    pub notified: bool,
}

/// Handler for registering contacts.
///
/// Steps are staged, not installed: a live journey in progress is left
/// as it is until the client presses start again.
pub struct RegisterContactHandler {
    store: Arc<dyn JourneyStore>,
    sender: Arc<dyn MessageSender>,
    messages: ConversationMessages,
    institution: String,
    locks: ClientLocks,
}

impl RegisterContactHandler {
    pub fn new(
        store: Arc<dyn JourneyStore>,
        sender: Arc<dyn MessageSender>,
        institution: impl Into<String>,
    ) -> Self {
        Self {
            store,
            sender,
            messages: ConversationMessages::default(),
            institution: institution.into(),
            locks: ClientLocks::new(),
        }
    }

    pub fn with_messages(mut self, messages: ConversationMessages) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_locks(mut self, locks: ClientLocks) -> Self {
        self.locks = locks;
        self
    }

    pub async fn handle(
        &self,
        cmd: RegisterContactCommand,
    ) -> Result<RegisterContactResult, RegisterContactError> {
        if cmd.steps.is_empty() {
            return Err(RegisterContactError::NoSteps);
        }
        let staged_steps = cmd.steps.len();

        {
            let _turn = self.locks.acquire(&cmd.client_id).await;
            self.store
                .register_contact(&cmd.client_id, cmd.report_id.clone(), cmd.steps)
                .await?;
        }

        tracing::info!(
            client_id = %cmd.client_id,
            report_id = %cmd.report_id,
            steps = staged_steps,
            "Contact registered"
        );

        let welcome = cmd
            .welcome_message
            .filter(|w| !w.trim().is_empty())
            .unwrap_or_else(|| self.messages.welcome_for(&self.institution));

        let mut notified = true;
        for text in [welcome.as_str(), self.messages.additional_info.as_str()] {
            if let Err(err) = self.sender.send_text(&cmd.client_id, text).await {
                tracing::error!(client_id = %cmd.client_id, error = %err, "Failed to send welcome");
                notified = false;
                break;
            }
        }

        Ok(RegisterContactResult {
            client_id: cmd.client_id,
            staged_steps,
            notified,
        })
    }
}
