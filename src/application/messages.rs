//! Fixed texts sent to clients.

/// Configurable message templates.
///
/// `welcome` may contain `{institution}`, which is replaced on use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationMessages {
    pub welcome: String,
    pub additional_info: String,
    /// Hint sent to clients who write before starting the flow.
    pub start_process: String,
    pub processing_notice: String,
    pub journey_complete: String,
    /// Sent when the model or the store cannot be reached.
    pub retry_fallback: String,
    /// Sent when media arrives for a step that expects text.
    pub media_not_required: String,
    /// Sent when an image step has no media validator.
    pub unrecognised_function: String,
}

impl Default for ConversationMessages {
    fn default() -> Self {
        Self {
            welcome: "Hello! {institution} has invited you to complete your identity verification \
over this chat."
                .to_string(),
            additional_info: "Have your ID card and a recent proof of address at hand. \
Press \"Start\" when you are ready."
                .to_string(),
            start_process: "To begin your verification, press the \"Start\" button.".to_string(),
            processing_notice: "We are processing your image, this may take a few seconds."
                .to_string(),
            journey_complete: "Your verification is complete. Thank you! We will contact you \
with the next steps."
                .to_string(),
            retry_fallback: "Sorry, we could not process your message right now. Please try again \
in a moment."
                .to_string(),
            media_not_required: "This step does not need an image. Please reply with text."
                .to_string(),
            unrecognised_function: "We could not validate this step. Please contact support."
                .to_string(),
        }
    }
}

impl ConversationMessages {
    /// The welcome text with the institution filled in.
    pub fn welcome_for(&self, institution: &str) -> String {
        self.welcome.replace("{institution}", institution)
    }
}
