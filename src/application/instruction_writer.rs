//! Instruction writer - model-phrased outgoing messages.
//!
//! Every method degrades to a deterministic text when the model fails or
//! returns nothing, so an unreachable model never silences a reply.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::foundation::ClientId;
use crate::domain::journey::StepDescriptor;
use crate::ports::{AIProvider, CompletionRequest, MessageRole, RequestMetadata};

/// Phrasing settings.
#[derive(Debug, Clone)]
pub struct InstructionConfig {
    /// Institution the assistant speaks for.
    pub institution: String,
    /// Site offered to clients who ask for more information.
    pub website: Option<String>,
    /// Language replies are written in.
    pub language: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for InstructionConfig {
    fn default() -> Self {
        Self {
            institution: "our institution".to_string(),
            website: None,
            language: "Spanish".to_string(),
            temperature: 0.3,
            max_tokens: 300,
        }
    }
}

/// Writes step instructions, retries and conversational replies.
pub struct InstructionWriter {
    ai_provider: Arc<dyn AIProvider>,
    config: InstructionConfig,
}

impl InstructionWriter {
    pub fn new(ai_provider: Arc<dyn AIProvider>, config: InstructionConfig) -> Self {
        Self {
            ai_provider,
            config,
        }
    }

    pub fn config(&self) -> &InstructionConfig {
        &self.config
    }

    /// Asks the client for what `step` needs.
    pub async fn request_step(&self, client_id: &ClientId, step: &StepDescriptor) -> String {
        let ask = if step.require_images {
            format!(
                "Write a message asking the client to send a photo of: {}, which is needed for: {}.",
                step.prompt_value, step.summary
            )
        } else {
            format!(
                "Write a message asking the client for: {}, which is needed for: {}.",
                step.prompt_value, step.summary
            )
        };

        self.generate(client_id, "request_step", &self.support_system(), &ask)
            .await
            .unwrap_or_else(|| fallback_request(step))
    }

    /// Re-asks for `step`, grounded on what the client said and on any
    /// detail a handler returned.
    pub async fn explain_step(
        &self,
        client_id: &ClientId,
        step: &StepDescriptor,
        user_input: &str,
        detail: Option<&Value>,
    ) -> String {
        let mut ask = format!(
            "The client wrote: \"{}\".\nThe verification step in progress is: {} and its purpose is: {}.",
            user_input, step.prompt_value, step.summary
        );
        if let Some(detail) = detail {
            ask.push_str(&format!("\nValidation detail: {}.", render_detail(detail)));
        }
        ask.push_str(
            "\nAnswer the client's doubt briefly using only this context, do not mention other \
steps, and ask again for what the step needs.",
        );

        self.generate(client_id, "explain_step", &self.support_system(), &ask)
            .await
            .unwrap_or_else(|| fallback_retry(step))
    }

    /// Rephrases a handler message before it is sent.
    pub async fn rephrase(&self, client_id: &ClientId, step: &StepDescriptor, message: &str) -> String {
        let ask = format!(
            "Rephrase this message for the client, keeping its meaning: \"{}\". \
The verification step in progress is: {}.",
            message, step.prompt_value
        );

        self.generate(client_id, "rephrase", &self.support_system(), &ask)
            .await
            .unwrap_or_else(|| message.to_string())
    }

    /// Free-text reply for input that matched no function.
    pub async fn generic_reply(&self, client_id: &ClientId, user_input: &str) -> String {
        let mut system = format!(
            "You are a virtual assistant for {}. Answer only with information you know, stay \
within the given context and answer in {}.",
            self.config.institution, self.config.language
        );
        if let Some(website) = &self.config.website {
            system.push_str(&format!(" For more information, refer the client to {}.", website));
        }

        self.generate(client_id, "generic_reply", &system, user_input)
            .await
            .unwrap_or_else(|| {
                format!(
                    "Thanks for your message. I'm the virtual assistant of {} and I'm here to help you.",
                    self.config.institution
                )
            })
    }

    /// First-contact greeting.
    pub async fn greeting(&self, client_id: &ClientId) -> String {
        let system = format!(
            "You are a virtual assistant for {}. Answer in {}.",
            self.config.institution, self.config.language
        );
        let ask = "Introduce yourself. Be polite and make the client feel safe; explain that you \
will guide them through their verification and are at their disposal.";

        self.generate(client_id, "greeting", &system, ask)
            .await
            .unwrap_or_else(|| {
                format!(
                    "Hi! I'm the virtual assistant of {}. I'll guide you through your verification.",
                    self.config.institution
                )
            })
    }

    fn support_system(&self) -> String {
        format!(
            "You keep helping the client over chat to finish their process for {}. Do not greet \
(no hello or good morning). Be brief and answer in {}.",
            self.config.institution, self.config.language
        )
    }

    async fn generate(
        &self,
        client_id: &ClientId,
        purpose: &str,
        system: &str,
        prompt: &str,
    ) -> Option<String> {
        let request = CompletionRequest::new(RequestMetadata::for_client(client_id.clone(), purpose))
            .with_system_prompt(system)
            .with_message(MessageRole::User, prompt)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        match self.ai_provider.complete(request).await {
            Ok(response) => {
                let text = response.content.trim();
                if text.is_empty() {
                    tracing::warn!(client_id = %client_id, purpose, "Model returned empty text");
                    None
                } else {
                    Some(text.to_string())
                }
            }
            Err(err) => {
                tracing::warn!(client_id = %client_id, purpose, error = %err, "Using fallback text");
                None
            }
        }
    }
}

fn fallback_request(step: &StepDescriptor) -> String {
    let verb = if step.require_images {
        "Please send a photo of"
    } else {
        "Please send"
    };
    if step.summary.trim().is_empty() {
        format!("{} {}.", verb, step.prompt_value)
    } else {
        format!("{} {}. We need it to {}.", verb, step.prompt_value, step.summary)
    }
}

fn fallback_retry(step: &StepDescriptor) -> String {
    format!(
        "We could not validate that. Please send {} again.",
        step.prompt_value
    )
}

fn render_detail(detail: &Value) -> String {
    match detail {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
