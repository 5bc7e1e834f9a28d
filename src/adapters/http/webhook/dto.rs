//! Twilio webhook form decoding.
//!
//! Twilio posts `application/x-www-form-urlencoded` bodies whose media
//! fields are numbered (`MediaUrl0`, `MediaContentType0`, ...), so the
//! form is read as a flat map and normalised here.

use std::collections::HashMap;

use crate::application::InboundMessage;
use crate::domain::foundation::{ClientId, ValidationError};
use crate::domain::journey::MediaRef;

/// Message type Twilio reports for quick-reply button presses.
const BUTTON_MESSAGE_TYPE: &str = "button";

/// Upper bound on media entries read from one message.
const MAX_MEDIA: usize = 10;

/// Converts a webhook form into an [`InboundMessage`].
///
/// The client id is `WaId`; when it is absent the `From` address is used
/// without its channel prefix.
pub fn inbound_from_form(form: &HashMap<String, String>) -> Result<InboundMessage, ValidationError> {
    let sender = form
        .get("WaId")
        .map(String::as_str)
        .filter(|s| !s.trim().is_empty())
        .or_else(|| form.get("From").map(|from| strip_channel(from)))
        .unwrap_or_default();
    let client_id = ClientId::new(sender.trim())?;

    let body = form.get("Body").cloned().unwrap_or_default();
    let is_button = form
        .get("MessageType")
        .is_some_and(|t| t.eq_ignore_ascii_case(BUTTON_MESSAGE_TYPE));

    let num_media = form
        .get("NumMedia")
        .and_then(|n| n.trim().parse::<usize>().ok())
        .unwrap_or(0)
        .min(MAX_MEDIA);

    let media = (0..num_media).filter_map(|i| {
        let url = form.get(&format!("MediaUrl{}", i))?;
        let media = MediaRef::new(url.clone());
        Some(match form.get(&format!("MediaContentType{}", i)) {
            Some(content_type) => media.with_content_type(content_type.clone()),
            None => media,
        })
    });

    let message = if is_button {
        InboundMessage::button(client_id, body)
    } else {
        InboundMessage::text(client_id, body)
    };
    Ok(message.with_media(media))
}

fn strip_channel(address: &str) -> &str {
    address
        .split_once(':')
        .map(|(_, number)| number)
        .unwrap_or(address)
        .trim_start_matches('+')
}

/// Empty TwiML reply; outbound messages are sent through the API.
pub const EMPTY_TWIML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;
