//! Step descriptor - one verification step in a client journey.

use serde::{Deserialize, Serialize};

/// A media item received for a step.
///
/// Deserializes from either a bare URL string or an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MediaRefRepr")]
pub struct MediaRef {
    /// Where the media can be fetched from.
    pub url: String,
    /// Content type reported by the channel, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl MediaRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MediaRefRepr {
    Url(String),
    Full {
        url: String,
        #[serde(default)]
        content_type: Option<String>,
    },
}

impl From<MediaRefRepr> for MediaRef {
    fn from(repr: MediaRefRepr) -> Self {
        match repr {
            MediaRefRepr::Url(url) => MediaRef::new(url),
            MediaRefRepr::Full { url, content_type } => MediaRef { url, content_type },
        }
    }
}

/// One step of a verification journey.
///
/// Wire names follow the contact registration payload (`function`,
/// `value`, `accept`); the Rust-side names are used as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDescriptor {
    /// The handler/tool this step is bound to.
    #[serde(rename = "function", alias = "function_id")]
    pub function_id: String,

    /// What the step asks for, in domain terms.
    #[serde(rename = "value", alias = "prompt_value")]
    pub prompt_value: String,

    /// Why it is needed; grounds retry phrasing.
    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub require_images: bool,

    /// Accepted media content types. Empty accepts anything.
    #[serde(default, rename = "accept", alias = "accepted_media_types")]
    pub accepted_media_types: Vec<String>,

    /// Catalog functions offered while this step is active.
    ///
    /// Empty means only the step's own function.
    #[serde(default)]
    pub available_functions: Vec<String>,

    #[serde(default)]
    pub images: Vec<MediaRef>,

    #[serde(default)]
    pub complete: bool,
}

impl StepDescriptor {
    /// Creates an incomplete text step.
    pub fn new(
        function_id: impl Into<String>,
        prompt_value: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            function_id: function_id.into(),
            prompt_value: prompt_value.into(),
            summary: summary.into(),
            require_images: false,
            accepted_media_types: Vec::new(),
            available_functions: Vec::new(),
            images: Vec::new(),
            complete: false,
        }
    }

    /// Marks the step as a media step accepting the given content types.
    pub fn requiring_images<S: Into<String>>(mut self, accepted: impl IntoIterator<Item = S>) -> Self {
        self.require_images = true;
        self.accepted_media_types = accepted.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_available_functions<S: Into<String>>(
        mut self,
        functions: impl IntoIterator<Item = S>,
    ) -> Self {
        self.available_functions = functions.into_iter().map(Into::into).collect();
        self
    }

    /// Functions the model may call while this step is active.
    pub fn offered_functions(&self) -> Vec<String> {
        if self.available_functions.is_empty() {
            vec![self.function_id.clone()]
        } else {
            self.available_functions.clone()
        }
    }

    /// Checks a content type against the accepted set.
    ///
    /// Parameters such as `; charset=` are ignored.
    pub fn accepts(&self, content_type: &str) -> bool {
        if self.accepted_media_types.is_empty() {
            return true;
        }
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.accepted_media_types.iter().any(|accepted| {
            let accepted = accepted.trim().to_ascii_lowercase();
            match accepted.strip_suffix("/*") {
                Some(major) => essence.split('/').next() == Some(major),
                None => accepted == essence,
            }
        })
    }
}
