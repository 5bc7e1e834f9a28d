//! Response parser - extracts tool-call directives from model output.
//!
//! The model replies with free text that may contain blocks of the form:
//!
//! ```text
//! <tool_call>
//! {"name": "check_otp_valid", "arguments": {"value": "123456"}}
//! </tool_call>
//! ```
//!
//! Each block is decoded independently: strict JSON first, then a lenient
//! Python-literal pass (single quotes, `True`/`False`/`None`, trailing
//! commas). A broken block is reported as a [`DecodeError`] and the
//! remaining blocks are still returned.

use serde_json::{Map, Value};
use thiserror::Error;

use super::tool_call::ToolCallDirective;

const OPEN_TAG: &str = "<tool_call>";
const CLOSE_TAG: &str = "</tool_call>";

/// A fragment that could not be turned into a directive.
///
/// `index` is the zero-based position of the fragment in the response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("fragment {index}: not decodable as JSON or literal: {detail}")]
    Malformed { index: usize, detail: String },

    #[error("fragment {index}: missing key '{key}'")]
    MissingKey { index: usize, key: &'static str },

    #[error("fragment {index}: {detail}")]
    InvalidShape { index: usize, detail: String },

    #[error("fragment {index}: <tool_call> block is never closed")]
    Unterminated { index: usize },

    #[error("stray </tool_call> at byte {offset}")]
    StrayClose { offset: usize },
}

/// The tool-call markup itself is not well formed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("unbalanced tool_call markup: {0}")]
    Unbalanced(String),
}

/// Directives decoded from one response, plus per-fragment failures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    pub directives: Vec<ToolCallDirective>,
    pub errors: Vec<DecodeError>,
}

impl ParsedResponse {
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// True when every directive names the catch-all tool.
    pub fn all_catch_all(&self) -> bool {
        !self.directives.is_empty() && self.directives.iter().all(|d| d.is_catch_all())
    }
}

/// Outcome of extracting directives from a model response.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallExtraction {
    /// No decodable directive; any fragment errors are attached.
    NoDirective { errors: Vec<DecodeError> },
    /// At least one directive was decoded.
    Directives(ParsedResponse),
    /// The markup was malformed and nothing could be located.
    ParseFailure(MarkupError),
}

/// Stateless parser for the `<tool_call>` convention.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    /// Decodes every fragment in `raw`.
    ///
    /// Fails only when the markup is unbalanced and no complete fragment
    /// was found; otherwise markup problems are folded into `errors`.
    pub fn parse(&self, raw: &str) -> Result<ParsedResponse, MarkupError> {
        let located = locate_fragments(raw);

        if located.fragments.is_empty() {
            if let Some(issue) = located.issues.first() {
                return Err(MarkupError::Unbalanced(issue.to_string()));
            }
        }

        let mut parsed = ParsedResponse::default();
        for &(index, body) in &located.fragments {
            match decode_fragment(index, body) {
                Ok(directive) => parsed.directives.push(directive),
                Err(err) => {
                    tracing::warn!(fragment = index, error = %err, "Skipping malformed tool call");
                    parsed.errors.push(err);
                }
            }
        }
        for issue in located.issues {
            tracing::warn!(error = %issue, "Unbalanced tool call markup");
            parsed.errors.push(issue);
        }

        Ok(parsed)
    }

    /// Parses and classifies the response into a tagged result.
    pub fn extract(&self, raw: &str) -> ToolCallExtraction {
        match self.parse(raw) {
            Ok(parsed) if parsed.is_empty() => ToolCallExtraction::NoDirective {
                errors: parsed.errors,
            },
            Ok(parsed) => ToolCallExtraction::Directives(parsed),
            Err(err) => ToolCallExtraction::ParseFailure(err),
        }
    }
}

struct LocatedFragments<'a> {
    /// Complete fragment bodies with their block position.
    fragments: Vec<(usize, &'a str)>,
    issues: Vec<DecodeError>,
}

/// Finds the bodies of all complete `<tool_call>` blocks.
///
/// Every open tag takes the next block position, whether or not it is
/// closed. An open tag followed by another open tag before any close tag
/// is unterminated; the scan resumes at the second open tag.
fn locate_fragments(raw: &str) -> LocatedFragments<'_> {
    let mut fragments = Vec::new();
    let mut issues = Vec::new();
    let mut cursor = 0;
    let mut position = 0;

    while cursor < raw.len() {
        let rest = &raw[cursor..];
        let Some((idx, tag)) = find_first_tag(rest, &[OPEN_TAG, CLOSE_TAG]) else {
            break;
        };

        if tag == CLOSE_TAG {
            issues.push(DecodeError::StrayClose {
                offset: cursor + idx,
            });
            cursor += idx + CLOSE_TAG.len();
            continue;
        }

        let index = position;
        position += 1;

        let body_start = cursor + idx + OPEN_TAG.len();
        let body = &raw[body_start..];
        let close = body.find(CLOSE_TAG);
        let reopen = body.find(OPEN_TAG);

        match (close, reopen) {
            (Some(close), Some(reopen)) if reopen < close => {
                issues.push(DecodeError::Unterminated { index });
                cursor = body_start + reopen;
            }
            (Some(close), _) => {
                fragments.push((index, &body[..close]));
                cursor = body_start + close + CLOSE_TAG.len();
            }
            (None, _) => {
                issues.push(DecodeError::Unterminated { index });
                break;
            }
        }
    }

    LocatedFragments { fragments, issues }
}

fn find_first_tag<'a>(haystack: &str, tags: &'a [&'a str]) -> Option<(usize, &'a str)> {
    tags.iter()
        .filter_map(|tag| haystack.find(tag).map(|idx| (idx, *tag)))
        .min_by_key(|(idx, _)| *idx)
}

fn decode_fragment(index: usize, body: &str) -> Result<ToolCallDirective, DecodeError> {
    let text = strip_code_fence(body.trim());

    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(strict) => python_literal_to_json(text)
            .and_then(|json| serde_json::from_str::<Value>(&json).ok())
            .ok_or_else(|| DecodeError::Malformed {
                index,
                detail: strict.to_string(),
            })?,
    };

    directive_from_value(index, value)
}

fn directive_from_value(index: usize, value: Value) -> Result<ToolCallDirective, DecodeError> {
    let Value::Object(mut object) = value else {
        return Err(DecodeError::InvalidShape {
            index,
            detail: "expected an object".to_string(),
        });
    };

    let name = match object.remove("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        Some(_) => {
            return Err(DecodeError::InvalidShape {
                index,
                detail: "'name' must be a non-empty string".to_string(),
            })
        }
        None => return Err(DecodeError::MissingKey { index, key: "name" }),
    };

    let arguments = match object.remove("arguments") {
        Some(Value::Object(arguments)) => arguments,
        Some(Value::String(encoded)) => decode_string_arguments(&encoded).ok_or_else(|| {
            DecodeError::InvalidShape {
                index,
                detail: "'arguments' string is not an encoded object".to_string(),
            }
        })?,
        Some(_) => {
            return Err(DecodeError::InvalidShape {
                index,
                detail: "'arguments' must be an object".to_string(),
            })
        }
        None => {
            return Err(DecodeError::MissingKey {
                index,
                key: "arguments",
            })
        }
    };

    Ok(ToolCallDirective::new(name, arguments))
}

/// Some models emit `"arguments": "{\"value\": \"x\"}"`.
fn decode_string_arguments(encoded: &str) -> Option<Map<String, Value>> {
    let parsed = serde_json::from_str::<Value>(encoded).ok().or_else(|| {
        python_literal_to_json(encoded).and_then(|json| serde_json::from_str(&json).ok())
    })?;
    match parsed {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop the info string ("json", "python") on the opening fence line.
    match inner.find('\n') {
        Some(newline) if !inner[..newline].contains('{') => inner[newline + 1..].trim(),
        _ => inner.trim(),
    }
}

/// Rewrites a Python literal expression as JSON text.
///
/// Handles single- and double-quoted strings, `True`/`False`/`None`, and
/// trailing commas. Returns `None` for bare identifiers it cannot map.
fn python_literal_to_json(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' | '"' => {
                let mut literal = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next()? {
                            'n' => literal.push('\n'),
                            't' => literal.push('\t'),
                            'r' => literal.push('\r'),
                            other @ ('\'' | '"' | '\\') => literal.push(other),
                            other => {
                                literal.push('\\');
                                literal.push(other);
                            }
                        },
                        c if c == ch => {
                            closed = true;
                            break;
                        }
                        c => literal.push(c),
                    }
                }
                if !closed {
                    return None;
                }
                out.push_str(&serde_json::to_string(&literal).ok()?);
            }
            '}' | ']' => {
                let trimmed_len = out.trim_end().len();
                out.truncate(trimmed_len);
                if out.ends_with(',') {
                    out.pop();
                }
                out.push(ch);
            }
            // Exponents such as `1e5` stay part of the number.
            c if (c.is_ascii_alphabetic() || c == '_')
                && !out.ends_with(|p: char| p.is_ascii_digit() || p == '.') =>
            {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match word.as_str() {
                    "True" | "true" => out.push_str("true"),
                    "False" | "false" => out.push_str("false"),
                    "None" | "null" => out.push_str("null"),
                    _ => return None,
                }
            }
            c => out.push(c),
        }
    }

    Some(out)
}
