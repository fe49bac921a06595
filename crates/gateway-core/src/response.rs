//! Canonical response types.
//!
//! The same shape is used for a buffered response and for each streamed
//! chunk. Response templates render provider output into this shape, so
//! decoding is deliberately forgiving: every field has a default, and empty
//! strings in enum positions read as "absent".

use crate::request::{MessageContent, MessageRole, ToolCall};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

/// Canonical gateway response or stream chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayResponse {
    /// Model that produced the response
    pub model: String,

    /// Choices, in index order
    pub choices: Vec<Choice>,

    /// Provider name echoed back
    pub provider: String,

    /// Token usage
    pub usage: Usage,

    /// Citations from search-augmented providers
    pub search_results: Vec<SearchResult>,
}

impl GatewayResponse {
    /// Text of the first choice's message, falling back to its delta
    #[must_use]
    pub fn first_text(&self) -> Option<String> {
        let choice = self.choices.first()?;
        let text = choice.message.content.text();
        if text.is_empty() {
            Some(choice.delta.content.text())
        } else {
            Some(text)
        }
    }
}

/// One completion choice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Choice {
    /// Position among the choices
    pub index: u32,

    /// Full message (buffered responses)
    pub message: ResponseMessage,

    /// Incremental message (stream chunks)
    pub delta: ResponseMessage,

    /// Why generation stopped
    #[serde(deserialize_with = "empty_as_none")]
    pub finish_reason: Option<FinishReason>,
}

/// Message or delta inside a choice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseMessage {
    /// Author role
    #[serde(deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub role: Option<MessageRole>,

    /// Content
    #[serde(deserialize_with = "null_as_default")]
    pub content: MessageContent,

    /// Tool calls
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

/// Why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop or stop sequence
    Stop,
    /// Token limit reached
    Length,
    /// Model requested tool calls
    #[serde(alias = "tool_call")]
    ToolCalls,
}

/// Token usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    /// Prompt tokens
    pub prompt_tokens: u32,
    /// Completion tokens
    pub completion_tokens: u32,
    /// Total tokens
    pub total_tokens: u32,
}

/// Search citation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    /// Title
    pub title: String,
    /// URL
    pub url: String,
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) if s.is_empty() => Ok(None),
        Some(v) => serde_json::from_value(v).map(Some).map_err(serde::de::Error::custom),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
