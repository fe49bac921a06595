//! Request types for the gateway.
//!
//! The canonical request is the provider-agnostic shape callers send. It is
//! serialized to JSON and handed to the provider's request template as the
//! rendering context, so the field names below are part of the
//! template-authoring contract.

use crate::error::GatewayError;
use crate::types::ProviderId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Canonical gateway request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayRequest {
    /// Target provider
    pub provider_id: ProviderId,

    /// Endpoint name on the provider
    pub endpoint: String,

    /// Model key on the provider
    pub model_key: String,

    /// Conversation, in order
    pub messages: Vec<ChatMessage>,

    /// Request a server-sent event stream
    #[serde(default)]
    pub stream: bool,

    /// Tool definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,

    /// Tool choice directive
    #[serde(default)]
    pub tool_choice: ToolChoice,
}

impl GatewayRequest {
    /// Create a new builder for `GatewayRequest`
    #[must_use]
    pub fn builder(provider_id: ProviderId) -> GatewayRequestBuilder {
        GatewayRequestBuilder::new(provider_id)
    }

    /// Validate the request shape
    ///
    /// # Errors
    /// Returns error if any field is invalid
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.endpoint.trim().is_empty() {
            return Err(GatewayError::validation("endpoint is required", Some("endpoint")));
        }
        if self.model_key.trim().is_empty() {
            return Err(GatewayError::validation("model_key is required", Some("model_key")));
        }
        if self.messages.is_empty() {
            return Err(GatewayError::validation(
                "messages cannot be empty",
                Some("messages"),
            ));
        }

        for tool in &self.tools {
            if tool.tool_definition.name.trim().is_empty() {
                return Err(GatewayError::validation(
                    "tool name is required",
                    Some("tools"),
                ));
            }
        }

        if self.tool_choice.choice_type == ToolChoiceType::Function {
            let named = self
                .tool_choice
                .function_name
                .as_deref()
                .is_some_and(|name| !name.trim().is_empty());
            if !named {
                return Err(GatewayError::validation(
                    "tool_choice of type 'function' must name a function",
                    Some("tool_choice.function_name"),
                ));
            }
        }

        Ok(())
    }
}

/// Builder for `GatewayRequest`
#[derive(Debug)]
pub struct GatewayRequestBuilder {
    provider_id: ProviderId,
    endpoint: Option<String>,
    model_key: Option<String>,
    messages: Vec<ChatMessage>,
    stream: bool,
    tools: Vec<Tool>,
    tool_choice: ToolChoice,
}

impl GatewayRequestBuilder {
    fn new(provider_id: ProviderId) -> Self {
        Self {
            provider_id,
            endpoint: None,
            model_key: None,
            messages: Vec::new(),
            stream: false,
            tools: Vec::new(),
            tool_choice: ToolChoice::default(),
        }
    }

    /// Set the endpoint name
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the model key
    #[must_use]
    pub fn model_key(mut self, model_key: impl Into<String>) -> Self {
        self.model_key = Some(model_key.into());
        self
    }

    /// Append a message
    #[must_use]
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Request streaming
    #[must_use]
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Append a tool definition
    #[must_use]
    pub fn tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    /// Set the tool choice
    #[must_use]
    pub fn tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }

    /// Build the request
    ///
    /// # Errors
    /// Returns error if required fields are missing
    pub fn build(self) -> Result<GatewayRequest, GatewayError> {
        let request = GatewayRequest {
            provider_id: self.provider_id,
            endpoint: self.endpoint.unwrap_or_default(),
            model_key: self.model_key.unwrap_or_default(),
            messages: self.messages,
            stream: self.stream,
            tools: self.tools,
            tool_choice: self.tool_choice,
        };

        request.validate()?;
        Ok(request)
    }
}

/// Chat message with role and content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message author
    pub role: MessageRole,

    /// Content of the message
    pub content: MessageContent,

    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl ChatMessage {
    fn text(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Parts(vec![ContentPart::text(content)]),
            tool_calls: Vec::new(),
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(MessageRole::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(MessageRole::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(MessageRole::Assistant, content)
    }

    /// Create a tool result message
    #[must_use]
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: MessageContent::Parts(vec![ContentPart {
                part_type: PartType::ToolResult,
                body: content.into(),
                media_type: None,
                tool_call_id: Some(tool_call_id.into()),
            }]),
            tool_calls: Vec::new(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// Tool response message
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// Message content: plain text or structured parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text
    Text(String),
    /// Structured content parts
    Parts(Vec<ContentPart>),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl MessageContent {
    /// Concatenated text of all text parts
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter(|p| p.part_type == PartType::Text)
                .map(|p| p.body.as_str())
                .collect(),
        }
    }

    /// Check if content is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Parts(parts) => parts.is_empty(),
        }
    }
}

/// Kind of content part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartType {
    /// Text body
    Text,
    /// Base64 image body with a media type
    Image,
    /// Result of a tool call
    ToolResult,
}

/// One structured content part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    /// Part kind
    #[serde(rename = "type")]
    pub part_type: PartType,

    /// Part body
    #[serde(default)]
    pub body: String,

    /// Media type for images (JPEG, PNG, GIF or WebP)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    /// Tool call answered by a tool-result part
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ContentPart {
    /// Text part
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            part_type: PartType::Text,
            body: body.into(),
            media_type: None,
            tool_call_id: None,
        }
    }
}

/// Tool kind; only functions for now
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolType {
    /// Function tool
    #[default]
    Function,
}

/// A tool offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool kind
    #[serde(default)]
    pub tool_type: ToolType,

    /// Definition
    pub tool_definition: ToolDefinition,
}

/// Function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name
    pub name: String,

    /// What the function does
    #[serde(default)]
    pub description: String,

    /// Parameter schema
    #[serde(default)]
    pub parameters: ParameterSchema,
}

/// Parameter schema of a function
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Properties by name, in declaration order
    #[serde(default)]
    pub properties: IndexMap<String, ParameterProperty>,

    /// Required property names
    #[serde(default)]
    pub required: Vec<String>,
}

/// One parameter property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterProperty {
    /// JSON type name
    #[serde(rename = "type")]
    pub property_type: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Allowed values
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub r#enum: Vec<String>,

    /// Default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

/// Tool call emitted by the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier
    pub id: String,

    /// Tool kind
    #[serde(default)]
    pub tool_type: ToolType,

    /// Invocation
    pub call: FunctionCall,
}

/// Function invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name
    pub name: String,

    /// Arguments as a JSON string
    #[serde(default)]
    pub arg: String,
}

/// Tool choice mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoiceType {
    /// Never call a tool
    None,
    /// Model decides
    #[default]
    Auto,
    /// Must call the named function
    Function,
}

/// Tool choice directive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolChoice {
    /// Mode
    #[serde(rename = "type")]
    pub choice_type: ToolChoiceType,

    /// Function name, only for [`ToolChoiceType::Function`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
}

impl ToolChoice {
    /// Force a call to `name`
    #[must_use]
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            choice_type: ToolChoiceType::Function,
            function_name: Some(name.into()),
        }
    }
}
