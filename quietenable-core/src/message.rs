use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Represents the role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model
    System,
    /// Message from the user
    User,
    /// Message from the assistant
    Assistant,
    /// Result of a tool call, sent back to the model
    Tool,
}

impl Role {
    /// Returns the wire name of the role
    ///
    /// # Examples
    ///
    /// ```
    /// use quietenable_core::Role;
    ///
    /// assert_eq!(Role::Tool.as_str(), "tool");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// The function half of a tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the declared tool the model wants to call
    pub name: String,
    /// Arguments as the model produced them, normally a JSON object string
    pub arguments: String,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Opaque id, echoed back in the matching tool message
    pub id: String,
    /// Always "function" for the providers we talk to
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

/// Treats an explicit `null` like a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ToolCall {
    /// Creates a function tool call
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Decodes the argument blob into a caller-chosen type
    ///
    /// The client itself never looks inside the arguments; this is purely a
    /// convenience for code that executes the tool.
    pub fn parse_arguments<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.function.arguments)
    }
}

/// One turn of a conversation
///
/// A `Vec<Message>` is sent to the provider in exactly the order given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    /// Text content; assistant messages that only call tools carry none
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tool_calls: Vec<ToolCall>,
    /// Set on tool messages, referencing the call being answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: Option<String>) -> Self {
        Self {
            role,
            content,
            name: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Creates a system message
    ///
    /// # Examples
    ///
    /// ```
    /// use quietenable_core::{Message, Role};
    ///
    /// let msg = Message::system("You are terse.");
    /// assert_eq!(msg.role, Role::System);
    /// ```
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, Some(content.into()))
    }

    /// Creates a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, Some(content.into()))
    }

    /// Creates a user message with a participant name
    pub fn user_with_name(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::user(content)
        }
    }

    /// Creates an assistant message with text content
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, Some(content.into()))
    }

    /// Creates an assistant message that only carries tool calls
    pub fn assistant_with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::with_role(Role::Assistant, None)
        }
    }

    /// Creates a tool result message answering `tool_call_id`
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_role(Role::Tool, Some(content.into()))
        }
    }

    /// Text content, if any
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// True when the message requests at least one tool call
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_message_wire_shape() {
        let value = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_tool_call_message_keeps_null_content() {
        let msg = Message::assistant_with_tool_calls(vec![ToolCall::new(
            "call_1",
            "get_weather",
            r#"{"location":"Oslo"}"#,
        )]);
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["content"], serde_json::Value::Null);
        assert_eq!(value["tool_calls"][0]["type"], "function");
        assert_eq!(value["tool_calls"][0]["function"]["name"], "get_weather");
    }

    #[test]
    fn test_tool_message_references_call() {
        let msg = Message::tool("call_1", "12C and cloudy");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_deserialize_assistant_without_content() {
        let msg: Message = serde_json::from_value(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_9",
                "type": "function",
                "function": {"name": "lookup", "arguments": "{}"}
            }]
        }))
        .unwrap();

        assert!(msg.text().is_none());
        assert!(msg.has_tool_calls());
        assert_eq!(msg.tool_calls[0].id, "call_9");

        let plain: Message =
            serde_json::from_value(json!({"role": "assistant", "content": "ok", "tool_calls": null}))
                .unwrap();
        assert!(!plain.has_tool_calls());
    }

    #[test]
    fn test_parse_arguments() {
        #[derive(Deserialize)]
        struct Args {
            location: String,
        }

        let call = ToolCall::new("c", "get_weather", r#"{"location":"Lima"}"#);
        let args: Args = call.parse_arguments().unwrap();
        assert_eq!(args.location, "Lima");

        let bad = ToolCall::new("c", "get_weather", "not json");
        assert!(bad.parse_arguments::<Args>().is_err());
    }
}
