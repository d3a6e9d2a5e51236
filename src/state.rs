//! Shared conversation state threaded through every node invocation.
//!
//! [`ConversationState`] is the single mutable resource in a supervisor
//! workflow: an ordered, append-only message history. Nodes never rewrite
//! prior messages; they return messages to append, and the executor threads
//! the accumulated state through one node at a time. The only apparent
//! exception is the forward-message tool, which re-emits an existing
//! message's content verbatim under a new speaker.
//!
//! Messages are the request-side `async-openai` chat types, so a state can be
//! handed to any model provider without translation.

use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContent,
};
use serde::{Deserialize, Serialize};

/// Ordered message history shared by the supervisor and its workers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    pub messages: Vec<ChatCompletionRequestMessage>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State seeded with a single user request.
    pub fn from_user(text: impl Into<String>) -> Self {
        Self {
            messages: vec![user_message(text)],
        }
    }

    pub fn push(&mut self, message: ChatCompletionRequestMessage) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = ChatCompletionRequestMessage>) {
        self.messages.extend(messages);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Text of the most recent assistant message, if any.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(assistant_text)
    }

    /// Most recent assistant message attributed to a specific agent other
    /// than `exclude`. This is the source the forward-message tool re-emits.
    pub fn last_attributed_assistant(&self, exclude: &str) -> Option<(&str, &str)> {
        self.messages.iter().rev().find_map(|m| match m {
            ChatCompletionRequestMessage::Assistant(a) => match (&a.name, &a.content) {
                (Some(name), Some(ChatCompletionRequestAssistantMessageContent::Text(text)))
                    if name != exclude =>
                {
                    Some((text.as_str(), name.as_str()))
                }
                _ => None,
            },
            _ => None,
        })
    }
}

/// Build a user message from plain text.
pub fn user_message(text: impl Into<String>) -> ChatCompletionRequestMessage {
    ChatCompletionRequestUserMessageArgs::default()
        .content(text.into())
        .build()
        .expect("user message")
        .into()
}

/// Build an assistant message, optionally attributed to a named agent.
pub fn assistant_message(
    text: impl Into<String>,
    name: Option<&str>,
) -> ChatCompletionRequestMessage {
    let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
    builder.content(text.into());
    if let Some(n) = name {
        builder.name(n);
    }
    builder.build().expect("assistant message").into()
}

/// Extract plain text from a user or assistant message.
pub fn message_text(message: &ChatCompletionRequestMessage) -> Option<&str> {
    match message {
        ChatCompletionRequestMessage::User(u) => match &u.content {
            ChatCompletionRequestUserMessageContent::Text(t) => Some(t.as_str()),
            _ => None,
        },
        _ => assistant_text(message),
    }
}

fn assistant_text(message: &ChatCompletionRequestMessage) -> Option<&str> {
    match message {
        ChatCompletionRequestMessage::Assistant(a) => match &a.content {
            Some(ChatCompletionRequestAssistantMessageContent::Text(t)) => Some(t.as_str()),
            _ => None,
        },
        _ => None,
    }
}

/// Agent name attributed to an assistant message, if any.
pub fn assistant_name(message: &ChatCompletionRequestMessage) -> Option<&str> {
    match message {
        ChatCompletionRequestMessage::Assistant(a) => a.name.as_deref(),
        _ => None,
    }
}

/// Rebuild an assistant message with an agent-name attribution, preserving
/// content and tool calls. Non-assistant messages pass through unchanged.
pub fn attribute_to(
    message: ChatCompletionRequestMessage,
    name: &str,
) -> ChatCompletionRequestMessage {
    match message {
        ChatCompletionRequestMessage::Assistant(a) => {
            let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
            if let Some(ChatCompletionRequestAssistantMessageContent::Text(t)) = a.content {
                builder.content(t);
            }
            if let Some(tool_calls) = a.tool_calls {
                builder.tool_calls(tool_calls);
            }
            builder.name(name);
            builder.build().expect("assistant message").into()
        }
        other => other,
    }
}

/// Attribute the final assistant message of an update to the acting agent.
pub(crate) fn attribute_last_assistant(
    mut messages: Vec<ChatCompletionRequestMessage>,
    name: &str,
) -> Vec<ChatCompletionRequestMessage> {
    if let Some(idx) = messages
        .iter()
        .rposition(|m| matches!(m, ChatCompletionRequestMessage::Assistant(_)))
    {
        let msg = messages.remove(idx);
        messages.insert(idx, attribute_to(msg, name));
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_user_seeds_one_message() {
        let state = ConversationState::from_user("hello");
        assert_eq!(state.len(), 1);
        assert_eq!(message_text(&state.messages[0]), Some("hello"));
    }

    #[test]
    fn last_attributed_assistant_skips_excluded_speaker() {
        let mut state = ConversationState::from_user("question");
        state.push(assistant_message("from worker", Some("math_expert")));
        state.push(assistant_message("from boss", Some("supervisor")));

        let (text, name) = state.last_attributed_assistant("supervisor").unwrap();
        assert_eq!(text, "from worker");
        assert_eq!(name, "math_expert");
    }

    #[test]
    fn last_attributed_assistant_ignores_unnamed_messages() {
        let mut state = ConversationState::new();
        state.push(assistant_message("anonymous", None));
        assert!(state.last_attributed_assistant("supervisor").is_none());
    }

    #[test]
    fn attribute_to_preserves_content() {
        let msg = attribute_to(assistant_message("the answer", None), "researcher");
        assert_eq!(message_text(&msg), Some("the answer"));
        assert_eq!(assistant_name(&msg), Some("researcher"));
    }
}
