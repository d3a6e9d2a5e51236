//! Handoff and forward-message tool factories.
//!
//! A handoff is a control-transfer directive smuggled through the model's
//! tool-calling convention: the supervisor "calls" `transfer_to_<worker>`,
//! and instead of executing a function body, the supervisor node converts
//! the call into a [`crate::graph::NodeOutput::Transfer`] that the executor
//! resolves to a node jump. Tool names are deterministic from the target
//! name, so supervisor prompts can reference them predictably.
//!
//! The forward-message tool is the second control signal: it lets the
//! supervisor re-emit a worker's last answer verbatim as its own, avoiding a
//! model round-trip that would only paraphrase an already-final answer.

use async_openai::types::{
    ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType, FunctionObjectArgs,
};

use crate::error::{Result, SupervisorError};
use crate::graph::{AgentName, SUPERVISOR_NODE};
use crate::state::ConversationState;

/// Prefix of every generated handoff tool name.
pub const HANDOFF_TOOL_PREFIX: &str = "transfer_to_";

/// Default name of the forward-message tool.
pub const FORWARD_MESSAGE_TOOL: &str = "forward_message";

/// Deterministic handoff tool name for a target agent.
pub fn handoff_tool_name(target: &str) -> String {
    format!("{}{}", HANDOFF_TOOL_PREFIX, target)
}

/// A tool that transfers control to one named worker.
#[derive(Debug, Clone)]
pub struct HandoffTool {
    name: String,
    description: String,
    target: AgentName,
}

/// Build a handoff tool for `target_agent_name`.
///
/// Fails with a configuration error when the target name is empty or
/// collides with the default supervisor node name. Workflows with a renamed
/// entry node validate against that name instead, via the supervisor
/// builder.
pub fn create_handoff_tool(
    target_agent_name: &str,
    description: Option<&str>,
) -> Result<HandoffTool> {
    create_handoff_tool_for_entry(target_agent_name, description, SUPERVISOR_NODE)
}

/// Like [`create_handoff_tool`], validating against the workflow's actual
/// entry-node name.
pub(crate) fn create_handoff_tool_for_entry(
    target_agent_name: &str,
    description: Option<&str>,
    entry_name: &str,
) -> Result<HandoffTool> {
    if target_agent_name.is_empty() {
        return Err(SupervisorError::config("handoff target name is empty"));
    }
    if target_agent_name == entry_name {
        return Err(SupervisorError::config(format!(
            "handoff target '{}' collides with the supervisor node name",
            target_agent_name
        )));
    }
    Ok(HandoffTool {
        name: handoff_tool_name(target_agent_name),
        description: description
            .map(str::to_string)
            .unwrap_or_else(|| format!("Transfer control to {}", target_agent_name)),
        target: target_agent_name.to_string(),
    })
}

impl HandoffTool {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Advertised spec. The `reason` parameter is informational; the call
    /// itself is the directive.
    pub fn spec(&self) -> ChatCompletionTool {
        let func = FunctionObjectArgs::default()
            .name(&self.name)
            .description(&self.description)
            .parameters(serde_json::json!({
                "type": "object",
                "properties": {
                    "reason": {
                        "type": "string",
                        "description": "Reason for the handoff"
                    }
                }
            }))
            .build()
            .expect("valid function object");
        ChatCompletionToolArgs::default()
            .r#type(ChatCompletionToolType::Function)
            .function(func)
            .build()
            .expect("valid chat tool")
    }
}

/// A tool that re-emits the latest worker message as the supervisor's own.
#[derive(Debug, Clone)]
pub struct ForwardMessageTool {
    name: String,
}

/// Build a forward-message tool, optionally with an override name.
pub fn create_forward_message_tool(tool_name: Option<&str>) -> ForwardMessageTool {
    ForwardMessageTool {
        name: tool_name.unwrap_or(FORWARD_MESSAGE_TOOL).to_string(),
    }
}

impl ForwardMessageTool {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> ChatCompletionTool {
        let func = FunctionObjectArgs::default()
            .name(&self.name)
            .description(
                "Forward the most recent worker message to the user verbatim \
                 instead of restating it",
            )
            .parameters(serde_json::json!({
                "type": "object",
                "properties": {}
            }))
            .build()
            .expect("valid function object");
        ChatCompletionToolArgs::default()
            .r#type(ChatCompletionToolType::Function)
            .function(func)
            .build()
            .expect("valid chat tool")
    }

    /// Locate the message to forward: the most recent assistant message
    /// attributed to an agent other than `speaker`. The returned content is
    /// re-emitted byte-for-byte; only the speaker attribution changes.
    pub fn source<'a>(
        &self,
        state: &'a ConversationState,
        speaker: &str,
    ) -> Option<(&'a str, &'a str)> {
        state.last_attributed_assistant(speaker)
    }
}
