//! Supervisor construction: wiring a model, workers, and handoff tools into
//! one invocable workflow.
//!
//! [`create_supervisor`] synthesizes one handoff tool per worker, binds the
//! supervisor's reasoning engine to the prompt and those tools, and lays out
//! the star graph: supervisor as entry, one node per worker, control routed
//! supervisor → worker on handoff and worker → supervisor on completion.
//! The supervisor never calls worker logic directly; it only emits a named
//! transfer directive the executor resolves. Adding a worker changes the
//! supervisor's tool list and prompt text, never its code.
//!
//! Termination is delegated to the engine contract: the run ends when the
//! supervisor answers without a further handoff call.

use std::{collections::HashMap, collections::HashSet, future::Future, pin::Pin};

use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestMessage,
    ChatCompletionRequestToolMessageArgs,
};
use tower::{util::BoxCloneService, BoxError, Service, ServiceExt};
use tracing::{debug, info};

use crate::engine::{Engine, EngineSvc, ReasonRequest};
use crate::error::{Result, SupervisorError};
use crate::graph::{AgentName, CompiledWorkflow, GraphBuilder, NodeOutput, SUPERVISOR_NODE};
use crate::handoff::{create_handoff_tool_for_entry, ForwardMessageTool, HandoffTool};
use crate::state::{assistant_message, attribute_last_assistant, ConversationState};
use crate::tool::ToolBox;
use crate::worker::WorkerAgent;

/// Validate a worker set and return a builder for the supervisor workflow.
///
/// Fails with a configuration error when the worker set is empty, two
/// workers share a name, or the engine cannot call tools. Nothing partial is
/// ever returned. Collisions between a worker name and the entry-node name
/// surface at `compile`, after any `supervisor_name` override has been
/// applied.
pub fn create_supervisor(
    workers: Vec<WorkerAgent>,
    engine: Engine,
    prompt: impl Into<String>,
) -> Result<SupervisorBuilder> {
    if workers.is_empty() {
        return Err(SupervisorError::config("worker set is empty"));
    }
    if !engine.supports_tool_calling() {
        return Err(SupervisorError::config(
            "reasoning engine does not support tool calling",
        ));
    }
    let mut seen = HashSet::new();
    for worker in &workers {
        if !seen.insert(worker.name().to_string()) {
            return Err(SupervisorError::config(format!(
                "two workers share the name '{}'",
                worker.name()
            )));
        }
    }
    Ok(SupervisorBuilder {
        workers,
        engine,
        prompt: prompt.into(),
        supervisor_name: SUPERVISOR_NODE.to_string(),
        forward: None,
    })
}

/// Builder returned by [`create_supervisor`]; `compile` freezes it into a
/// [`CompiledWorkflow`].
pub struct SupervisorBuilder {
    workers: Vec<WorkerAgent>,
    engine: Engine,
    prompt: String,
    supervisor_name: String,
    forward: Option<ForwardMessageTool>,
}

impl std::fmt::Debug for SupervisorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorBuilder")
            .field("workers", &self.workers.len())
            .field("supervisor_name", &self.supervisor_name)
            .finish_non_exhaustive()
    }
}

impl SupervisorBuilder {
    /// Override the supervisor's node name (and the name its answers are
    /// attributed to).
    pub fn supervisor_name(mut self, name: impl Into<String>) -> Self {
        self.supervisor_name = name.into();
        self
    }

    /// Attach a forward-message tool so the supervisor can pass a worker's
    /// final answer through verbatim instead of re-synthesizing it.
    pub fn with_forward_message_tool(mut self, tool: ForwardMessageTool) -> Self {
        self.forward = Some(tool);
        self
    }

    /// The handoff tools this supervisor will advertise, one per worker.
    pub fn handoff_tools(&self) -> Result<Vec<HandoffTool>> {
        self.workers
            .iter()
            .map(|w| create_handoff_tool_for_entry(w.name(), None, &self.supervisor_name))
            .collect()
    }

    /// Compile into an immutable, invocable workflow.
    pub fn compile(self, name: impl Into<String>) -> Result<CompiledWorkflow> {
        let mut toolbox = ToolBox::default();
        let mut targets: HashMap<String, AgentName> = HashMap::new();
        for worker in &self.workers {
            if worker.name() == self.supervisor_name {
                return Err(SupervisorError::config(format!(
                    "worker name '{}' collides with the supervisor node name",
                    worker.name()
                )));
            }
            let tool = create_handoff_tool_for_entry(worker.name(), None, &self.supervisor_name)?;
            toolbox.advertise(tool.spec());
            targets.insert(tool.name().to_string(), tool.target().to_string());
        }
        if let Some(forward) = &self.forward {
            toolbox.advertise(forward.spec());
        }

        let supervisor = SupervisorNode {
            name: self.supervisor_name.clone(),
            prompt: self.prompt,
            toolbox,
            targets,
            forward: self.forward,
            engine: self.engine.service(),
        };

        let mut graph = GraphBuilder::new().entry(
            self.supervisor_name.clone(),
            BoxCloneService::new(supervisor),
        );
        for worker in self.workers {
            graph = graph.node(worker.name().to_string(), worker.into_node());
        }
        let workflow = graph.compile(name)?;
        info!(workflow = %workflow.name(), entry = %workflow.entry_node(), "supervisor workflow compiled");
        Ok(workflow)
    }
}

/// The entry node: reasons over the request with handoff tools advertised
/// and converts control-tool calls into executor directives.
#[derive(Clone)]
struct SupervisorNode {
    name: String,
    prompt: String,
    toolbox: ToolBox,
    targets: HashMap<String, AgentName>,
    forward: Option<ForwardMessageTool>,
    engine: EngineSvc,
}

impl SupervisorNode {
    fn forward_name(&self) -> Option<&str> {
        self.forward.as_ref().map(|f| f.name())
    }
}

impl Service<ConversationState> for SupervisorNode {
    type Response = NodeOutput;
    type Error = BoxError;
    type Future =
        Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, state: ConversationState) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            let mut engine = this.engine.clone();
            let update = ServiceExt::ready(&mut engine)
                .await?
                .call(ReasonRequest {
                    prompt: this.prompt.clone(),
                    toolbox: this.toolbox.clone(),
                    state: state.clone(),
                })
                .await?;
            let mut appended = update.messages;

            let Some(calls) = terminal_tool_calls(&appended) else {
                // Plain answer, no further delegation: the run ends here.
                return Ok(NodeOutput::Answer(attribute_last_assistant(
                    appended, &this.name,
                )));
            };

            // Every control call gets a tool response so the transcript
            // stays well-formed for the next model call.
            let mut transfer: Option<AgentName> = None;
            let mut forward_called = false;
            for call in &calls {
                let content = if let Some(target) = this.targets.get(&call.function.name) {
                    match &transfer {
                        None => {
                            transfer = Some(target.clone());
                            format!("Transferred to {}", target)
                        }
                        Some(first) => format!("Ignored: already transferring to {}", first),
                    }
                } else if this.forward_name() == Some(call.function.name.as_str()) {
                    forward_called = true;
                    "Forwarded the latest worker message".to_string()
                } else {
                    // Unknown terminal call; acknowledge and answer as-is.
                    format!("Unknown tool: {}", call.function.name)
                };
                let ack = ChatCompletionRequestToolMessageArgs::default()
                    .content(content)
                    .tool_call_id(call.id.clone())
                    .build()?;
                appended.push(ack.into());
            }

            if let Some(target) = transfer {
                debug!(supervisor = %this.name, target = %target, "handoff directive");
                let mut carried = state;
                carried.extend(appended);
                return Ok(NodeOutput::Transfer {
                    target,
                    state: carried,
                });
            }

            if forward_called {
                if let Some(forward) = &this.forward {
                    if let Some((content, from)) = forward.source(&state, &this.name) {
                        debug!(supervisor = %this.name, from = %from, "forwarding worker message verbatim");
                        let content = content.to_string();
                        appended.push(assistant_message(content, Some(&this.name)));
                        return Ok(NodeOutput::Answer(appended));
                    }
                    // Nothing to forward. Close the turn with an attributed
                    // assistant message so the transcript still ends on one.
                    debug!(supervisor = %this.name, "forward requested but no worker message found");
                    appended.push(assistant_message(String::new(), Some(&this.name)));
                    return Ok(NodeOutput::Answer(appended));
                }
            }

            Ok(NodeOutput::Answer(attribute_last_assistant(
                appended, &this.name,
            )))
        })
    }
}

/// Tool calls of the trailing assistant message, if it has any.
fn terminal_tool_calls(
    messages: &[ChatCompletionRequestMessage],
) -> Option<Vec<ChatCompletionMessageToolCall>> {
    match messages.last()? {
        ChatCompletionRequestMessage::Assistant(a) => a
            .tool_calls
            .as_ref()
            .filter(|calls| !calls.is_empty())
            .cloned(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ScriptedTurn;

    fn worker(name: &str) -> WorkerAgent {
        WorkerAgent::builder(Engine::scripted(vec![ScriptedTurn::answer("ok")]))
            .name(name)
            .build()
            .unwrap()
    }

    #[test]
    fn empty_worker_set_is_rejected() {
        let err = create_supervisor(vec![], Engine::scripted(vec![]), "route work").unwrap_err();
        assert!(matches!(err, SupervisorError::Configuration { .. }));
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn duplicate_worker_names_are_rejected() {
        let err = create_supervisor(
            vec![worker("math_expert"), worker("math_expert")],
            Engine::scripted(vec![]),
            "route work",
        )
        .unwrap_err();
        assert!(err.to_string().contains("share the name"));
    }

    #[test]
    fn default_supervisor_name_collision_is_rejected_at_compile() {
        let err = create_supervisor(
            vec![worker(SUPERVISOR_NODE)],
            Engine::scripted(vec![]),
            "route work",
        )
        .unwrap()
        .compile("clash")
        .unwrap_err();
        assert!(err.to_string().contains("collides"));
    }

    #[test]
    fn renamed_supervisor_frees_the_default_node_name() {
        let builder = create_supervisor(
            vec![worker(SUPERVISOR_NODE)],
            Engine::scripted(vec![]),
            "route work",
        )
        .unwrap()
        .supervisor_name("boss");
        let names: Vec<String> = builder
            .handoff_tools()
            .unwrap()
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(names, vec!["transfer_to_supervisor"]);
        let workflow = builder.compile("renamed").unwrap();
        assert_eq!(workflow.entry_node(), "boss");
    }

    #[test]
    fn text_only_engine_is_rejected() {
        let err = create_supervisor(
            vec![worker("math_expert")],
            Engine::text_only(crate::engine::ScriptedEngine::new(vec![])),
            "route work",
        )
        .unwrap_err();
        assert!(err.to_string().contains("tool calling"));
    }

    #[test]
    fn handoff_tools_are_deterministically_named() {
        let builder = create_supervisor(
            vec![worker("math_expert"), worker("researcher")],
            Engine::scripted(vec![]),
            "route work",
        )
        .unwrap();
        let names: Vec<String> = builder
            .handoff_tools()
            .unwrap()
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(names, vec!["transfer_to_math_expert", "transfer_to_researcher"]);
    }

    #[test]
    fn custom_supervisor_name_collision_is_rejected_at_compile() {
        let err = create_supervisor(
            vec![worker("executive_assistant")],
            Engine::scripted(vec![]),
            "route work",
        )
        .unwrap()
        .supervisor_name("executive_assistant")
        .compile("clash")
        .unwrap_err();
        assert!(err.to_string().contains("collides"));
    }
}
