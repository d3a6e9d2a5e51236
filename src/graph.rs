//! Node graph assembly and the compiled workflow executor.
//!
//! A supervisor workflow is a star-shaped graph: one entry node (the
//! supervisor) and one node per worker, with control flowing entry → worker
//! on a handoff and worker → entry on completion. Nodes communicate with the
//! executor through the explicit [`NodeOutput`] sum type; there is no
//! stringly-typed signaling between a node and the routing loop.
//!
//! [`CompiledWorkflow`] is immutable after [`GraphBuilder::compile`] and
//! cheap to clone; every invocation clones the node services it needs, so a
//! workflow can be invoked many times and from many tasks concurrently.

use std::{collections::HashMap, sync::Arc};

use tower::{util::BoxCloneService, BoxError, Service, ServiceExt};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, SupervisorError};
use crate::observability::{TraceCallback, TraceEvent};
use crate::state::ConversationState;

/// Reserved name of the entry node. Worker names must not collide with it.
pub const SUPERVISOR_NODE: &str = "supervisor";

/// Node identifier within a workflow graph.
pub type AgentName = String;

/// What a node hands back to the executor.
#[derive(Debug, Clone)]
pub enum NodeOutput {
    /// Messages to append to the shared state. From a worker this routes
    /// control back to the entry node; from the entry node it ends the run.
    Answer(Vec<async_openai::types::ChatCompletionRequestMessage>),
    /// Control-transfer directive: jump to the named node, carrying the full
    /// current state (including any messages the emitting node appended).
    Transfer {
        target: AgentName,
        state: ConversationState,
    },
}

/// Boxed node service: ConversationState in, NodeOutput out.
pub type NodeSvc = BoxCloneService<ConversationState, NodeOutput, BoxError>;

/// Per-call invocation options. The tracer appends its callback here,
/// never replacing caller-supplied ones.
#[derive(Clone, Default)]
pub struct InvokeConfig {
    pub callbacks: Vec<TraceCallback>,
    /// Hop guard for the routing loop; `None` uses [`DEFAULT_MAX_HANDOFFS`].
    pub max_handoffs: Option<usize>,
}

/// Default cap on handoffs within a single invocation.
pub const DEFAULT_MAX_HANDOFFS: usize = 10;

impl std::fmt::Debug for InvokeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokeConfig")
            .field("callbacks", &self.callbacks.len())
            .field("max_handoffs", &self.max_handoffs)
            .finish()
    }
}

/// Assembles nodes into a compiled workflow.
#[derive(Default)]
pub struct GraphBuilder {
    entry: Option<AgentName>,
    nodes: Vec<(AgentName, NodeSvc)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the entry node. Exactly one entry is required.
    pub fn entry(mut self, name: impl Into<AgentName>, svc: NodeSvc) -> Self {
        let name = name.into();
        self.entry = Some(name.clone());
        self.nodes.push((name, svc));
        self
    }

    /// Register a worker node reachable from the entry node.
    pub fn node(mut self, name: impl Into<AgentName>, svc: NodeSvc) -> Self {
        self.nodes.push((name.into(), svc));
        self
    }

    /// Freeze the graph into an invocable workflow.
    pub fn compile(self, name: impl Into<String>) -> Result<CompiledWorkflow> {
        let entry = self
            .entry
            .ok_or_else(|| SupervisorError::config("graph has no entry node"))?;
        let mut nodes: HashMap<AgentName, NodeSvc> = HashMap::with_capacity(self.nodes.len());
        for (node_name, svc) in self.nodes {
            if nodes.insert(node_name.clone(), svc).is_some() {
                return Err(SupervisorError::config(format!(
                    "duplicate node name: '{}'",
                    node_name
                )));
            }
        }
        Ok(CompiledWorkflow {
            name: name.into(),
            entry,
            nodes: Arc::new(nodes),
        })
    }
}

/// An immutable, invocable supervisor workflow.
#[derive(Clone)]
pub struct CompiledWorkflow {
    name: String,
    entry: AgentName,
    nodes: Arc<HashMap<AgentName, NodeSvc>>,
}

impl CompiledWorkflow {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_node(&self) -> &str {
        &self.entry
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Suspend-capable entry point: run the routing loop to completion and
    /// return the accumulated conversation state.
    pub async fn invoke(
        &self,
        state: ConversationState,
        config: Option<InvokeConfig>,
    ) -> std::result::Result<ConversationState, BoxError> {
        let config = config.unwrap_or_default();
        let max_handoffs = config.max_handoffs.unwrap_or(DEFAULT_MAX_HANDOFFS);
        let run_id = Uuid::new_v4().to_string();

        emit(
            &config,
            &TraceEvent::WorkflowStart {
                workflow: self.name.clone(),
                run_id: run_id.clone(),
            },
        );
        info!(workflow = %self.name, run_id = %run_id, "workflow start");

        let mut state = state;
        let mut current = self.entry.clone();
        let mut handoffs = 0usize;
        loop {
            let svc = self
                .nodes
                .get(&current)
                .ok_or_else(|| format!("unknown node: '{}'", current))?;
            let mut svc = svc.clone();

            emit(&config, &TraceEvent::NodeStart { node: current.clone() });
            let output = ServiceExt::ready(&mut svc).await?.call(state.clone()).await?;
            emit(&config, &TraceEvent::NodeEnd { node: current.clone() });

            match output {
                NodeOutput::Transfer { target, state: carried } => {
                    handoffs += 1;
                    if handoffs > max_handoffs {
                        return Err(format!(
                            "maximum handoffs exceeded ({})",
                            max_handoffs
                        )
                        .into());
                    }
                    if !self.nodes.contains_key(&target) {
                        return Err(format!("unknown node: '{}'", target).into());
                    }
                    emit(
                        &config,
                        &TraceEvent::Handoff {
                            from: current.clone(),
                            to: target.clone(),
                        },
                    );
                    debug!(from = %current, to = %target, handoffs, "handoff");
                    state = carried;
                    current = target;
                }
                NodeOutput::Answer(messages) => {
                    state.extend(messages);
                    if current == self.entry {
                        emit(
                            &config,
                            &TraceEvent::WorkflowEnd {
                                workflow: self.name.clone(),
                                run_id: run_id.clone(),
                                message_count: state.len(),
                            },
                        );
                        info!(workflow = %self.name, run_id = %run_id, messages = state.len(), "workflow end");
                        return Ok(state);
                    }
                    // Worker finished: control returns to the entry node.
                    debug!(from = %current, "worker done, returning to supervisor");
                    current = self.entry.clone();
                }
            }
        }
    }

    /// Blocking entry point. Runs the workflow on a dedicated current-thread
    /// runtime; must not be called from inside an async runtime.
    pub fn invoke_blocking(
        &self,
        state: ConversationState,
        config: Option<InvokeConfig>,
    ) -> std::result::Result<ConversationState, BoxError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        rt.block_on(self.invoke(state, config))
    }
}

impl std::fmt::Debug for CompiledWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledWorkflow")
            .field("name", &self.name)
            .field("entry", &self.entry)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

fn emit(config: &InvokeConfig, event: &TraceEvent) {
    for callback in &config.callbacks {
        callback.on_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{assistant_message, message_text};
    use tower::service_fn;

    fn answer_node(text: &'static str, name: &'static str) -> NodeSvc {
        BoxCloneService::new(service_fn(move |_state: ConversationState| async move {
            Ok::<_, BoxError>(NodeOutput::Answer(vec![assistant_message(text, Some(name))]))
        }))
    }

    fn transfer_node(target: &'static str) -> NodeSvc {
        BoxCloneService::new(service_fn(move |state: ConversationState| async move {
            Ok::<_, BoxError>(NodeOutput::Transfer {
                target: target.to_string(),
                state,
            })
        }))
    }

    #[test]
    fn compile_rejects_duplicate_nodes() {
        let err = GraphBuilder::new()
            .entry(SUPERVISOR_NODE, answer_node("a", SUPERVISOR_NODE))
            .node("alpha", answer_node("b", "alpha"))
            .node("alpha", answer_node("c", "alpha"))
            .compile("dup")
            .unwrap_err();
        assert!(err.to_string().contains("duplicate node name"));
    }

    #[test]
    fn compile_requires_entry() {
        let err = GraphBuilder::new()
            .node("alpha", answer_node("b", "alpha"))
            .compile("no-entry")
            .unwrap_err();
        assert!(err.to_string().contains("no entry node"));
    }

    #[tokio::test]
    async fn entry_answer_terminates() {
        let wf = GraphBuilder::new()
            .entry(SUPERVISOR_NODE, answer_node("done", SUPERVISOR_NODE))
            .compile("simple")
            .unwrap();
        let out = wf
            .invoke(ConversationState::from_user("hi"), None)
            .await
            .unwrap();
        assert_eq!(message_text(out.messages.last().unwrap()), Some("done"));
    }

    #[tokio::test]
    async fn transfer_to_unknown_node_errors() {
        let wf = GraphBuilder::new()
            .entry(SUPERVISOR_NODE, transfer_node("ghost"))
            .compile("ghost")
            .unwrap();
        let err = wf
            .invoke(ConversationState::from_user("hi"), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown node: 'ghost'"));
    }

    #[tokio::test]
    async fn handoff_limit_enforced() {
        // supervisor and worker transfer to each other forever
        let wf = GraphBuilder::new()
            .entry(SUPERVISOR_NODE, transfer_node("alpha"))
            .node("alpha", transfer_node(SUPERVISOR_NODE))
            .compile("loop")
            .unwrap();
        let config = InvokeConfig {
            max_handoffs: Some(3),
            ..Default::default()
        };
        let err = wf
            .invoke(ConversationState::from_user("hi"), Some(config))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("maximum handoffs exceeded"));
    }

    #[test]
    fn invoke_blocking_matches_async() {
        let wf = GraphBuilder::new()
            .entry(SUPERVISOR_NODE, answer_node("done", SUPERVISOR_NODE))
            .compile("blocking")
            .unwrap();
        let out = wf
            .invoke_blocking(ConversationState::from_user("hi"), None)
            .unwrap();
        assert_eq!(message_text(out.messages.last().unwrap()), Some("done"));
    }
}
