//! Worker agents: named, tool-equipped reasoning units bound to graph nodes.
//!
//! A [`WorkerAgent`] is created once at setup time and is stateless across
//! invocations; the only state it sees is the conversation threaded through
//! its node. Its node service calls the reasoning engine with the worker's
//! prompt and tool set, attributes the final assistant message to the
//! worker's name (downstream routing and the forward-message tool depend on
//! that attribution), and always yields an `Answer`; workers never transfer
//! control themselves, only the supervisor does.

use std::{future::Future, pin::Pin};

use tower::{util::BoxCloneService, BoxError, Service, ServiceExt};
use tracing::debug;

use crate::engine::{Engine, EngineSvc, ReasonRequest};
use crate::error::{Result, SupervisorError};
use crate::graph::{NodeOutput, NodeSvc};
use crate::state::{attribute_last_assistant, ConversationState};
use crate::tool::{ToolBox, ToolDef};

/// A specialized agent addressable as one node in a supervisor graph.
pub struct WorkerAgent {
    name: String,
    prompt: String,
    toolbox: ToolBox,
    engine: EngineSvc,
}

impl WorkerAgent {
    pub fn builder(engine: Engine) -> WorkerAgentBuilder {
        WorkerAgentBuilder {
            engine,
            name: None,
            prompt: String::new(),
            tools: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Lower this agent into a graph node service.
    pub fn into_node(self) -> NodeSvc {
        BoxCloneService::new(WorkerNode {
            name: self.name,
            prompt: self.prompt,
            toolbox: self.toolbox,
            engine: self.engine,
        })
    }
}

impl std::fmt::Debug for WorkerAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerAgent")
            .field("name", &self.name)
            .field("toolbox", &self.toolbox)
            .finish()
    }
}

/// Builder for [`WorkerAgent`]. A unique, non-empty name is required.
pub struct WorkerAgentBuilder {
    engine: Engine,
    name: Option<String>,
    prompt: String,
    tools: Vec<ToolDef>,
}

impl WorkerAgentBuilder {
    /// Names are required for routing in multi-agent graphs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn tool(mut self, tool: ToolDef) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDef>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn build(self) -> Result<WorkerAgent> {
        let name = self
            .name
            .ok_or_else(|| SupervisorError::config("worker agent has no name"))?;
        if name.is_empty() {
            return Err(SupervisorError::config("worker agent name is empty"));
        }
        Ok(WorkerAgent {
            name,
            prompt: self.prompt,
            toolbox: ToolBox::new(self.tools),
            engine: self.engine.service(),
        })
    }
}

#[derive(Clone)]
struct WorkerNode {
    name: String,
    prompt: String,
    toolbox: ToolBox,
    engine: EngineSvc,
}

impl Service<ConversationState> for WorkerNode {
    type Response = NodeOutput;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, state: ConversationState) -> Self::Future {
        let mut engine = self.engine.clone();
        let name = self.name.clone();
        let prompt = self.prompt.clone();
        let toolbox = self.toolbox.clone();

        Box::pin(async move {
            let update = ServiceExt::ready(&mut engine)
                .await?
                .call(ReasonRequest {
                    prompt,
                    toolbox,
                    state,
                })
                .await?;
            debug!(worker = %name, appended = update.messages.len(), "worker step complete");
            Ok(NodeOutput::Answer(attribute_last_assistant(
                update.messages,
                &name,
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ScriptedTurn;
    use crate::state::{assistant_name, message_text};
    use crate::tool::tool_typed;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct SearchArgs {
        query: String,
    }

    #[test]
    fn builder_requires_a_name() {
        let err = WorkerAgent::builder(Engine::scripted(vec![]))
            .prompt("nameless")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("no name"));
    }

    #[tokio::test]
    async fn worker_node_attributes_its_answer() {
        let worker = WorkerAgent::builder(Engine::scripted(vec![ScriptedTurn::answer(
            "the Amazon rainforest",
        )]))
        .name("researcher")
        .prompt("You are a research expert.")
        .build()
        .unwrap();

        let mut node = worker.into_node();
        let out = ServiceExt::ready(&mut node)
            .await
            .unwrap()
            .call(ConversationState::from_user("largest rainforest?"))
            .await
            .unwrap();

        let NodeOutput::Answer(messages) = out else {
            panic!("worker must answer, not transfer");
        };
        let last = messages.last().unwrap();
        assert_eq!(message_text(last), Some("the Amazon rainforest"));
        assert_eq!(assistant_name(last), Some("researcher"));
    }

    #[tokio::test]
    async fn worker_node_runs_its_tools() {
        let search = tool_typed(
            "web_search",
            "Search the web",
            |args: SearchArgs| async move {
                Ok(serde_json::json!(format!("results for '{}'", args.query)))
            },
        );
        let worker = WorkerAgent::builder(Engine::scripted(vec![
            ScriptedTurn::call("web_search", serde_json::json!({"query": "rainforest"})),
            ScriptedTurn::answer("found it"),
        ]))
        .name("researcher")
        .tool(search)
        .build()
        .unwrap();

        let mut node = worker.into_node();
        let out = ServiceExt::ready(&mut node)
            .await
            .unwrap()
            .call(ConversationState::from_user("largest rainforest?"))
            .await
            .unwrap();

        let NodeOutput::Answer(messages) = out else {
            panic!("worker must answer");
        };
        // assistant(tool call) + tool response + attributed answer
        assert_eq!(messages.len(), 3);
        assert_eq!(assistant_name(messages.last().unwrap()), Some("researcher"));
    }
}
