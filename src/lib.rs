//! # Supervisor workflows for Tower-based agents
//!
//! A Tower-based framework for hierarchical multi-agent orchestration: one
//! supervisor agent routes work to specialized worker agents through
//! synthesized handoff tools, over a shared append-only conversation state.
//!
//! ## Core Concepts
//!
//! - **Worker**: a named, tool-equipped agent addressable as one graph node
//! - **Supervisor**: the entry node; it advertises one `transfer_to_<name>`
//!   tool per worker and delegates by calling them
//! - **Handoff**: a control transfer expressed through the model's
//!   tool-calling convention and resolved by the workflow executor
//! - **Tracer**: wraps a compiled workflow with observability callbacks,
//!   degrading to a no-op when the backend is unreachable
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use tower_supervisor::{
//!     create_forward_message_tool, create_supervisor, tool_typed, ConversationState, Engine,
//!     ModelConfig, WorkerAgent,
//! };
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize, JsonSchema)]
//! struct AddArgs {
//!     a: f64,
//!     b: f64,
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let engine = Engine::openai(&ModelConfig::from_env());
//!
//! let add = tool_typed("add", "Add two numbers", |args: AddArgs| async move {
//!     Ok(serde_json::json!({ "sum": args.a + args.b }))
//! });
//!
//! let math_expert = WorkerAgent::builder(engine.clone())
//!     .name("math_expert")
//!     .prompt("You are a math expert. Always use your tools.")
//!     .tool(add)
//!     .build()?;
//!
//! let workflow = create_supervisor(
//!     vec![math_expert],
//!     engine,
//!     "You manage a math expert. Delegate math questions to them.",
//! )?
//! .with_forward_message_tool(create_forward_message_tool(None))
//! .compile("assistant")?;
//!
//! let result = workflow
//!     .invoke(ConversationState::from_user("what is 2 + 3?"), None)
//!     .await?;
//! println!("{:?}", result.last_assistant_text());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod handoff;
pub mod observability;
pub mod state;
pub mod supervisor;
pub mod tool;
pub mod worker;

pub use config::{ModelConfig, ObservabilityConfig};
pub use engine::{Engine, OpenAiEngine, ReasonRequest, ReasonUpdate, ScriptedEngine, ScriptedTurn};
pub use error::{Result, SupervisorError};
pub use graph::{
    CompiledWorkflow, GraphBuilder, InvokeConfig, NodeOutput, DEFAULT_MAX_HANDOFFS, SUPERVISOR_NODE,
};
pub use handoff::{
    create_forward_message_tool, create_handoff_tool, handoff_tool_name, ForwardMessageTool,
    HandoffTool, FORWARD_MESSAGE_TOOL, HANDOFF_TOOL_PREFIX,
};
pub use observability::{
    ObservabilityBackend, TraceCallback, TraceEvent, TraceHandler, TracedWorkflow, Tracer,
};
pub use state::{assistant_message, assistant_name, message_text, user_message, ConversationState};
pub use supervisor::{create_supervisor, SupervisorBuilder};
pub use tool::{tool_typed, ToolBox, ToolDef, ToolInvocation, ToolOutput, ToolSvc};
pub use worker::{WorkerAgent, WorkerAgentBuilder};

// Re-export async-openai types that users need
pub use async_openai::types::ChatCompletionRequestMessage;

// Re-export Tower traits that users need
pub use tower::{BoxError, Service, ServiceExt};
