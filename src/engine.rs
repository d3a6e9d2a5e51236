//! Reasoning engine contract and implementations.
//!
//! The engine is the external collaborator that runs the reason-and-act
//! cycle: given a prompt, a tool set, and the conversation state, it calls
//! the model, executes routable tool calls, and returns the messages to
//! append to the shared state. The supervisor and worker nodes are built on
//! this contract and never talk to a model directly.
//!
//! Two implementations ship with the crate:
//!
//! - [`OpenAiEngine`]: chat-completions loop over `async-openai`, pointed at
//!   OpenAI or any compatible gateway via [`crate::config::ModelConfig`].
//! - [`ScriptedEngine`]: deterministic scripted turns for tests and offline
//!   demos; the same role the mock providers play in typical agent stacks.
//!
//! Both obey one convention the node layer relies on: a call to a tool that
//! is advertised but not routable (a handoff or forward-message spec) ends
//! the engine's loop, leaving that tool call as the last assistant message
//! for the node layer to interpret as a control signal.

use std::{
    collections::VecDeque,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestToolMessageArgs, ChatCompletionToolType,
        CreateChatCompletionRequestArgs, FunctionCall,
    },
    Client,
};
use serde_json::Value;
use tower::{util::BoxCloneService, BoxError, Service};
use tracing::debug;

use crate::config::ModelConfig;
use crate::state::ConversationState;
use crate::tool::{ToolBox, ToolInvocation};

/// Request handed to a reasoning engine: one agent's prompt and tool set
/// plus the shared conversation state.
#[derive(Debug, Clone)]
pub struct ReasonRequest {
    pub prompt: String,
    pub toolbox: ToolBox,
    pub state: ConversationState,
}

/// Engine result: messages to append to the shared state. Never a rewrite.
#[derive(Debug, Clone)]
pub struct ReasonUpdate {
    pub messages: Vec<ChatCompletionRequestMessage>,
}

/// Trait alias for anything usable as a reasoning engine.
pub trait ReasoningEngine:
    Service<ReasonRequest, Response = ReasonUpdate, Error = BoxError>
{
}
impl<T> ReasoningEngine for T where
    T: Service<ReasonRequest, Response = ReasonUpdate, Error = BoxError>
{
}

/// Boxed reasoning engine service.
pub type EngineSvc = BoxCloneService<ReasonRequest, ReasonUpdate, BoxError>;

/// A reasoning engine bound with its capability flags.
///
/// The supervisor builder rejects engines without tool-calling support at
/// construction time; handoffs are expressed through tool calls, so a
/// text-only engine cannot drive a supervisor.
#[derive(Clone)]
pub struct Engine {
    svc: EngineSvc,
    tool_calling: bool,
}

impl Engine {
    /// Bind a tool-calling engine service.
    pub fn new<S>(svc: S) -> Self
    where
        S: ReasoningEngine + Clone + Send + 'static,
        S::Future: Send + 'static,
    {
        Self {
            svc: BoxCloneService::new(svc),
            tool_calling: true,
        }
    }

    /// Bind an engine that cannot call tools (completion-only models).
    pub fn text_only<S>(svc: S) -> Self
    where
        S: ReasoningEngine + Clone + Send + 'static,
        S::Future: Send + 'static,
    {
        Self {
            svc: BoxCloneService::new(svc),
            tool_calling: false,
        }
    }

    /// OpenAI-compatible engine from a model configuration.
    pub fn openai(config: &ModelConfig) -> Self {
        Self::new(OpenAiEngine::from_config(config))
    }

    /// Deterministic scripted engine for tests and offline demos.
    pub fn scripted(turns: Vec<ScriptedTurn>) -> Self {
        Self::new(ScriptedEngine::new(turns))
    }

    pub fn supports_tool_calling(&self) -> bool {
        self.tool_calling
    }

    pub(crate) fn service(&self) -> EngineSvc {
        self.svc.clone()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("tool_calling", &self.tool_calling)
            .finish()
    }
}

/// Partition of one assistant turn's tool calls, shared by both engines.
///
/// Returns the executed tool-response messages, or None when any call is
/// non-routable (the turn is terminal and left for the node layer).
async fn execute_turn(
    toolbox: &ToolBox,
    calls: &[ChatCompletionMessageToolCall],
) -> Result<Option<Vec<ChatCompletionRequestMessage>>, BoxError> {
    if calls.iter().any(|c| !toolbox.is_routable(&c.function.name)) {
        return Ok(None);
    }
    let mut responses = Vec::with_capacity(calls.len());
    for call in calls {
        let arguments: Value = serde_json::from_str(&call.function.arguments).unwrap_or(Value::Null);
        let out = toolbox
            .dispatch(ToolInvocation {
                id: call.id.clone(),
                name: call.function.name.clone(),
                arguments,
            })
            .await?;
        let msg = ChatCompletionRequestToolMessageArgs::default()
            .content(out.result.to_string())
            .tool_call_id(out.id)
            .build()?;
        responses.push(msg.into());
    }
    Ok(Some(responses))
}

fn assistant_from_parts(
    content: Option<String>,
    tool_calls: Option<Vec<ChatCompletionMessageToolCall>>,
) -> Result<ChatCompletionRequestMessage, BoxError> {
    let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
    builder.content(content.unwrap_or_default());
    if let Some(calls) = tool_calls {
        if !calls.is_empty() {
            builder.tool_calls(calls);
        }
    }
    Ok(builder
        .build()
        .map_err(|e| format!("assistant msg build error: {}", e))?
        .into())
}

// =============================
// OpenAI-backed engine
// =============================

/// Reason-and-act loop over the OpenAI chat completions API.
#[derive(Clone)]
pub struct OpenAiEngine {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
    temperature: f32,
    max_steps: usize,
}

impl OpenAiEngine {
    pub fn from_config(config: &ModelConfig) -> Self {
        let mut openai = OpenAIConfig::new();
        if let Some(base) = &config.base_url {
            openai = openai.with_api_base(base);
        }
        if let Some(key) = &config.api_key {
            openai = openai.with_api_key(key);
        }
        Self {
            client: Arc::new(Client::with_config(openai)),
            model: config.model.clone(),
            temperature: config.temperature,
            max_steps: 8,
        }
    }

    /// Cap on model round-trips per reasoning call.
    pub fn max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }
}

impl Service<ReasonRequest> for OpenAiEngine {
    type Response = ReasonUpdate;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ReasonRequest) -> Self::Future {
        let client = self.client.clone();
        let model = self.model.clone();
        let temperature = self.temperature;
        let max_steps = self.max_steps;

        Box::pin(async move {
            let system: ChatCompletionRequestMessage =
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(req.prompt.clone())
                    .build()
                    .map_err(|e| format!("system msg build error: {}", e))?
                    .into();

            let mut appended: Vec<ChatCompletionRequestMessage> = Vec::new();
            for step in 0..max_steps {
                let mut messages = vec![system.clone()];
                messages.extend(req.state.messages.iter().cloned());
                messages.extend(appended.iter().cloned());

                let mut builder = CreateChatCompletionRequestArgs::default();
                builder
                    .model(&model)
                    .temperature(temperature)
                    .messages(messages);
                if !req.toolbox.specs().is_empty() {
                    builder.tools(req.toolbox.specs().to_vec());
                }
                let chat_req = builder
                    .build()
                    .map_err(|e| format!("request build error: {}", e))?;

                let resp = client.chat().create(chat_req).await?;
                let choice = resp
                    .choices
                    .into_iter()
                    .next()
                    .ok_or("model returned no choices")?;
                let content = choice.message.content;
                let tool_calls = choice.message.tool_calls;

                appended.push(assistant_from_parts(content, tool_calls.clone())?);

                let calls = tool_calls.unwrap_or_default();
                if calls.is_empty() {
                    return Ok(ReasonUpdate { messages: appended });
                }
                match execute_turn(&req.toolbox, &calls).await? {
                    Some(responses) => appended.extend(responses),
                    // Non-routable call: terminal, the node layer interprets it.
                    None => return Ok(ReasonUpdate { messages: appended }),
                }
                debug!(step, model = %model, "engine continuing after tool execution");
            }
            Ok(ReasonUpdate { messages: appended })
        })
    }
}

// =============================
// Scripted engine for tests and offline demos
// =============================

/// One scripted assistant turn.
#[derive(Debug, Clone)]
pub struct ScriptedTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<(String, Value)>,
}

impl ScriptedTurn {
    /// A plain final answer with no tool calls.
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    /// A turn calling a single tool.
    pub fn call(tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            content: None,
            tool_calls: vec![(tool.into(), arguments)],
        }
    }

    pub fn with_content(mut self, text: impl Into<String>) -> Self {
        self.content = Some(text.into());
        self
    }
}

/// Engine that replays a fixed sequence of turns.
///
/// Each reasoning call consumes turns until one is terminal: a turn with no
/// tool calls, or a turn calling a non-routable tool. Routable tool calls
/// are executed for real, so worker tool bodies run exactly as they would
/// under a live model. Clones share the underlying script.
#[derive(Clone)]
pub struct ScriptedEngine {
    turns: Arc<tokio::sync::Mutex<VecDeque<ScriptedTurn>>>,
    call_ids: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: Arc::new(tokio::sync::Mutex::new(turns.into())),
            call_ids: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn tool_call(&self, name: &str, arguments: &Value) -> ChatCompletionMessageToolCall {
        let n = self.call_ids.fetch_add(1, Ordering::SeqCst);
        ChatCompletionMessageToolCall {
            id: format!("call_{}", n),
            r#type: ChatCompletionToolType::Function,
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }
}

impl Service<ReasonRequest> for ScriptedEngine {
    type Response = ReasonUpdate;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ReasonRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            let mut appended: Vec<ChatCompletionRequestMessage> = Vec::new();
            loop {
                let turn = match this.turns.lock().await.pop_front() {
                    Some(t) => t,
                    None => {
                        debug!("script exhausted; answering with empty turn");
                        appended.push(assistant_from_parts(Some(String::new()), None)?);
                        return Ok(ReasonUpdate { messages: appended });
                    }
                };

                let calls: Vec<ChatCompletionMessageToolCall> = turn
                    .tool_calls
                    .iter()
                    .map(|(name, args)| this.tool_call(name, args))
                    .collect();
                appended.push(assistant_from_parts(
                    turn.content.clone(),
                    Some(calls.clone()),
                )?);

                if calls.is_empty() {
                    return Ok(ReasonUpdate { messages: appended });
                }
                match execute_turn(&req.toolbox, &calls).await? {
                    Some(responses) => appended.extend(responses),
                    None => return Ok(ReasonUpdate { messages: appended }),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::message_text;
    use crate::tool::{tool_typed, ToolDef};
    use schemars::JsonSchema;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct AddArgs {
        a: f64,
        b: f64,
    }

    fn add_tool() -> ToolDef {
        tool_typed("add", "Add two numbers", |args: AddArgs| async move {
            Ok(serde_json::json!({ "sum": args.a + args.b }))
        })
    }

    fn reason_request(toolbox: ToolBox) -> ReasonRequest {
        ReasonRequest {
            prompt: "You are a math expert.".into(),
            toolbox,
            state: ConversationState::from_user("what is 2 + 3?"),
        }
    }

    #[tokio::test]
    async fn scripted_engine_executes_routable_tools() {
        let mut engine = ScriptedEngine::new(vec![
            ScriptedTurn::call("add", serde_json::json!({"a": 2.0, "b": 3.0})),
            ScriptedTurn::answer("the sum is 5"),
        ]);
        let update = ServiceExt::ready(&mut engine)
            .await
            .unwrap()
            .call(reason_request(ToolBox::new(vec![add_tool()])))
            .await
            .unwrap();

        // assistant(tool call) + tool response + assistant(answer)
        assert_eq!(update.messages.len(), 3);
        assert_eq!(message_text(update.messages.last().unwrap()), Some("the sum is 5"));
        match &update.messages[1] {
            ChatCompletionRequestMessage::Tool(t) => {
                match &t.content {
                    async_openai::types::ChatCompletionRequestToolMessageContent::Text(text) => {
                        assert!(text.contains("5"))
                    }
                    _ => panic!("expected text tool content"),
                };
            }
            other => panic!("expected tool message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn scripted_engine_stops_on_non_routable_call() {
        let mut engine = ScriptedEngine::new(vec![
            ScriptedTurn::call("transfer_to_math_expert", serde_json::json!({})),
            ScriptedTurn::answer("never reached in this call"),
        ]);
        let update = ServiceExt::ready(&mut engine)
            .await
            .unwrap()
            .call(reason_request(ToolBox::new(vec![])))
            .await
            .unwrap();

        assert_eq!(update.messages.len(), 1);
        match &update.messages[0] {
            ChatCompletionRequestMessage::Assistant(a) => {
                let calls = a.tool_calls.as_ref().unwrap();
                assert_eq!(calls[0].function.name, "transfer_to_math_expert");
            }
            other => panic!("expected assistant message, got {:?}", other),
        }

        // The unconsumed turn remains for the next reasoning call.
        let update = ServiceExt::ready(&mut engine)
            .await
            .unwrap()
            .call(reason_request(ToolBox::new(vec![])))
            .await
            .unwrap();
        assert_eq!(
            message_text(update.messages.last().unwrap()),
            Some("never reached in this call")
        );
    }

    #[test]
    fn engine_binding_carries_capability() {
        let scripted = Engine::scripted(vec![]);
        assert!(scripted.supports_tool_calling());
        let plain = Engine::text_only(ScriptedEngine::new(vec![]));
        assert!(!plain.supports_tool_calling());
    }
}
