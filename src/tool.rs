//! Tool definitions and routing for worker agents.
//!
//! A [`ToolDef`] pairs an OpenAI function spec with a Tower service that
//! executes it. A [`ToolBox`] collects tool defs for one agent and routes
//! invocations by name. Specs can also be advertised without a backing
//! service ([`ToolBox::advertise`]): the handoff and forward-message tools
//! work this way, because their calls are control signals interpreted by the
//! node layer rather than functions the reasoning engine may execute.

use std::{collections::HashMap, future::Future, sync::Arc};

use async_openai::types::{
    ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType, FunctionObjectArgs,
};
use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower::{util::BoxCloneSyncService, BoxError, Service, ServiceExt};

/// A call routed to one named tool: the model's call id, the tool name, and
/// the parsed JSON arguments.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Result of executing a tool, carrying the invocation id so the engine can
/// emit a matching tool-response message.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub id: String,
    pub result: Value,
}

/// Boxed tool service.
pub type ToolSvc = BoxCloneSyncService<ToolInvocation, ToolOutput, BoxError>;

/// One tool a worker agent may call: the advertised function signature plus
/// the service that executes it.
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters_schema: Value,
    pub service: ToolSvc,
}

impl ToolDef {
    /// Build a tool from an untyped JSON handler and a hand-written schema.
    /// Most callers want [`tool_typed`] instead.
    pub fn from_handler<F>(
        name: &'static str,
        description: &'static str,
        parameters_schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let svc = tower::service_fn(move |inv: ToolInvocation| {
            let handler = handler.clone();
            async move {
                // Guards against a toolbox wiring bug, not a model mistake.
                if inv.name != name {
                    return Err::<ToolOutput, BoxError>(
                        format!("invocation for '{}' dispatched to '{}'", inv.name, name).into(),
                    );
                }
                let result = handler(inv.arguments).await?;
                Ok(ToolOutput {
                    id: inv.id,
                    result,
                })
            }
        });
        Self {
            name,
            description,
            parameters_schema,
            service: BoxCloneSyncService::new(svc),
        }
    }

    /// The OpenAI function spec advertised for this tool.
    pub fn to_openai_tool(&self) -> ChatCompletionTool {
        let func = FunctionObjectArgs::default()
            .name(self.name)
            .description(self.description)
            .parameters(self.parameters_schema.clone())
            .build()
            .expect("valid function object");
        ChatCompletionToolArgs::default()
            .r#type(ChatCompletionToolType::Function)
            .function(func)
            .build()
            .expect("valid chat tool")
    }
}

/// Build a tool from a typed async handler. The parameter schema is derived
/// from `A` with schemars, so the advertised signature and the deserialized
/// arguments cannot drift apart.
pub fn tool_typed<A, H, Fut, R>(
    name: &'static str,
    description: &'static str,
    handler: H,
) -> ToolDef
where
    A: DeserializeOwned + JsonSchema + Send + 'static,
    R: serde::Serialize + Send + 'static,
    H: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
{
    let schema = schemars::schema_for!(A);
    let parameters = serde_json::to_value(schema.schema).expect("derived schema serializes");
    let handler = Arc::new(handler);
    ToolDef::from_handler(name, description, parameters, move |raw: Value| {
        let handler = handler.clone();
        Box::pin(async move {
            let args: A = serde_json::from_value(raw)?;
            let out = handler(args).await?;
            Ok(serde_json::to_value(out)?)
        })
    })
}

/// One agent's tool set: advertised specs plus name-routed services.
#[derive(Clone, Default)]
pub struct ToolBox {
    specs: Vec<ChatCompletionTool>,
    services: HashMap<String, ToolSvc>,
}

impl ToolBox {
    pub fn new(tools: Vec<ToolDef>) -> Self {
        let mut specs = Vec::with_capacity(tools.len());
        let mut services = HashMap::new();
        for td in tools {
            specs.push(td.to_openai_tool());
            services.insert(td.name.to_string(), td.service);
        }
        Self { specs, services }
    }

    /// Advertise a spec with no backing service. Calls to it are terminal for
    /// the reasoning engine and surface in the transcript for the node layer.
    pub fn advertise(&mut self, spec: ChatCompletionTool) {
        self.specs.push(spec);
    }

    pub fn specs(&self) -> &[ChatCompletionTool] {
        &self.specs
    }

    /// Whether a named tool has an executable service behind it.
    pub fn is_routable(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Dispatch an invocation to its service by name.
    pub async fn dispatch(&self, invocation: ToolInvocation) -> Result<ToolOutput, BoxError> {
        let svc = self
            .services
            .get(&invocation.name)
            .ok_or_else(|| format!("unknown tool: {}", invocation.name))?;
        let mut svc = svc.clone();
        ServiceExt::ready(&mut svc).await?.call(invocation).await
    }
}

impl std::fmt::Debug for ToolBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolBox")
            .field("specs", &self.specs.len())
            .field("routable", &self.services.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

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

    #[tokio::test]
    async fn toolbox_routes_by_name() {
        let toolbox = ToolBox::new(vec![add_tool()]);
        assert!(toolbox.is_routable("add"));

        let out = toolbox
            .dispatch(ToolInvocation {
                id: "call_1".into(),
                name: "add".into(),
                arguments: serde_json::json!({"a": 2.0, "b": 3.0}),
            })
            .await
            .unwrap();
        assert_eq!(out.id, "call_1");
        assert_eq!(out.result["sum"], 5.0);
    }

    #[tokio::test]
    async fn advertised_specs_are_not_routable() {
        let mut toolbox = ToolBox::new(vec![]);
        let spec = ChatCompletionToolArgs::default()
            .r#type(ChatCompletionToolType::Function)
            .function(
                FunctionObjectArgs::default()
                    .name("transfer_to_math_expert")
                    .description("Transfer control to math_expert")
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        toolbox.advertise(spec);

        assert_eq!(toolbox.specs().len(), 1);
        assert!(!toolbox.is_routable("transfer_to_math_expert"));
        let err = toolbox
            .dispatch(ToolInvocation {
                id: "call_1".into(),
                name: "transfer_to_math_expert".into(),
                arguments: serde_json::json!({}),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown tool"));
    }

    #[test]
    fn typed_tool_generates_schema() {
        let tool = add_tool();
        let spec = tool.to_openai_tool();
        assert_eq!(spec.function.name, "add");
        let params = spec.function.parameters.unwrap();
        assert!(params["properties"]["a"].is_object());
        assert!(params["properties"]["b"].is_object());
    }
}
