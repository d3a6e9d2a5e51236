//! Live research-and-math demo: a supervisor delegating to a math expert and
//! a researcher over a real OpenAI-compatible model, with Langfuse tracing.
//!
//! Configuration comes from the environment: `MODEL_ID`, `MODEL_BASE_URL`,
//! `MODEL_API_KEY` for the model, and `LANGFUSE_PUBLIC_KEY`,
//! `LANGFUSE_SECRET_KEY`, `LANGFUSE_HOST` for tracing. Tracing degrades to a
//! no-op if the backend is unreachable; the workflow still runs.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tower_supervisor::{
    create_forward_message_tool, create_supervisor, tool_typed, ConversationState, Engine,
    ModelConfig, ObservabilityConfig, Tracer, WorkerAgent,
};

#[derive(Debug, Deserialize, JsonSchema)]
struct BinaryArgs {
    a: f64,
    b: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchArgs {
    query: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let engine = Engine::openai(&ModelConfig::from_env());

    let add = tool_typed("add", "Add two numbers", |args: BinaryArgs| async move {
        Ok(json!({ "sum": args.a + args.b }))
    });
    let multiply = tool_typed(
        "multiply",
        "Multiply two numbers",
        |args: BinaryArgs| async move { Ok(json!({ "product": args.a * args.b })) },
    );
    let web_search = tool_typed(
        "web_search",
        "Search the web for information",
        |args: SearchArgs| async move {
            // Simulated retrieval; swap in a real search client as needed.
            Ok(json!(format!(
                "Search results for '{}': the Amazon is the largest rainforest on Earth.",
                args.query
            )))
        },
    );

    let math_expert = WorkerAgent::builder(engine.clone())
        .name("math_expert")
        .prompt("You are a math expert who can perform calculations.")
        .tools(vec![add, multiply])
        .build()?;
    let researcher = WorkerAgent::builder(engine.clone())
        .name("researcher")
        .prompt("You are a research expert who can find information online.")
        .tool(web_search)
        .build()?;

    let workflow = create_supervisor(
        vec![math_expert, researcher],
        engine,
        "You are a supervisor agent that coordinates specialized expert agents.\n\
         You have access to the following agents:\n\
         - math_expert: for solving mathematical calculations\n\
         - researcher: for finding information online\n\
         When given a task, decide which agent is best suited to handle it, then \
         use the handoff tools to delegate the task to that agent.",
    )?
    .with_forward_message_tool(create_forward_message_tool(None))
    .compile("MixedTaskSolver")?;

    let tracer = Tracer::connect(ObservabilityConfig::from_env()).await;
    let traced = tracer.trace_workflow(workflow);

    let result = traced
        .invoke(
            ConversationState::from_user(
                "I need to calculate 123 * 456 and find information about the \
                 largest rainforest.",
            ),
            None,
        )
        .await?;

    println!("Final answer:");
    println!("{}", result.last_assistant_text().unwrap_or("(no answer)"));
    if tracer.is_enabled() {
        println!("\nView the delegation trace in your Langfuse project.");
    }
    Ok(())
}
