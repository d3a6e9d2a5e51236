//! Offline executive-assistant demo: a supervisor coordinating two coffee
//! specialists over scripted reasoning engines, so it runs with no API key
//! and no network.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tower_supervisor::{
    create_forward_message_tool, create_supervisor, tool_typed, ConversationState, Engine,
    ScriptedTurn, WorkerAgent,
};

#[derive(Debug, Deserialize, JsonSchema)]
struct ScheduleArgs {
    time: String,
    meeting_type: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct OccasionArgs {
    occasion: String,
}

fn ceo_coffee_expert() -> tower_supervisor::Result<WorkerAgent> {
    let order = tool_typed(
        "get_ceo_coffee_order",
        "Get the CEO's preferred coffee order",
        |_args: serde_json::Value| async move {
            Ok(json!(
                "CEO's order: Double shot oat milk cortado, extra hot, no foam, \
                 with a dash of cinnamon."
            ))
        },
    );
    let schedule = tool_typed(
        "prepare_ceo_coffee_schedule",
        "Prepare coffee timing based on the CEO's schedule",
        |args: ScheduleArgs| async move {
            let plan = if args.meeting_type.to_lowercase().contains("board") {
                format!(
                    "For {} at {}: cortado ready 5 minutes early, boardroom blend beans.",
                    args.meeting_type, args.time
                )
            } else {
                format!(
                    "For {} at {}: standard cortado ready 2 minutes before start.",
                    args.meeting_type, args.time
                )
            };
            Ok(json!(plan))
        },
    );
    let preferences = tool_typed(
        "check_ceo_coffee_preferences",
        "Check special coffee preferences for an occasion",
        |args: OccasionArgs| async move {
            let note = match args.occasion.to_lowercase().as_str() {
                "stressful" => "Switch to decaf cortado with extra cinnamon and a biscotti",
                "celebration" => "Upgrade to single-origin Ethiopian beans",
                _ => "Standard cortado preparation applies",
            };
            Ok(json!(note))
        },
    );

    // Scripted reasoning: check the occasion, plan the timing, then report.
    WorkerAgent::builder(Engine::scripted(vec![
        ScriptedTurn::call(
            "check_ceo_coffee_preferences",
            json!({"occasion": "stressful"}),
        ),
        ScriptedTurn::call(
            "prepare_ceo_coffee_schedule",
            json!({"time": "10am", "meeting_type": "board meeting"}),
        ),
        ScriptedTurn::answer(
            "Board meeting plan: decaf cortado with extra cinnamon and a biscotti, \
             ready 5 minutes early on the boardroom blend.",
        ),
    ]))
    .name("ceo_coffee_expert")
    .prompt(
        "You are the CEO's personal coffee specialist. You know the CEO's \
         preferences, timing, and special requirements for every occasion.",
    )
    .tools(vec![order, schedule, preferences])
    .build()
}

fn dog_coffee_expert() -> tower_supervisor::Result<WorkerAgent> {
    let order = tool_typed(
        "get_dog_coffee_order",
        "Get Barkley's puppuccino order",
        |_args: serde_json::Value| async move {
            Ok(json!(
                "Barkley's order: puppuccino with a dash of cinnamon, room temperature. \
                 No caffeine!"
            ))
        },
    );
    let treat = tool_typed(
        "prepare_dog_coffee_treat",
        "Prepare a special dog coffee treat for an occasion",
        |args: OccasionArgs| async move {
            Ok(json!(format!(
                "For {}: puppuccino with a dog biscuit and an extra whipped cream swirl.",
                args.occasion
            )))
        },
    );

    WorkerAgent::builder(Engine::scripted(vec![
        ScriptedTurn::call("prepare_dog_coffee_treat", json!({"occasion": "board meeting day"})),
        ScriptedTurn::answer(
            "Barkley gets a puppuccino with a dog biscuit and an extra whipped \
             cream swirl, served alongside the CEO's coffee.",
        ),
    ]))
    .name("dog_coffee_expert")
    .prompt(
        "You are Barkley the dog's coffee specialist. You handle all puppuccino \
         orders and special treats for the CEO's Golden Retriever.",
    )
    .tools(vec![order, treat])
    .build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    // Supervisor script: consult both specialists, then summarize.
    let supervisor_engine = Engine::scripted(vec![
        ScriptedTurn::call("transfer_to_ceo_coffee_expert", json!({"reason": "CEO coffee"})),
        ScriptedTurn::call("transfer_to_dog_coffee_expert", json!({"reason": "Barkley treat"})),
        ScriptedTurn::answer(
            "Coffee plan for tomorrow's 10am board meeting: a decaf cortado with \
             extra cinnamon and a biscotti for you, ready 5 minutes early, and a \
             puppuccino with a biscuit for Barkley. Nothing mixed up!",
        ),
    ]);

    let workflow = create_supervisor(
        vec![ceo_coffee_expert()?, dog_coffee_expert()?],
        supervisor_engine,
        "You are the CEO's executive assistant. You manage two coffee runners: \
         ceo_coffee_expert for the CEO's coffee and dog_coffee_expert for \
         Barkley's puppuccino. Coordinate with the right specialist and never \
         mix up the cortado with the puppuccino.",
    )?
    .with_forward_message_tool(create_forward_message_tool(None))
    .compile("ExecutiveAssistant")?;

    println!("=== Executive Assistant Coffee Demo ===\n");
    let request = "We have the board meeting at 10am tomorrow, and it might be \
                   stressful. Can you prepare coffee for both me and Barkley?";
    println!("Request: {}\n", request);

    let result = workflow
        .invoke(ConversationState::from_user(request), None)
        .await?;

    println!("Executive Assistant Response:");
    println!("{}", result.last_assistant_text().unwrap_or("(no answer)"));
    Ok(())
}
