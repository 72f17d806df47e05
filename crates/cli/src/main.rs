use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use guardian_agents::{AgentConfig, AgentError, ChatAgent};
use guardian_core::{
    ChatInput, IntentEngine, QuickAccessInput, ResponderRegistry, StateSnapshot, StaticSnapshot,
    QUICK_ACCESS,
};
use guardian_observability::{init_tracing_stderr, AppMetrics};
use guardian_storage::MemoryStore;
use guardian_vision::{CameraSelection, VisionClient, DEFAULT_BASE_URL};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "guardianbot")]
#[command(about = "GuardianTrack chat assistant CLI")]
struct Cli {
    /// JSON fixture replacing the demo bus/student/driver snapshot.
    #[arg(long, env = "GUARDIAN_SNAPSHOT_FILE")]
    snapshot: Option<PathBuf>,

    /// JSON intent table replacing the built-in catalog.
    #[arg(long, env = "GUARDIAN_CATALOG_FILE")]
    catalog: Option<PathBuf>,

    #[arg(long, env = "GUARDIAN_TYPING_DELAY_MS", default_value_t = 1000)]
    typing_delay_ms: u64,

    #[arg(long, env = "GUARDIAN_VISION_URL", default_value = DEFAULT_BASE_URL)]
    vision_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Chat,
    Ask { text: String },
    Explain { text: String },
    Intent { name: String },
    Intents,
    Vision {
        #[command(subcommand)]
        command: VisionCommand,
    },
}

#[derive(Debug, Subcommand)]
enum VisionCommand {
    Status,
    Attendance,
    Start { camera: String },
    Stop,
    Encode,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing_stderr("guardian_cli");
    let cli = Cli::parse();

    let snapshot = load_snapshot(cli.snapshot.as_ref())?;
    let engine = Arc::new(load_engine(cli.catalog.as_ref())?);

    match cli.command {
        Command::Chat => {
            let agent = build_agent(engine, snapshot, cli.typing_delay_ms);
            run_chat(agent).await?;
        }
        Command::Ask { text } => {
            let resolution = engine.resolve(&text, &snapshot);
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        }
        Command::Explain { text } => {
            let trace = engine.matched_pattern(&text);
            println!("{}", serde_json::to_string_pretty(&trace)?);
        }
        Command::Intent { name } => {
            let text = engine
                .respond_to(&name, &snapshot)
                .with_context(|| format!("no reply for `{name}`"))?;
            println!("{text}");
        }
        Command::Intents => {
            println!("{}", serde_json::to_string_pretty(&engine.intents())?);
        }
        Command::Vision { command } => {
            let client = VisionClient::new(&cli.vision_url)?;
            run_vision(&client, command).await?;
        }
    }

    Ok(())
}

async fn run_chat(agent: ChatAgent<MemoryStore>) -> Result<()> {
    let mut session_id: Option<String> = None;

    println!("GuardianBot chat mode. type 'exit' to quit.");
    let shortcuts = QUICK_ACCESS
        .iter()
        .map(|button| format!("/{}", button.intent))
        .collect::<Vec<_>>();
    println!("quick access: {}", shortcuts.join(" "));

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        let result = if let Some(intent) = message.strip_prefix('/') {
            agent
                .quick_access(QuickAccessInput {
                    session_id: session_id.clone(),
                    intent: intent.to_string(),
                })
                .await
        } else {
            println!("GuardianBot is typing...");
            agent
                .handle_chat(ChatInput {
                    session_id: session_id.clone(),
                    text: message.to_string(),
                })
                .await
        };

        match result {
            Ok(reply) => {
                session_id = Some(reply.session_id);
                println!("\n{}\n", reply.reply_text);
            }
            Err(AgentError::Engine(error)) => println!("\n{error}\n"),
            Err(error) => return Err(error.into()),
        }
    }

    Ok(())
}

async fn run_vision(client: &VisionClient, command: VisionCommand) -> Result<()> {
    let output = match command {
        VisionCommand::Status => serde_json::to_string_pretty(&client.status().await?)?,
        VisionCommand::Attendance => serde_json::to_string_pretty(&client.attendance().await?)?,
        VisionCommand::Start { camera } => {
            let selection = CameraSelection::parse(&camera)
                .context("camera must be entry, exit or both")?;
            serde_json::to_string_pretty(&client.start(selection).await?)?
        }
        VisionCommand::Stop => serde_json::to_string_pretty(&client.stop().await?)?,
        VisionCommand::Encode => serde_json::to_string_pretty(&client.encode().await?)?,
    };
    println!("{output}");
    Ok(())
}

fn build_agent(
    engine: Arc<IntentEngine>,
    snapshot: StateSnapshot,
    typing_delay_ms: u64,
) -> ChatAgent<MemoryStore> {
    ChatAgent::new(
        engine,
        Arc::new(StaticSnapshot::new(snapshot)),
        Arc::new(MemoryStore::new()),
        AppMetrics::shared(),
        AgentConfig {
            typing_delay: Duration::from_millis(typing_delay_ms),
            ..AgentConfig::default()
        },
    )
}

fn load_snapshot(path: Option<&PathBuf>) -> Result<StateSnapshot> {
    let Some(path) = path else {
        return Ok(StateSnapshot::demo());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading snapshot fixture {}", path.display()))?;
    StateSnapshot::from_json(&raw)
        .with_context(|| format!("invalid snapshot fixture {}", path.display()))
}

fn load_engine(path: Option<&PathBuf>) -> Result<IntentEngine> {
    let Some(path) = path else {
        return Ok(IntentEngine::builtin());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading intent catalog {}", path.display()))?;
    IntentEngine::from_json(&raw, &ResponderRegistry::builtin())
        .with_context(|| format!("invalid intent catalog {}", path.display()))
}
