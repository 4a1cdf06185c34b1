use clap::Parser;
use noema_core::config::shared;
use noema_core::{LocalSession, NoemaConfig, SessionIds, TelemetryBus, TokenUsageLedger};
use noema_reasoning::providers::{BagOfWordsEmbedder, EchoResponder, InMemoryStore};
use noema_reasoning::{KernelDeps, KernelEvent, KernelOutput, KernelRunner};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::Command;

#[derive(Parser, Debug)]
#[command(author, version, about = "Noema: a small cognitive kernel driven from the terminal", long_about = None)]
struct Args {
    /// Path to the TOML config file (missing or invalid falls back to defaults)
    #[arg(short, long, env = "NOEMA_CONFIG", default_value = "noema.toml")]
    config: String,

    /// Seed for the autonomy RNG; same seed, same choices
    #[arg(long)]
    seed: Option<String>,

    /// Run this many ticks on a simulated clock, print what happened, and exit
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the tick interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Seed a memory the agent can recall (repeatable)
    #[arg(short, long = "memory")]
    memories: Vec<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

/// Logs go to stderr so stdout stays the conversation.
fn init_tracing(json: bool) -> tracing_appender::non_blocking::WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn".into());
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .init();
    }
    guard
}

fn render(output: &KernelOutput) -> Option<String> {
    match output {
        KernelOutput::Speech { text, .. } | KernelOutput::Clarification { text, .. } => {
            Some(format!("Noema: {}", text))
        }
        KernelOutput::Action { action, reason, .. } => Some(format!("[{}] {}", action, reason)),
        KernelOutput::Silent { tick, reason } => {
            tracing::debug!("tick {} silent: {}", tick, reason);
            None
        }
    }
}

fn print_usage(runner: &KernelRunner) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&runner.ledger().snapshot())?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let _log_guard = init_tracing(args.log_json);

    let mut cfg = NoemaConfig::load_or_default(&args.config);
    if let Some(seed) = args.seed.clone() {
        cfg.kernel.seed = Some(seed);
    }
    if let Some(ms) = args.interval_ms {
        cfg.kernel.tick_interval_ms = ms.max(1);
    }
    let interval_ms = cfg.kernel.tick_interval_ms as i64;
    info!("Initializing Noema as '{}'", cfg.kernel.agent_id);

    let embedder = BagOfWordsEmbedder::default();
    let memories: Vec<&str> = args.memories.iter().map(String::as_str).collect();
    let store = Arc::new(InMemoryStore::with_memories(&embedder, &memories));
    let session = LocalSession::new(cfg.kernel.agent_id.clone(), &SessionIds::new());
    let deps = KernelDeps {
        embedder: Arc::new(embedder),
        store,
        responder: Arc::new(EchoResponder),
        session: Arc::new(session),
    };
    let ledger = Arc::new(TokenUsageLedger::new(cfg.ledger.recent_capacity));
    let telemetry = Arc::new(TelemetryBus::default());
    let runner = KernelRunner::new(shared(cfg), deps, ledger, telemetry);

    if let Some(ticks) = args.ticks {
        let start = chrono::Utc::now().timestamp_millis();
        for i in 0..ticks {
            let output = runner.tick_once(start + i as i64 * interval_ms).await;
            if let Some(line) = render(&output) {
                println!("{:>4} {}", output.tick(), line);
            }
        }
        return print_usage(&runner);
    }

    let mut outputs = runner.subscribe_outputs();
    let printer = tokio::spawn(async move {
        loop {
            match outputs.recv().await {
                Ok(output) => {
                    if let Some(line) = render(&output) {
                        println!("{}", line);
                    }
                }
                Err(RecvError::Lagged(n)) => warn!("Output printer lagged by {} ticks", n),
                Err(RecvError::Closed) => break,
            }
        }
    });

    runner.start_autonomy_loop();
    println!("Noema online. Type /help for commands, /quit to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let command = match commands::parse(trimmed) {
            Ok(c) => c,
            Err(msg) => {
                println!("{}", msg);
                continue;
            }
        };
        match command {
            Command::Say(text) => runner.submit_input(text),
            Command::Sleep => runner.dispatch(KernelEvent::SleepChanged { sleeping: true }).await,
            Command::Wake => runner.dispatch(KernelEvent::SleepChanged { sleeping: false }).await,
            Command::Goal { description, priority } => {
                let id = runner.add_goal(description, priority).await;
                println!("goal {}", id);
            }
            Command::Done(id) => runner.dispatch(KernelEvent::GoalCompleted { id }).await,
            Command::Focus(focus) => runner.dispatch(KernelEvent::FocusChanged { focus }).await,
            Command::Act(name) => match runner.submit_autonomy(&name) {
                Ok(mapping) => println!("queued {} ({})", mapping.action, mapping.reason),
                Err(e) => println!("{}", e),
            },
            Command::State => {
                println!("{}", serde_json::to_string_pretty(&runner.state().await)?);
            }
            Command::Usage => print_usage(&runner)?,
            Command::Help => println!("{}", commands::HELP),
            Command::Quit => break,
        }
    }

    runner.stop_autonomy_loop().await;
    printer.abort();
    if let Err(e) = printer.await {
        if !e.is_cancelled() {
            error!("Output printer failed: {}", e);
        }
    }
    info!("Noema stopped");
    Ok(())
}
