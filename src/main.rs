use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use blockrun::{
    EngineConfig, MemorySink, Orchestrator, RopeBoard, SourceUnit, StandardCapabilities,
};

/// Run a block-generated script against the rope-cutting puzzle.
#[derive(Debug, Parser)]
#[command(name = "blockrun", version, about)]
struct Cli {
    /// Script file to run
    script: PathBuf,

    /// Engine config file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Per-attempt timeout in milliseconds, overriding the config
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Length of the rope
    #[arg(long, default_value_t = 10.0)]
    rope_length: f64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(timeout_ms) = cli.timeout_ms {
        config.orchestrator.timeout_ms = timeout_ms;
    }
    config.validate()?;

    let code = std::fs::read_to_string(&cli.script)
        .with_context(|| format!("reading script {}", cli.script.display()))?;
    let source = SourceUnit::new(code);

    let orchestrator = Orchestrator::with_runner_config(config.runner, config.orchestrator);
    let console = Arc::new(MemorySink::new());
    let standard = StandardCapabilities::new(console.clone());
    let board = RopeBoard::new(cli.rope_length);

    let report = orchestrator.run(&source, &[&standard, &board]).await;

    if cli.json {
        let json = serde_json::json!({
            "attempt": report.id,
            "feedback": report.feedback,
            "error": report.error,
            "elapsed_ms": report.elapsed.as_millis() as u64,
            "console": console.records(),
            "board": {
                "cuts": board.cuts(),
                "pieces": board.pieces(),
                "history": board.history(),
            },
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        for record in console.records() {
            println!("[{}] {}", record.level.as_str(), record.message);
        }
        println!("{}", report.feedback.message());
        println!("cuts:   {:?}", board.cuts());
        println!("pieces: {:?}", board.pieces());
    }

    if !report.feedback.is_solved() {
        std::process::exit(1);
    }
    Ok(())
}
