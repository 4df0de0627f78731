use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use watchtower::config::Config;
use watchtower::demo::ResearchLoopGraph;
use watchtower::error::WatchtowerError;
use watchtower::graph::Graph;
use watchtower::interceptor::{RunOutcome, Watchtower};
use watchtower::session::{Flow, SessionSummary};
use watchtower::trace::TraceGraph;

/// Exit code when a loop was detected
const EXIT_LOOP_DETECTED: i32 = 2;

/// Watchtower: detect agent teams stuck in loops
#[derive(Parser, Debug)]
#[command(name = "watchtower")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (TOML format)
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Loop score threshold for alerts (default: 0.7)
    #[arg(short = 't', long = "threshold", global = true)]
    threshold: Option<f64>,

    /// Number of recent steps to analyse (default: 10)
    #[arg(short = 'w', long = "window-size", global = true)]
    window_size: Option<usize>,

    /// Steps required before alerting (default: 5)
    #[arg(long = "min-steps", global = true)]
    min_steps: Option<usize>,

    /// Suppress step-by-step output
    #[arg(short = 's', long = "silent", global = true)]
    silent: bool,

    /// Stop consuming the run as soon as a loop is detected
    #[arg(long = "stop-on-loop", global = true)]
    stop_on_loop: bool,

    /// Print the session summary as JSON
    #[arg(long = "json", global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monitor a recorded JSONL trace of node updates
    Replay {
        /// Trace file path
        file: PathBuf,
    },
    /// Monitor the built-in research/analysis loop demo
    Demo {
        /// Research rounds before the analysis agent gives up
        #[arg(short = 'i', long = "iterations", default_value_t = 20)]
        iterations: u64,
    },
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("watchtower=debug,info")
    } else {
        EnvFilter::new("watchtower=warn")
    };

    // Logs go to stderr so they never mix with the report or --json output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Default config location: <config_dir>/watchtower/config.toml
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("watchtower").join("config.toml"))
        .filter(|path| path.exists())
}

fn load_config(cli: &Cli) -> Result<Config, WatchtowerError> {
    // Start with default config or load from file
    let mut config = match cli.config.clone().or_else(default_config_path) {
        Some(path) => {
            info!("Loading config from {}", path.display());
            Config::from_file(&path)?
        }
        None => Config::default(),
    };

    // Merge CLI arguments
    config.merge_cli_args(cli.threshold, cli.window_size, cli.min_steps, cli.silent);
    if cli.json {
        // Step lines would interleave with the JSON document
        config.silent = true;
    }
    if matches!(cli.command, Command::Demo { .. }) {
        config.framework = "watchtower demo graph".to_string();
    }

    config.validate()?;
    Ok(config)
}

async fn monitor<G: Graph>(
    graph: G,
    input: Value,
    config: Config,
    stop_on_loop: bool,
) -> Result<(RunOutcome, SessionSummary), WatchtowerError> {
    let mut watchtower = Watchtower::new(graph, config)?;
    if stop_on_loop {
        watchtower = watchtower.on_loop(|result| {
            warn!(
                "Stopping run: loop '{}' repeated {} times",
                result.pattern, result.repeat_count
            );
            Ok(Flow::Stop)
        });
    }

    let outcome = watchtower.invoke(&input).await?;
    Ok((outcome, watchtower.summary()))
}

async fn run(cli: &Cli, config: Config) -> Result<(RunOutcome, SessionSummary), WatchtowerError> {
    match &cli.command {
        Command::Replay { file } => {
            let graph = TraceGraph::from_file(file).await?;
            info!("Replaying {} recorded events from {}", graph.len(), file.display());
            monitor(graph, Value::Null, config, cli.stop_on_loop).await
        }
        Command::Demo { iterations } => {
            let graph = ResearchLoopGraph::new(*iterations);
            let input = ResearchLoopGraph::initial_input("AI agent market analysis 2026");
            monitor(graph, input, config, cli.stop_on_loop).await
        }
    }
}

fn print_outcome(outcome: &RunOutcome, summary: &SessionSummary, json: bool) {
    if json {
        match serde_json::to_string_pretty(summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to serialize summary: {}", e),
        }
        return;
    }

    match outcome {
        RunOutcome::Cancelled { .. } => {
            println!(
                "  {} Watchtower caught the loop and stopped execution.",
                "✓".green()
            );
        }
        RunOutcome::Unmonitored { .. } => {
            println!(
                "  {} Monitoring failed; the run completed unmonitored.",
                "WARNING:".yellow().bold()
            );
        }
        RunOutcome::Completed { .. } if summary.loop_detected() => {
            println!(
                "  {} Loop detected; the run was allowed to continue.",
                "LOOP:".red().bold()
            );
        }
        RunOutcome::Completed { .. } => {
            println!("  {} No loops detected.", "✓".green());
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    // Load configuration
    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    // Run with Ctrl+C handling
    let result = tokio::select! {
        result = run(&cli, config) => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n{} Interrupted", "INTERRUPTED:".yellow().bold());
            std::process::exit(130); // Standard exit code for Ctrl+C
        }
    };

    match result {
        Ok((outcome, summary)) => {
            print_outcome(&outcome, &summary, cli.json);
            if summary.loop_detected() {
                std::process::exit(EXIT_LOOP_DETECTED);
            }
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
