//! hssectl - HSSE lifecycle command-line tool
//!
//! Offline companion to the orchestration engine:
//! - Show the closure policy for a severity level
//! - Print the Event and CorrectiveAction transition tables
//! - Replay a JSON lifecycle script against an in-memory engine

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hsse_engine::state_machine::{ACTION_TRANSITIONS, TRANSITIONS};
use hsse_engine::{init_tracing, resolve_policy, EngineConfig};
use hsse_types::EventStatus;

mod replay;

#[derive(Parser)]
#[command(name = "hssectl")]
#[command(about = "HSSE lifecycle policy inspection and script replay", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "HSSE_CONFIG")]
    config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the closure rules for a severity level (1-5)
    Policy { severity: u8 },

    /// Print the transition tables
    Transitions {
        /// Only rows leaving this Event status
        #[arg(long)]
        from: Option<String>,
    },

    /// Run a lifecycle script against a fresh in-memory engine
    Replay { script: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = EngineConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    // A subscriber may already be installed by the host; not fatal
    let _ = init_tracing(&config.logging);

    match cli.command {
        Commands::Policy { severity } => {
            let policy = resolve_policy(severity)?;
            match cli.output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&policy)?),
                OutputFormat::Text => {
                    println!("severity:                 {}", policy.severity);
                    println!("self close allowed:       {}", policy.self_close_allowed);
                    println!("expert validation:        {}", policy.requires_expert_validation);
                    println!("manager close required:   {}", policy.requires_manager_close);
                    println!("closure command:          {}", policy.closure_command().as_str());
                }
            }
        }
        Commands::Transitions { from } => {
            let from = match from {
                Some(name) => Some(
                    EventStatus::ALL
                        .iter()
                        .copied()
                        .find(|s| s.as_str() == name)
                        .with_context(|| format!("unknown status '{name}'"))?,
                ),
                None => None,
            };
            print_transitions(from, cli.output)?;
        }
        Commands::Replay { script } => {
            let source = std::fs::read_to_string(&script)
                .with_context(|| format!("reading script {script}"))?;
            let report = replay::replay(&source, config).await?;
            match cli.output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => {
                    for step in &report.steps {
                        println!(
                            "{:>3}  {:<36} {:<16} {}",
                            step.index, step.op, step.actor, step.outcome
                        );
                    }
                    println!(
                        "audit chain: {} entries, {}",
                        report.chain.entries_checked,
                        if report.chain.intact { "intact" } else { "BROKEN" }
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_transitions(from: Option<EventStatus>, output: OutputFormat) -> Result<()> {
    let rows: Vec<_> = TRANSITIONS
        .iter()
        .filter(|t| from.map_or(true, |f| t.from == f))
        .collect();

    if output == OutputFormat::Json {
        let rows: Vec<_> = rows
            .iter()
            .map(|t| {
                serde_json::json!({
                    "from": t.from.as_str(),
                    "command": t.command.as_str(),
                    "to": t.to.as_str(),
                    "capability": t.capability.as_str(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{:<40} {:<34} {:<40} CAPABILITY", "FROM", "COMMAND", "TO");
    for t in rows {
        println!(
            "{:<40} {:<34} {:<40} {}",
            t.from.as_str(),
            t.command.as_str(),
            t.to.as_str(),
            t.capability
        );
    }

    if from.is_none() {
        println!();
        println!("{:<26} {:<24} {:<26} CAPABILITY", "ACTION FROM", "COMMAND", "TO");
        for t in ACTION_TRANSITIONS {
            println!(
                "{:<26} {:<24} {:<26} {}",
                t.from.as_str(),
                t.command.as_str(),
                t.to.as_str(),
                t.capability
            );
        }
    }
    Ok(())
}
