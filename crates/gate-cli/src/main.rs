//! govgate - command-line front end for the LLM governance gate

use anyhow::{bail, Context};
use clap::Parser;
use gate_core::{GateConfig, LogBackend, Router};
use gate_types::{AgentId, HumanId, HumanVerdict, LogEntry, ProposalId};
use serde::Serialize;
use serde_json::{json, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "govgate")]
#[command(about = "Governance gate for LLM agent output")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML, or JSON by extension). Defaults apply when absent.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Submit a payload for governance
    Submit {
        /// Submitting agent id
        #[arg(long)]
        agent: String,
        /// Proposal type (registered schema name)
        #[arg(long = "type", default_value = "llm_output.v1")]
        proposal_type: String,
        /// JSON payload file; stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Show the decision and status of a proposal
    Decision {
        /// Proposal id
        id: String,
    },
    /// Approve or reject a pending proposal
    Resolve {
        /// Proposal id
        id: String,
        /// Resolving human id
        #[arg(long)]
        human: String,
        #[arg(long, conflicts_with = "reject", required_unless_present = "reject")]
        approve: bool,
        #[arg(long)]
        reject: bool,
    },
    /// Cancel your own pending proposal
    Cancel {
        /// Proposal id
        id: String,
        /// Submitting agent id
        #[arg(long)]
        agent: String,
    },
    /// Export log entries
    Log {
        #[arg(long, default_value_t = 0)]
        from: u64,
        #[arg(long)]
        to: Option<u64>,
    },
    /// Verify the stored hash chain
    Verify,
    /// Expire overdue pending proposals once
    Sweep,
    /// Run the expiry sweeper until interrupted
    Watch,
    /// Check configuration validity
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    if let Commands::Check = cli.command {
        config.validate().context("invalid configuration")?;
        return print(&json!({
            "valid": true,
            "log": config.log,
            "decision": config.decision,
            "admission": config.admission,
            "sweep": config.sweep,
            "schemas": config.schemas.keys().collect::<Vec<_>>(),
            "rule_sets": config.rule_sets.iter().map(|r| &r.version).collect::<Vec<_>>(),
        }));
    }

    if config.log.backend == LogBackend::Memory {
        warn!("Using the in-memory log; nothing survives this process");
    }
    let router = Router::open(config).context("opening the governance log")?;

    match cli.command {
        Commands::Submit {
            agent,
            proposal_type,
            input,
        } => {
            let payload = read_payload(input.as_deref())?;
            let submission = router.submit(&AgentId::new(agent), &proposal_type, payload)?;
            print(&submission)
        }
        Commands::Decision { id } => {
            let id = parse_id(&id)?;
            let status = router.status(id)?;
            print(&json!({ "proposal_id": id, "status": status }))
        }
        Commands::Resolve {
            id,
            human,
            approve,
            reject,
        } => {
            let verdict = match (approve, reject) {
                (true, false) => HumanVerdict::Approve,
                (false, true) => HumanVerdict::Reject,
                _ => bail!("exactly one of --approve or --reject is required"),
            };
            let id = parse_id(&id)?;
            let decision = router.resolve(id, verdict, &HumanId::new(human))?;
            print(&json!({ "proposal_id": id, "decision": decision }))
        }
        Commands::Cancel { id, agent } => {
            let id = parse_id(&id)?;
            let decision = router.cancel(id, &AgentId::new(agent))?;
            print(&json!({ "proposal_id": id, "decision": decision }))
        }
        Commands::Log { from, to } => {
            let entries = router.read_log(from, to.unwrap_or(u64::MAX));
            let entries: Vec<&LogEntry> = entries.iter().map(|e| e.as_ref()).collect();
            print(&entries)
        }
        Commands::Verify => print(&router.verify_log()?),
        Commands::Sweep => print(&router.sweep()),
        Commands::Watch => {
            let sweeper = router.start_sweeper();
            info!(
                "Watching {} pending proposals; Ctrl-C to stop",
                router.pending().len()
            );
            tokio::signal::ctrl_c()
                .await
                .context("waiting for Ctrl-C")?;
            sweeper.stop().await;
            print(&json!({ "pending": router.pending() }))
        }
        Commands::Check => Ok(()),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<GateConfig> {
    match path {
        Some(path) => GateConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(GateConfig::default()),
    }
}

fn read_payload(input: Option<&Path>) -> anyhow::Result<Value> {
    let text = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading payload {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading payload from stdin")?;
            text
        }
    };
    serde_json::from_str(&text).context("payload is not valid JSON")
}

fn parse_id(id: &str) -> anyhow::Result<ProposalId> {
    id.parse()
        .map_err(|_| anyhow::anyhow!("invalid proposal id: {}", id))
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_resolve_requires_a_verdict() {
        assert!(Cli::try_parse_from(["govgate", "resolve", "x", "--human", "h"]).is_err());
        assert!(Cli::try_parse_from([
            "govgate", "resolve", "x", "--human", "h", "--approve", "--reject"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["govgate", "resolve", "x", "--human", "h", "--reject"]).is_ok());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["govgate", "log", "--from", "3", "--config", "gate.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("gate.toml")));
        assert!(matches!(cli.command, Commands::Log { from: 3, to: None }));
    }

    #[test]
    fn test_parse_id() {
        let id = ProposalId::new();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        assert!(parse_id("not-a-uuid").is_err());
    }

    #[test]
    fn test_payload_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.json");
        std::fs::write(&path, r#"{"output": "hi"}"#).unwrap();
        assert_eq!(read_payload(Some(&path)).unwrap(), json!({"output": "hi"}));
        std::fs::write(&path, "not json").unwrap();
        assert!(read_payload(Some(&path)).is_err());
        assert!(read_payload(Some(&dir.path().join("missing.json"))).is_err());
    }
}
