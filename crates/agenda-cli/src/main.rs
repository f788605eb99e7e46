//! Agenda CLI
//!
//! Operator front end over the agenda library. Each invocation loads the
//! proposal state, runs one operation, prints the wire response as JSON on
//! stdout and persists the state again.
//!
//! # Usage
//!
//! ```bash
//! agenda --state ./agenda-state.json import proposals.json
//! agenda --config agenda.toml --state ./agenda-state.json \
//!     submit post-1 recommend_to_manager --decider sup-1 --reason "Broad team support"
//! agenda --state ./agenda-state.json pending --user dd-1 --level 8 --facility fac-1
//! agenda ladder --dot
//! ```

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use agenda::{
    AgendaService, AgendaStore, ApiFailure, Collaborators, DeliveryWorker, HistoryRequest,
    Ladder, LogSink, MemoryStore, NotificationDispatcher, PendingRequest, Proposal,
    RecordExpiredRequest, SharedStore, SubmitDecisionRequest, TransitionGraph,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use config::CliConfig;
use serde::Serialize;
use tracing::{info, warn};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config with [decision], [queries], [notifications], [store] and [[profiles]]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON state snapshot (overrides store.snapshot_path)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load proposals from a JSON array into the store
    Import {
        file: PathBuf,
    },
    /// Raise a proposal's vote score
    Score {
        post_id: String,
        score: u32,
    },
    /// Submit a ladder decision
    Submit {
        post_id: String,
        /// e.g. recommend_to_manager, reject_by_manager, complete_rejection
        decision_type: String,
        #[arg(long)]
        decider: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        committee: Option<String>,
    },
    /// Record a resolution for a proposal whose voting deadline passed
    Expire {
        post_id: String,
        /// approve_at_current_level, downgrade or reject
        decision: String,
        #[arg(long)]
        decider: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        current_score: u32,
        #[arg(long)]
        target_score: u32,
        #[arg(long)]
        level: String,
        #[arg(long)]
        proposal_type: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        facility: Option<String>,
    },
    /// Expired-decision history visible to a caller
    History {
        #[arg(long)]
        user: String,
        #[arg(long)]
        level: f64,
        #[arg(long)]
        facility: Option<String>,
        #[arg(long)]
        department: Option<String>,
        /// RFC 3339 timestamp
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// RFC 3339 timestamp
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Proposals past deadline awaiting resolution, visible to a caller
    Pending {
        #[arg(long)]
        user: String,
        #[arg(long)]
        level: f64,
        #[arg(long)]
        facility: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Decisions a user may take on a proposal right now
    Menu {
        post_id: String,
        #[arg(long)]
        user: String,
    },
    /// Decision records of a proposal
    Records {
        post_id: String,
    },
    /// Print the escalation ladder
    Ladder {
        /// Graphviz DOT instead of a table
        #[arg(long, default_value_t = false)]
        dot: bool,
    },
    /// Print the JSON Schemas of the wire types
    Schema,
}

fn open_store(config: &CliConfig, state: Option<PathBuf>) -> Result<SharedStore> {
    if let Some(path) = state.or_else(|| config.agenda.store.snapshot_path.clone()) {
        info!("Agenda state snapshot: {}", path.display());
        let store = MemoryStore::with_snapshot(&path)
            .with_context(|| format!("Failed to open state snapshot {}", path.display()))?;
        let store: SharedStore = store.shared();
        return Ok(store);
    }

    if let Some(path) = &config.agenda.store.rocksdb_path {
        return open_rocks(path);
    }

    warn!("No state path configured; changes will not be persisted");
    let store: SharedStore = MemoryStore::new().shared();
    Ok(store)
}

#[cfg(feature = "rocksdb-store")]
fn open_rocks(path: &std::path::Path) -> Result<SharedStore> {
    info!("Agenda RocksDB store: {}", path.display());
    let store = agenda::RocksStore::open(path)
        .with_context(|| format!("Failed to open RocksDB store {}", path.display()))?;
    let store: SharedStore = store.shared();
    Ok(store)
}

#[cfg(not(feature = "rocksdb-store"))]
fn open_rocks(path: &std::path::Path) -> Result<SharedStore> {
    anyhow::bail!(
        "store.rocksdb_path is set to {} but agenda was built without the rocksdb-store feature",
        path.display()
    )
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize response")?
    );
    Ok(())
}

/// Print a wire response, or the failure and an error for the exit code.
fn emit<T: Serialize>(result: Result<T, ApiFailure>) -> Result<()> {
    match result {
        Ok(response) => print_json(&response),
        Err(failure) => {
            print_json(&failure)?;
            Err(anyhow::Error::new(failure))
        }
    }
}

fn print_ladder(ladder: &Ladder) {
    for rung in ladder.rungs() {
        let threshold = rung
            .score_threshold
            .map(|s| format!("≥{}", s))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<42} {:<12} {:>6}  level {}",
            rung.status.as_str(),
            rung.tier.to_string(),
            threshold,
            rung.authorized
        );
        for transition in &rung.transitions {
            match transition.rescue_target {
                Some(window) => println!(
                    "    {:<36} -> {} -> {}",
                    transition.decision.as_str(),
                    transition.target.as_str(),
                    window.as_str()
                ),
                None => println!(
                    "    {:<36} -> {}",
                    transition.decision.as_str(),
                    transition.target.as_str()
                ),
            }
        }
    }
}

fn run(command: Command, service: &AgendaService, store: &SharedStore) -> Result<()> {
    match command {
        Command::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let proposals: Vec<Proposal> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse proposals in {}", file.display()))?;
            for proposal in &proposals {
                store
                    .put_proposal(proposal)
                    .with_context(|| format!("Failed to store proposal {}", proposal.id))?;
            }
            info!(count = proposals.len(), "Imported proposals");
            print_json(&serde_json::json!({ "success": true, "imported": proposals.len() }))
        }
        Command::Score { post_id, score } => {
            store
                .update_score(&post_id, score)
                .with_context(|| format!("Failed to update score of {}", post_id))?;
            info!(post_id = %post_id, score, "Updated vote score");
            print_json(&serde_json::json!({ "success": true, "postId": post_id, "agendaScore": score }))
        }
        Command::Submit {
            post_id,
            decision_type,
            decider,
            reason,
            committee,
        } => emit(service.submit_decision(SubmitDecisionRequest {
            post_id,
            decision_type,
            decider_id: decider,
            reason,
            committee_id: committee,
        })),
        Command::Expire {
            post_id,
            decision,
            decider,
            reason,
            current_score,
            target_score,
            level,
            proposal_type,
            department,
            facility,
        } => emit(service.record_expired_decision(RecordExpiredRequest {
            post_id,
            decision,
            decider_id: decider,
            decision_reason: reason,
            current_score,
            target_score,
            agenda_level: level,
            proposal_type,
            department,
            facility_id: facility,
        })),
        Command::History {
            user,
            level,
            facility,
            department,
            start,
            end,
            limit,
            offset,
        } => emit(service.history(HistoryRequest {
            user_id: user,
            permission_level: level,
            facility_id: facility,
            department,
            start_date: start,
            end_date: end,
            limit,
            offset,
        })),
        Command::Pending {
            user,
            level,
            facility,
            department,
            limit,
            offset,
        } => emit(service.pending_proposals(PendingRequest {
            user_id: user,
            permission_level: level,
            facility_id: facility,
            department,
            limit,
            offset,
        })),
        Command::Menu { post_id, user } => emit(service.available_decisions(&post_id, &user)),
        Command::Records { post_id } => emit(service.decision_history(&post_id)),
        Command::Ladder { .. } | Command::Schema => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Commands that need no state
    match &args.command {
        Command::Ladder { dot } => {
            let ladder = Ladder::standard();
            let graph = TransitionGraph::from_ladder(ladder);
            graph.validate(ladder).context("Standard ladder failed validation")?;
            if *dot {
                println!("{}", graph.to_dot());
            } else {
                print_ladder(ladder);
            }
            return Ok(());
        }
        Command::Schema => return print_json(&agenda::api::wire_schemas()),
        _ => {}
    }

    let config = CliConfig::load(args.config.as_deref())?;
    let store = open_store(&config, args.state)?;
    let dispatcher =
        NotificationDispatcher::with_capacity(config.agenda.notifications.channel_capacity)
            .shared();
    let worker = DeliveryWorker::new(dispatcher.subscribe(), Arc::new(LogSink)).spawn();

    let services = Collaborators::new(store.clone(), Arc::new(config.directory()))
        .with_dispatcher(dispatcher.clone());
    let service = AgendaService::new(services, &config.agenda);

    let result = run(args.command, &service, &store);

    // Close the channel so the worker drains and exits
    drop(service);
    drop(dispatcher);
    match worker.await {
        Ok(stats) => info!(
            delivered = stats.delivered,
            failed = stats.failed,
            lagged = stats.lagged,
            "Notification delivery finished"
        ),
        Err(e) => warn!("Notification worker failed: {}", e),
    }

    result
}
