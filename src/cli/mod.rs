//! `scriptorium-cli`: maintenance-oriented commands against a running
//! workspace, independent of the HTTP surface.

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::ids::Id;
use crate::publish::{PublishRequest, RollbackRequest};
use crate::query::SearchRequest;
use crate::AppState;

#[derive(Debug, Parser)]
#[command(name = "scriptorium-cli", about = "Operational tooling for a scriptorium workspace")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Prints entity counts and pending visibility events.
    Stats,
    /// Publishes a note's current draft into one or more collections.
    Publish {
        #[arg(long)]
        note_id: String,
        #[arg(long, value_delimiter = ',')]
        collections: Vec<String>,
        #[arg(long)]
        client_token: String,
    },
    /// Rolls a note back to a prior version.
    Rollback {
        #[arg(long)]
        note_id: String,
        #[arg(long)]
        target_version_id: String,
        #[arg(long)]
        client_token: String,
    },
    /// Runs a search against the published corpus.
    Search {
        query: String,
        #[arg(long)]
        collections: Option<String>,
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
}

pub async fn run(state: Arc<AppState>, command: Command) -> crate::Result<()> {
    match command {
        Command::Stats => {
            let health = state.store.get_storage_health().await?;
            println!(
                "notes={} drafts={} versions={} collections={} publications={} sessions={} snapshots={} pending_visibility_events={}",
                health.notes,
                health.drafts,
                health.versions,
                health.collections,
                health.publications,
                health.sessions,
                health.snapshots,
                health.pending_visibility_events,
            );
        }
        Command::Publish { note_id, collections, client_token } => {
            let req = PublishRequest {
                note_id: Id::from_raw(note_id),
                collections: collections.into_iter().map(Id::from_raw).collect(),
                label: None,
                client_token,
            };
            let resp = crate::publish::publish(&state.store, req).await?;
            println!("{}", serde_json::to_string_pretty(&resp).unwrap_or_default());
        }
        Command::Rollback { note_id, target_version_id, client_token } => {
            let req = RollbackRequest {
                note_id: Id::from_raw(note_id),
                target_version_id: Id::from_raw(target_version_id),
                client_token,
            };
            let resp = crate::publish::rollback(&state.store, req).await?;
            println!("{}", serde_json::to_string_pretty(&resp).unwrap_or_default());
        }
        Command::Search { query, collections, page } => {
            let req = SearchRequest {
                query,
                collections: collections.map(|csv| csv.split(',').filter(|s| !s.is_empty()).map(Id::from_raw).collect()),
                page,
                page_size: None,
            };
            let resp = crate::query::search(&state.store, &state.corpus, &state.metrics, &state.config, req).await?;
            println!("{}", serde_json::to_string_pretty(&resp).unwrap_or_default());
        }
    }
    Ok(())
}
