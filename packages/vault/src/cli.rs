use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::Fingerprint;
use crate::state::VaultState;

#[derive(Parser)]
#[command(name = "vault")]
#[command(about = "Blob storage maintenance", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Count which tiers hold each blob.
    Scan {
        #[arg(short, long)]
        batch_size: Option<u64>,
    },
    /// List blobs without a valid local copy.
    Missing {
        #[arg(short, long)]
        batch_size: Option<u64>,
    },
    /// Copy remote-only blobs into the local tier.
    Backfill {
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(short, long)]
        batch_size: Option<u64>,
    },
    /// List groups of identical blobs.
    Duplicates {
        #[arg(short, long)]
        scope: Option<String>,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Keep the oldest blob of a duplicate group and delete the rest.
    Resolve {
        #[arg(long)]
        scope: String,
        #[arg(long)]
        checksum: String,
        #[arg(long)]
        size: u64,
        #[arg(long, default_value = "image/png")]
        content_type: String,
    },
    /// Recompute descriptive names, for one blob or all of them.
    Rename {
        #[arg(long)]
        id: Option<Uuid>,
    },
}

impl Cli {
    pub async fn run(self, state: &VaultState, config: &AppConfig) -> Result<()> {
        let batch = |size: Option<u64>| size.unwrap_or(config.reconcile.batch_size);

        match self.command {
            Command::Scan { batch_size } => {
                let stats = state
                    .reporter()
                    .scan(batch(batch_size))
                    .await
                    .context("Reconciliation scan failed")?;
                print_json(&stats)
            }
            Command::Missing { batch_size } => {
                let missing = state
                    .reporter()
                    .missing_objects(batch(batch_size))
                    .await
                    .context("Failed to list missing objects")?;
                print_json(&missing)
            }
            Command::Backfill { limit, batch_size } => {
                let report = state
                    .backfill(batch(batch_size))
                    .run(limit)
                    .await
                    .context("Backfill failed")?;
                print_json(&report)
            }
            Command::Duplicates { scope, limit } => {
                let groups = state
                    .dedupe()
                    .find_duplicate_groups(
                        scope.as_deref(),
                        limit.unwrap_or(config.dedupe.group_limit),
                    )
                    .await
                    .context("Failed to find duplicate groups")?;
                print_json(&groups)
            }
            Command::Resolve {
                scope,
                checksum,
                size,
                content_type,
            } => {
                let fingerprint = Fingerprint {
                    scope_id: scope,
                    checksum,
                    byte_size: size,
                    content_type,
                };
                let result = state.dedupe().resolve(&fingerprint).await?;
                print_json(&serde_json::json!({
                    "summary": result.to_string(),
                    "result": result,
                }))
            }
            Command::Rename { id: Some(id) } => {
                let change = state.service().refresh_name(id).await?;
                print_json(&change)
            }
            Command::Rename { id: None } => {
                let changes = state
                    .service()
                    .refresh_all_names(config.reconcile.batch_size)
                    .await
                    .context("Rename pass failed")?;
                print_json(&changes)
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
