use std::env;
use std::fs;
use std::path::PathBuf;
use anyhow::{bail, Context, Result};
use clap::Parser;
use itertools::Itertools;
use dfrc_pipeline::claims::registry::register_claim;
use dfrc_pipeline::claims::ClaimRange;
use dfrc_pipeline::merge::outcome::classify;
use dfrc_pipeline::merge::{merge, MergeContext};
use dfrc_pipeline::positions::PositionId;
use dfrc_pipeline::records::validator::{load_config, ValidationConfig};
use dfrc_pipeline::records;
use dfrc_pipeline::store::db::{
    create_db_if_not_exists, create_tables_if_not_exists, load_store, mark_superseded_except,
    RecordRow, DB_URL, RECORD_TABLE,
};

/// This executable is the validation job run against one submission: it
/// checks the claimed range, validates the submitted records against the
/// canonical DB, merges what passes, and reports the outcome for labeling.

#[derive(Parser, Debug)]
#[command(author, version)]
#[command(about = "Validates a submitted analysis batch, and merges it into the canonical DB.")]
struct Args {
    /// The path of the DB to write to.
    #[arg(short, long, default_value = DB_URL)]
    db_path: String,

    /// The NDJSON file with the submitted records.
    #[arg(short, long, default_value = "results.ndjson")]
    records: PathBuf,

    /// The submission's claim token (its branch name), e.g. `analysis/0_100`.
    #[arg(short, long)]
    claim: String,

    /// The contributor owning the claim. Falls back to $GITHUB_ACTOR.
    #[arg(short, long)]
    owner: Option<String>,

    /// Optional JSON file with the validation bounds.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Optional file with one active claim token per line, for the advisory
    /// overlap check against open submissions.
    #[arg(long)]
    active_claims: Option<PathBuf>,
}

/// `START_ID`/`END_ID` bound the batch under review when the transport
/// scopes the job. Either both are set or neither.
fn batch_bounds_from_env() -> Result<Option<(u64, u64)>> {
    let start = env::var("START_ID").ok();
    let end = env::var("END_ID").ok();

    match (start, end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => {
            let start: u64 = start.parse().context("START_ID must be an integer")?;
            let end: u64 = end.parse().context("END_ID must be an integer")?;
            if start >= end {
                bail!("batch bounds [{start}, {end}) are empty or inverted");
            }

            Ok(Some((start, end)))
        }
        _ => bail!("START_ID and END_ID must be set together"),
    }
}

fn read_active_claims(path: &PathBuf, own_token: &str) -> Result<Vec<ClaimRange>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read active claims {}", path.display()))?;

    contents
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && *line != own_token)
        .map(|token| ClaimRange::parse(token, "").map_err(anyhow::Error::from))
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();

    let owner = args
        .owner
        .clone()
        .or_else(|| env::var("GITHUB_ACTOR").ok())
        .unwrap_or_else(|| "unknown".to_string());

    let claim = ClaimRange::parse(&args.claim, &owner)?;

    if let Some(path) = &args.active_claims {
        let active = read_active_claims(path, &args.claim)?;
        register_claim(&claim, &active)?;
    }

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ValidationConfig::default(),
    };
    let batch_bounds = batch_bounds_from_env()?;
    let batch = records::read_records(&args.records)?;

    let tokio_runtime = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
    let db = tokio_runtime.block_on(create_db_if_not_exists(&args.db_path));
    tokio_runtime.block_on(create_tables_if_not_exists(&db))?;

    let mut store = tokio_runtime.block_on(load_store(&db, RECORD_TABLE))?;
    let appended_from = store.len();

    let ctx = MergeContext {
        claim: &claim,
        batch_bounds,
        config: &config,
        oracle: None,
    };
    let report = merge(&batch, &mut store, &ctx)?;

    // Persist the new entries, then flip the tags of dethroned rows. The
    // newly inserted rows already carry their final flag.
    for entry in &store.entries()[appended_from..] {
        let row = RecordRow::from_record(&entry.record, entry.superseded);
        tokio_runtime.block_on(row.insert(&db, RECORD_TABLE))?;
    }

    for id in report.superseded.iter().copied().unique() {
        if let Some(winner) = store.accepted(PositionId(id)) {
            tokio_runtime.block_on(mark_superseded_except(
                &db,
                RECORD_TABLE,
                id as i64,
                &winner.contributor,
                winner.submitted_at,
            ))?;
        }
    }

    print!("{report}");
    let outcome = classify(&report);
    println!("outcome: {outcome}");
    println!("passed: {}", outcome.passed());

    if !outcome.passed() {
        std::process::exit(1);
    }

    Ok(())
}
