use std::path::PathBuf;
use anyhow::Result;
use clap::Parser;
use dfrc_pipeline::positions::{setup_pair, PositionId, POSITION_COUNT};

/// Writes the id-to-setups table for a range of position identifiers, for
/// contributors who want to inspect what a claim would cover.

#[derive(Parser, Debug)]
#[command(author, version)]
#[command(about = "Exports the position id table to CSV.")]
struct Args {
    /// First position id to export.
    #[arg(short, long, default_value_t = 0)]
    start: u64,

    /// One past the last position id to export.
    #[arg(short, long, default_value_t = POSITION_COUNT)]
    end: u64,

    /// The CSV file to write.
    #[arg(short, long, default_value = "positions.csv")]
    out: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut writer = csv::Writer::from_path(&args.out)?;
    writer.write_record(["id", "white", "black"])?;

    for id in args.start..args.end.min(POSITION_COUNT) {
        let (white, black) = setup_pair(PositionId(id))?;
        writer.write_record([id.to_string(), white.to_string(), black.to_string()])?;
    }

    writer.flush()?;

    Ok(())
}
