//! needlestore compaction trigger
//!
//! Loads a volume's needle index log and writes the compacted `.cpx`
//! replacement next to it. The data-file half of the pair is produced by
//! the volume server; this tool covers the index half and reports the
//! garbage ratio that motivated the run.

use std::path::PathBuf;

use clap::Parser;
use needlestore::NeedleIndex;
use tracing_subscriber::{fmt, EnvFilter};

/// Compact a volume's needle index
#[derive(Parser, Debug)]
#[command(name = "needlestore-compact")]
#[command(about = "Rewrite a volume's index log without tombstoned entries")]
#[command(version)]
struct Args {
    /// Data directory holding the volume files
    #[arg(short, long, default_value = "/tmp")]
    dir: PathBuf,

    /// Volume id; <dir>/<id>.idx must already exist
    #[arg(short, long)]
    volume_id: u32,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,needlestore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();
    let idx_path = args.dir.join(format!("{}.idx", args.volume_id));
    let cpx_path = args.dir.join(format!("{}.cpx", args.volume_id));

    let index = match NeedleIndex::load(&idx_path) {
        Ok(index) => index,
        Err(e) => {
            tracing::error!("failed to load index {}: {}", idx_path.display(), e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        records = index.file_count(),
        live = index.live_count(),
        garbage_ratio = index.garbage_ratio(),
        "index loaded"
    );

    if let Err(e) = index.write_compacted(&cpx_path) {
        tracing::error!("compaction failed: {}", e);
        std::process::exit(1);
    }

    tracing::info!("compacted index written to {}", cpx_path.display());
}
