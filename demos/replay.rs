//! Replays a JSON-lines dump of tracker output through a `LineCounter`.
//!
//! Each input line is one frame:
//! `{"ts":"2024-06-10T08:00:00","tracks":[{"id":1,"bbox":[l,t,r,b]}]}`

use anyhow::{Context, Result};
use clap::Parser;
use linecount::config::CounterConfig;
use linecount::store::JsonLinesStore;
use linecount::{Frame, LineCounter};
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "replay", about = "Count line crossings in a recorded track dump")]
struct Args {
    /// Tracker output, one JSON frame per line
    tracks: PathBuf,
    /// Where crossing and statistics rows are appended
    #[arg(long, default_value = "visits.jsonl")]
    out: PathBuf,
    #[arg(long, default_value = "counter.toml")]
    config: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = CounterConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let lines = config.lines.line_set();

    let store = JsonLinesStore::open(&args.out)
        .with_context(|| format!("Failed to open {}", args.out.display()))?;
    let mut counter = LineCounter::new(store, &config)?;

    let file = std::fs::File::open(&args.tracks)
        .with_context(|| format!("Failed to open {}", args.tracks.display()))?;

    let mut frames = 0u64;
    for (lineno, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let frame: Frame = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(line = lineno + 1, %err, "skipping malformed frame");
                continue;
            }
        };

        counter.process_frame(&frame, &lines)?;
        frames += 1;
    }

    let counts = counter.counts();
    let pending = counter.pending();
    let report = counter.finish()?;

    info!(
        frames,
        pending,
        in_count = counts.in_count,
        out_count = counts.out_count,
        occupancy = counts.occupancy(),
        write_failures = report.write_failures,
        late_writes = report.late_writes,
        "replay finished"
    );

    Ok(())
}
