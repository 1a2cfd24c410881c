//! Inertial Dead-Reckoning replay tool
//!
//! Feeds a recorded JSON-lines sensor log through a session and prints the
//! final snapshot. One record per line:
//!
//! ```text
//! {"kind":"orientation","timestamp_ms":0.0,"azimuth_deg":90.0,"pitch_deg":1.0,"roll_deg":0.5}
//! {"kind":"motion","timestamp_ms":16.7,"accel":{"x":0.2,"y":0.0}}
//! {"kind":"fix","latitude":48.85,"longitude":2.29,"accuracy_m":4.0,"timestamp_ms":1.7e12}
//! {"kind":"reset"}
//! ```

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use inertial_dr::{DrConfig, GeoFix, MotionSample, OrientationSample, SensorEvent, Session};

#[derive(Parser, Debug)]
#[command(name = "inertial-dr", version, about = "Replay a sensor log through the dead-reckoning engine")]
struct Args {
    /// JSON-lines sensor log
    #[arg(short, long)]
    input: PathBuf,

    /// YAML config file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the snapshot here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Indent the JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Record {
    Orientation(OrientationSample),
    Motion(MotionSample),
    Fix(GeoFix),
    Start,
    Stop,
    Reset,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("inertial_dr=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DrConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DrConfig::default(),
    };

    let file = File::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;

    let mut session = Session::new(config);
    session.start();

    let mut records = 0u64;
    let mut skipped = 0u64;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", args.input.display()))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match serde_json::from_str::<Record>(line) {
            Ok(record) => {
                apply(&mut session, record);
                records += 1;
            }
            Err(err) => {
                warn!(line = index + 1, error = %err, "skipping unreadable record");
                skipped += 1;
            }
        }
    }

    let snapshot = session.snapshot();
    info!(
        records,
        skipped,
        path_points = snapshot.path.len(),
        fixes = snapshot.ground_truth_trace.len(),
        "replay complete"
    );

    let json = if args.pretty {
        snapshot.to_json_pretty()?
    } else {
        snapshot.to_json()?
    };

    match &args.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", json),
    }

    Ok(())
}

fn apply(session: &mut Session, record: Record) {
    match record {
        Record::Orientation(sample) => {
            session.dispatch(&SensorEvent::Orientation(sample));
        }
        Record::Motion(sample) => {
            session.dispatch(&SensorEvent::Motion(sample));
        }
        Record::Fix(fix) => {
            session.dispatch(&SensorEvent::Fix(fix));
        }
        Record::Start => session.start(),
        Record::Stop => session.stop(),
        Record::Reset => session.reset(),
    }
}
