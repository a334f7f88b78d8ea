use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use lake_core::config::SimConfig;
use lake_core::io::frame::NdjsonReporter;
use lake_core::io::roster::load_world;
use lake_core::report::{MonthOutcome, Reporter, Snapshot, Summary};
use lake_core::schedule::run;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "lakestep",
    about = "Batch runner for the clownfish lake population simulation"
)]
struct Args {
    /// Roster of initial fish: `zone,identity,age_months,health,tolerance[,sex]`.
    #[arg(value_name = "ROSTER", default_value = "clownfish_initial.csv")]
    roster: PathBuf,

    /// Optional JSON configuration document.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Run seed; overrides the config. A clock-derived seed is used when absent.
    #[arg(long, value_name = "NUMBER")]
    seed: Option<u64>,

    /// Number of months to simulate.
    #[arg(long)]
    months: Option<u32>,

    /// Months between snapshots.
    #[arg(long = "snapshot-interval", value_parser = clap::value_parser!(u32).range(1..))]
    snapshot_interval: Option<u32>,

    /// Optional path to write snapshots and the summary as NDJSON.
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// Include one NDJSON line per simulated month in `--out`.
    #[arg(long = "emit-months", requires = "out")]
    emit_months: bool,
}

/// Prints snapshot tables and the final summary to stdout, optionally
/// mirroring everything into an NDJSON file.
struct ConsoleReporter<W: Write> {
    out: W,
    frames: Option<NdjsonReporter<BufWriter<File>>>,
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        write_snapshot(&mut self.out, snapshot)?;
        if let Some(frames) = self.frames.as_mut() {
            frames.snapshot(snapshot)?;
        }
        Ok(())
    }

    fn month(&mut self, outcome: &MonthOutcome) -> Result<()> {
        for note in &outcome.chronicle {
            writeln!(self.out, "{note}")?;
        }
        if let Some(frames) = self.frames.as_mut() {
            frames.month(outcome)?;
        }
        Ok(())
    }

    fn summary(&mut self, summary: &Summary) -> Result<()> {
        write_summary(&mut self.out, summary)?;
        if let Some(frames) = self.frames.as_mut() {
            frames.summary(summary)?;
        }
        Ok(())
    }
}

fn write_snapshot<W: Write>(out: &mut W, snapshot: &Snapshot) -> io::Result<()> {
    writeln!(out, "{}", "/".repeat(60))?;
    writeln!(
        out,
        "Snapshot - Month: {} Year: {}",
        snapshot.month, snapshot.year
    )?;
    writeln!(
        out,
        "{:<14}{:<16}{:<10}{:<10}{:<10}{:<10}",
        "Zone", "Water Quality", "Juveniles", "Adults", "Seniors", "Total"
    )?;
    for zone in &snapshot.zones {
        writeln!(
            out,
            "{:<14}{:<16.2}{:<10}{:<10}{:<10}{:<10}",
            zone.zone, zone.water_quality, zone.juveniles, zone.adults, zone.seniors, zone.total
        )?;
    }
    writeln!(out, "{}", "-".repeat(60))
}

fn write_summary<W: Write>(out: &mut W, summary: &Summary) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "FINAL SUMMARY after {} months", summary.months)?;
    for zone in &summary.zones {
        writeln!(
            out,
            "{}: J={} A={} S={} (deaths={} births={})",
            zone.state.zone,
            zone.state.juveniles,
            zone.state.adults,
            zone.state.seniors,
            zone.deaths,
            zone.births
        )?;
    }
    writeln!(out, "Total population: {}", summary.total_population())
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimConfig::load_from_path(path)
            .with_context(|| format!("failed to read config {:?}", path))?,
        None => SimConfig::default(),
    };
    if let Some(months) = args.months {
        config.months = months;
    }
    if let Some(interval) = args.snapshot_interval {
        config.snapshot_interval = interval;
    }
    let seed = args.seed.or(config.seed).unwrap_or_else(clock_seed);
    info!(seed, "using run seed");

    let (mut world, load) = load_world(&args.roster, &config, seed);
    if !load.succeeded() {
        println!(
            "Roster {:?} not used ({}); running synthetic population.",
            args.roster,
            load.fallback_reason.as_deref().unwrap_or("unknown reason")
        );
    }

    let frames = match &args.out {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("failed to create {:?}", path))?;
            Some(NdjsonReporter::new(BufWriter::new(file), args.emit_months))
        }
        None => None,
    };
    let stdout = io::stdout();
    let mut reporter = ConsoleReporter {
        out: stdout.lock(),
        frames,
    };

    println!("LakePulse - simulating {} months", config.months);
    run(&mut world, &config, config.months, &mut reporter)?;
    reporter.out.flush()?;
    Ok(())
}
