//! Delimited-text roster loading.
//!
//! One record per line: `zone,identity,age_months,health,tolerance[,sex]`.
//! Lines whose first field is `zone` (any case) are headers. A malformed line
//! is rejected on its own; a roster that cannot be read or holds too few
//! valid records is replaced by the synthetic population.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::config::SimConfig;
use crate::io::synthetic;
use crate::world::{Individual, Sex, World};

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("invalid {field} `{value}`: expected a non-negative integer")]
    BadInteger { field: &'static str, value: String },
    #[error("invalid {field} `{value}`: expected a finite number")]
    BadReal { field: &'static str, value: String },
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("failed to read roster {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("roster holds {found} valid records, {required} required")]
    Insufficient { found: usize, required: usize },
}

/// One parsed roster line.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub zone: String,
    pub individual: Individual,
}

/// A line that failed to parse, by 1-based line number.
#[derive(Debug, PartialEq)]
pub struct Rejection {
    pub line: usize,
    pub error: RecordError,
}

#[derive(Debug, Default)]
pub struct Roster {
    pub records: Vec<Record>,
    pub rejected: Vec<Rejection>,
}

/// Parse one roster line. Blank lines and headers yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Record>, RecordError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let mut fields = line.split(',').map(str::trim);
    let zone = required(fields.next(), "zone")?;
    if zone.eq_ignore_ascii_case("zone") {
        return Ok(None);
    }
    let id = required(fields.next(), "identity")?;
    let age_months = parse_age(required(fields.next(), "age_months")?)?;
    let health = parse_unit(required(fields.next(), "health")?, "health")?;
    let tolerance = parse_unit(required(fields.next(), "tolerance")?, "tolerance")?;
    let sex = Sex::from_field(fields.next().unwrap_or_default());

    Ok(Some(Record {
        zone: zone.to_string(),
        individual: Individual::new(id, age_months, health, tolerance, sex),
    }))
}

fn required<'a>(field: Option<&'a str>, name: &'static str) -> Result<&'a str, RecordError> {
    match field {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(RecordError::MissingField(name)),
    }
}

fn parse_age(value: &str) -> Result<u32, RecordError> {
    value.parse::<u32>().map_err(|_| RecordError::BadInteger {
        field: "age_months",
        value: value.to_string(),
    })
}

/// Parse a real and clamp it into `[0, 1]`.
fn parse_unit(value: &str, field: &'static str) -> Result<f64, RecordError> {
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed.clamp(0.0, 1.0)),
        _ => Err(RecordError::BadReal {
            field,
            value: value.to_string(),
        }),
    }
}

/// Parse every line of a roster, collecting rejected lines instead of failing.
///
/// Only a failing reader is an error; undecodable bytes reject their line.
pub fn read_roster<R: BufRead>(reader: R) -> io::Result<Roster> {
    let mut roster = Roster::default();
    for (index, bytes) in reader.split(b'\n').enumerate() {
        let parsed = String::from_utf8(bytes?)
            .map_err(|_| RecordError::InvalidUtf8)
            .and_then(|line| parse_line(&line));
        match parsed {
            Ok(Some(record)) => roster.records.push(record),
            Ok(None) => {}
            Err(error) => {
                warn!(line = index + 1, %error, "skipping malformed roster line");
                roster.rejected.push(Rejection {
                    line: index + 1,
                    error,
                });
            }
        }
    }
    Ok(roster)
}

/// Read a roster from disk, requiring at least `required` valid records.
pub fn load_roster(path: &Path, required: usize) -> Result<Roster, RosterError> {
    let file = File::open(path).map_err(|source| RosterError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let roster = read_roster(BufReader::new(file)).map_err(|source| RosterError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if roster.records.len() < required {
        return Err(RosterError::Insufficient {
            found: roster.records.len(),
            required,
        });
    }
    Ok(roster)
}

/// Build a world from parsed records. Zones get the configured default
/// environment, then any per-zone overrides.
pub fn build_world(roster: Roster, config: &SimConfig, seed: u64) -> World {
    let mut world = World::new(seed, config.stages, config.reproduction.first_birth_serial);
    for record in roster.records {
        world.insert(&record.zone, config.default_environment, record.individual);
    }
    apply_zone_overrides(&mut world, config);
    world
}

pub fn apply_zone_overrides(world: &mut World, config: &SimConfig) {
    for (zone, environment) in &config.zone_environment {
        if !world.set_environment(zone, *environment) {
            warn!(zone = zone.as_str(), "environment override names an unknown zone");
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorldSource {
    Roster,
    Synthetic,
}

/// How the initial world was obtained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadReport {
    pub source: WorldSource,
    pub records: usize,
    pub rejected: usize,
    /// Why the roster was not used, when it was not.
    pub fallback_reason: Option<String>,
}

impl LoadReport {
    /// `true` when the roster itself populated the world.
    pub fn succeeded(&self) -> bool {
        self.source == WorldSource::Roster
    }
}

/// Load the roster at `path`, substituting the synthetic population when it
/// is unreadable or too small. Never fails.
pub fn load_world(path: &Path, config: &SimConfig, seed: u64) -> (World, LoadReport) {
    match load_roster(path, config.min_roster_records) {
        Ok(roster) => {
            let records = roster.records.len();
            let rejected = roster.rejected.len();
            let world = build_world(roster, config, seed);
            info!(
                path = %path.display(),
                records,
                rejected,
                zones = world.zone_count(),
                "roster loaded"
            );
            let report = LoadReport {
                source: WorldSource::Roster,
                records,
                rejected,
                fallback_reason: None,
            };
            (world, report)
        }
        Err(error) => {
            warn!(%error, "using synthetic population");
            let world = synthetic::generate(config, seed);
            let report = LoadReport {
                source: WorldSource::Synthetic,
                records: world.total_population(),
                rejected: 0,
                fallback_reason: Some(error.to_string()),
            };
            (world, report)
        }
    }
}
