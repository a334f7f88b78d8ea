use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use crate::kernels::environment::MONTHS_PER_YEAR;
use crate::kernels::transition::Promotions;
use crate::world::World;

/// Bucket sizes and water quality of one zone at a point in time.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ZoneSnapshot {
    pub zone: String,
    pub water_quality: f64,
    pub juveniles: usize,
    pub adults: usize,
    pub seniors: usize,
    pub total: usize,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Snapshot {
    pub month: u32,
    pub year: u32,
    pub zones: Vec<ZoneSnapshot>,
}

impl Snapshot {
    /// Read the current state of every zone, in name order.
    pub fn capture(month: u32, world: &World) -> Self {
        let zones = world
            .zones()
            .map(|zone| {
                let [juveniles, adults, seniors] = zone.counts();
                ZoneSnapshot {
                    zone: zone.name().to_string(),
                    water_quality: zone.environment().water_quality,
                    juveniles,
                    adults,
                    seniors,
                    total: juveniles + adults + seniors,
                }
            })
            .collect();
        Self {
            month,
            year: month / MONTHS_PER_YEAR,
            zones,
        }
    }

    pub fn total_population(&self) -> usize {
        self.zones.iter().map(|zone| zone.total).sum()
    }
}

/// Deaths and births recorded for one zone.
#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq)]
pub struct ZoneTally {
    /// Deaths in `[juvenile, adult, senior]` order.
    pub deaths: [u32; 3],
    pub births: u32,
    pub promotions: Promotions,
}

impl ZoneTally {
    pub fn total_deaths(&self) -> u32 {
        self.deaths.iter().sum()
    }

    pub fn absorb(&mut self, other: &ZoneTally) {
        for (total, value) in self.deaths.iter_mut().zip(other.deaths) {
            *total += value;
        }
        self.births += other.births;
        self.promotions.to_adult += other.promotions.to_adult;
        self.promotions.to_senior += other.promotions.to_senior;
    }
}

/// Everything one monthly step changed.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct MonthOutcome {
    pub month: u32,
    pub zones: BTreeMap<String, ZoneTally>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub chronicle: Vec<String>,
}

impl MonthOutcome {
    pub fn new(month: u32) -> Self {
        Self {
            month,
            ..Self::default()
        }
    }

    pub fn deaths(&self) -> u32 {
        self.zones.values().map(ZoneTally::total_deaths).sum()
    }

    pub fn births(&self) -> u32 {
        self.zones.values().map(|tally| tally.births).sum()
    }
}

/// Final per-zone state with cumulative counters over the run.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ZoneSummary {
    #[serde(flatten)]
    pub state: ZoneSnapshot,
    pub deaths: u32,
    pub births: u32,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Summary {
    pub months: u32,
    pub zones: Vec<ZoneSummary>,
}

impl Summary {
    pub fn build(world: &World, totals: &BTreeMap<String, ZoneTally>) -> Self {
        let snapshot = Snapshot::capture(world.month, world);
        let zones = snapshot
            .zones
            .into_iter()
            .map(|state| {
                let tally = totals.get(&state.zone).copied().unwrap_or_default();
                ZoneSummary {
                    state,
                    deaths: tally.total_deaths(),
                    births: tally.births,
                }
            })
            .collect();
        Self {
            months: world.month,
            zones,
        }
    }

    pub fn total_population(&self) -> usize {
        self.zones.iter().map(|zone| zone.state.total).sum()
    }
}

/// Observer of a simulation run. Reporters read state; they never mutate it.
pub trait Reporter {
    /// Periodic view of every zone, including the initial state at month 0.
    fn snapshot(&mut self, snapshot: &Snapshot) -> Result<()>;

    /// Per-month tallies, called after every step.
    fn month(&mut self, _outcome: &MonthOutcome) -> Result<()> {
        Ok(())
    }

    /// Called once after the horizon completes.
    fn summary(&mut self, summary: &Summary) -> Result<()>;
}

/// Reporter that keeps everything it is shown in memory.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    pub snapshots: Vec<Snapshot>,
    pub months: Vec<MonthOutcome>,
    pub summary: Option<Summary>,
}

impl Reporter for Recorder {
    fn snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }

    fn month(&mut self, outcome: &MonthOutcome) -> Result<()> {
        self.months.push(outcome.clone());
        Ok(())
    }

    fn summary(&mut self, summary: &Summary) -> Result<()> {
        self.summary = Some(summary.clone());
        Ok(())
    }
}
