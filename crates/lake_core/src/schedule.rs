use std::collections::BTreeMap;

use anyhow::Result;
use tracing::info;

use crate::config::SimConfig;
use crate::report::{Reporter, Snapshot, Summary, ZoneTally};
use crate::step_month;
use crate::world::World;

/// Run `horizon` months starting after `world.month`.
///
/// The reporter sees a snapshot of the starting state, one after every month
/// divisible by the snapshot interval, every monthly outcome, and a final
/// summary carrying cumulative deaths and births per zone.
pub fn run(
    world: &mut World,
    config: &SimConfig,
    horizon: u32,
    reporter: &mut dyn Reporter,
) -> Result<Summary> {
    let start = world.month;
    let interval = config.snapshot_interval.max(1);
    info!(
        seed = world.seed,
        zones = world.zone_count(),
        population = world.total_population(),
        start,
        horizon,
        "simulation starting"
    );

    reporter.snapshot(&Snapshot::capture(start, world))?;

    let mut totals: BTreeMap<String, ZoneTally> = world
        .zones()
        .map(|zone| (zone.name().to_string(), ZoneTally::default()))
        .collect();

    for month in start + 1..=start + horizon {
        let outcome = step_month(world, config, month)?;
        for (zone, tally) in &outcome.zones {
            totals.entry(zone.clone()).or_default().absorb(tally);
        }
        reporter.month(&outcome)?;

        if month % interval == 0 {
            reporter.snapshot(&Snapshot::capture(month, world))?;
        }
    }

    let summary = Summary::build(world, &totals);
    info!(
        months = summary.months,
        population = summary.total_population(),
        "simulation finished"
    );
    reporter.summary(&summary)?;
    Ok(summary)
}
