pub mod config;
pub mod io;
pub mod kernels;
pub mod report;
pub mod rng;
pub mod schedule;
pub mod world;

use anyhow::{ensure, Result};
use config::SimConfig;
use kernels::{environment, mortality, reproduction, transition};
use report::{MonthOutcome, ZoneTally};
use rng::Stream;
use tracing::{debug, info};
use world::World;

/// Apply one simulated month to every zone.
///
/// Water quality is updated for all zones first. Each zone then runs
/// mortality, reproduction and stage transition in that order, drawing from
/// its own stream for `(world.seed, month, zone name)`. Zones never read one
/// another's state, so visiting order does not affect the result.
pub fn step_month(world: &mut World, config: &SimConfig, month: u32) -> Result<MonthOutcome> {
    ensure!(
        month == world.month + 1,
        "step_month called with out-of-order month: current={} requested={}",
        world.month,
        month
    );

    for zone in world.zones.values_mut() {
        environment::update(&mut zone.environment, month, &config.environment);
    }

    let seed = world.seed;
    let mut outcome = MonthOutcome::new(month);
    for zone in world.zones.values_mut() {
        let population_before = zone.total();
        let mut rng = Stream::for_zone(seed, month, zone.name());

        let deaths = mortality::apply(zone, &mut rng, &config.mortality);
        let births =
            reproduction::apply(zone, &mut rng, &config.reproduction, &mut world.serials);
        let promotions = transition::apply(zone);

        debug!(
            month,
            zone = zone.name(),
            water_quality = zone.environment.water_quality,
            ?deaths,
            births,
            population = zone.total(),
            "zone updated"
        );
        if population_before > 0 && zone.total() == 0 {
            info!(month, zone = zone.name(), "zone population collapsed");
            outcome.chronicle.push(format!(
                "Zone {} lost its last fish in month {}.",
                zone.name(),
                month
            ));
        }

        outcome.zones.insert(
            zone.name().to_string(),
            ZoneTally {
                deaths,
                births,
                promotions,
            },
        );
    }

    world.month = month;
    Ok(outcome)
}
