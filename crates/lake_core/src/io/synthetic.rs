//! Randomised stand-in population used when no usable roster exists.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{SimConfig, TraitRange};
use crate::io::roster::apply_zone_overrides;
use crate::world::{format_id, Environment, Individual, Sex, World};

/// Build the fallback world: the configured zones with pollution rising by
/// zone index, populated with fish scattered uniformly across zones.
pub fn generate(config: &SimConfig, seed: u64) -> World {
    let params = &config.fallback;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut world = World::new(seed, config.stages, config.reproduction.first_birth_serial);

    let zone_environments: Vec<Environment> = (0..params.zones.len())
        .map(|index| Environment {
            water_quality: config.default_environment.water_quality,
            pollution_rate: params.pollution_base + params.pollution_step * index as f64,
        })
        .collect();
    for (name, environment) in params.zones.iter().zip(&zone_environments) {
        world.ensure_zone(name, *environment);
    }
    if params.zones.is_empty() {
        return world;
    }

    for serial in 1..=u64::from(params.population) {
        let zone_index = rng.gen_range(0..params.zones.len());
        let age_months = rng.gen_range(0..=params.max_age_months);
        let health = sample(&mut rng, params.health);
        let tolerance = sample(&mut rng, params.tolerance);
        let sex = if rng.gen_bool(0.5) {
            Sex::Female
        } else {
            Sex::Male
        };
        world.insert(
            &params.zones[zone_index],
            zone_environments[zone_index],
            Individual::new(format_id(serial), age_months, health, tolerance, sex),
        );
    }

    apply_zone_overrides(&mut world, config);
    world
}

fn sample(rng: &mut ChaCha8Rng, range: TraitRange) -> f64 {
    range.min + (range.max - range.min) * rng.gen::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fallback_has_five_zones_and_120_fish() {
        let world = generate(&SimConfig::default(), 99);
        assert_eq!(world.zone_count(), 5);
        assert_eq!(world.total_population(), 120);
        world.check_partition().expect("partition holds");
    }

    #[test]
    fn pollution_rises_with_zone_index() {
        let world = generate(&SimConfig::default(), 1);
        let pollution = |name: &str| world.zone(name).unwrap().environment().pollution_rate;
        assert!((pollution("Inlet") - 0.005).abs() < 1e-12);
        assert!((pollution("ReefNorth") - 0.015).abs() < 1e-12);
        assert!((pollution("Outlet") - 0.045).abs() < 1e-12);
    }

    #[test]
    fn traits_respect_configured_ranges() {
        let config = SimConfig::default();
        let world = generate(&config, 3);
        for zone in world.zones() {
            for (_, fish) in zone.individuals() {
                assert!(fish.age_months <= config.fallback.max_age_months);
                assert!((0.7..=1.0).contains(&fish.health));
                assert!((0.2..=1.0).contains(&fish.tolerance));
                assert!(fish.id.starts_with("CF0"));
            }
        }
        assert_eq!(world.next_serial(), 10_000);
    }

    #[test]
    fn same_seed_same_population() {
        let config = SimConfig::default();
        let a = generate(&config, 8);
        let b = generate(&config, 8);
        let counts = |w: &World| w.zones().map(|z| z.counts()).collect::<Vec<_>>();
        assert_eq!(counts(&a), counts(&b));
    }
}
