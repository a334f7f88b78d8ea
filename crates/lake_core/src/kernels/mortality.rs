use crate::config::MortalityParams;
use crate::rng::Stream;
use crate::world::{Stage, Zone};

/// Monthly death probability for one fish.
///
/// The raw value `natural + (1 - water_quality) * pollution_multiplier *
/// (1 - tolerance)`, scaled for seniors, can exceed 1 in a fouled zone with
/// intolerant seniors; it is clamped to `[0, 1]` before sampling.
pub fn death_probability(
    water_quality: f64,
    tolerance: f64,
    stage: Stage,
    params: &MortalityParams,
) -> f64 {
    let pollution_factor = 1.0 - water_quality;
    let vulnerability = 1.0 - tolerance;
    let mut probability =
        params.natural + pollution_factor * params.pollution_multiplier * vulnerability;
    if stage == Stage::Senior {
        probability *= params.senior_multiplier;
    }
    probability.clamp(0.0, 1.0)
}

/// Remove the fish that die this month and return deaths per bucket in
/// `[juvenile, adult, senior]` order.
///
/// Buckets are visited juvenile, adult, senior, each in stored order, with
/// exactly one draw per fish. Survivors keep their relative order.
pub fn apply(zone: &mut Zone, rng: &mut Stream, params: &MortalityParams) -> [u32; 3] {
    let water_quality = zone.environment().water_quality;
    let mut deaths = [0u32; 3];
    for stage in Stage::ALL {
        let dead = &mut deaths[stage.index()];
        zone.bucket_mut(stage).retain(|fish| {
            let probability = death_probability(water_quality, fish.tolerance, stage, params);
            let survives = rng.unit() >= probability;
            if !survives {
                *dead += 1;
            }
            survives
        });
    }
    deaths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Environment, Individual, Sex, StageThresholds, World};
    use proptest::prelude::*;

    fn world_with(water_quality: f64, ages: &[u32], tolerance: f64) -> World {
        let mut world = World::new(3, StageThresholds::default(), 10_000);
        let env = Environment {
            water_quality,
            pollution_rate: 0.0,
        };
        world.ensure_zone("Inlet", env);
        for (i, &age) in ages.iter().enumerate() {
            world.insert(
                "Inlet",
                env,
                Individual::new(format!("F{i}"), age, 0.8, tolerance, Sex::Male),
            );
        }
        world
    }

    #[test]
    fn clean_water_uses_natural_rate() {
        let params = MortalityParams::default();
        let p = death_probability(1.0, 1.0, Stage::Adult, &params);
        assert!((p - 0.005).abs() < 1e-12);
        let senior = death_probability(1.0, 1.0, Stage::Senior, &params);
        assert!((senior - 0.0075).abs() < 1e-12);
    }

    #[test]
    fn polluted_water_scales_with_vulnerability() {
        let params = MortalityParams::default();
        let p = death_probability(0.5, 0.25, Stage::Juvenile, &params);
        // 0.005 + 0.5 * 0.6 * 0.75
        assert!((p - 0.23).abs() < 1e-12);
    }

    #[test]
    fn extreme_senior_risk_saturates_at_one() {
        let params = MortalityParams {
            pollution_multiplier: 2.0,
            ..MortalityParams::default()
        };
        assert_eq!(death_probability(0.0, 0.0, Stage::Senior, &params), 1.0);
    }

    #[test]
    fn certain_death_empties_every_bucket() {
        let params = MortalityParams {
            natural: 1.0,
            ..MortalityParams::default()
        };
        let mut world = world_with(1.0, &[1, 2, 10, 20, 70], 1.0);
        let zone = world.zone_mut("Inlet").unwrap();
        let mut rng = Stream::from(1, "test", 1);
        let deaths = apply(zone, &mut rng, &params);
        assert_eq!(deaths, [2, 2, 1]);
        assert_eq!(zone.total(), 0);
    }

    #[test]
    fn zero_risk_keeps_everyone_in_order() {
        let params = MortalityParams {
            natural: 0.0,
            ..MortalityParams::default()
        };
        let mut world = world_with(1.0, &[10, 11, 12, 13], 1.0);
        let zone = world.zone_mut("Inlet").unwrap();
        let mut rng = Stream::from(1, "test", 1);
        assert_eq!(apply(zone, &mut rng, &params), [0, 0, 0]);
        let ids: Vec<_> = zone.bucket(Stage::Adult).iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["F0", "F1", "F2", "F3"]);
    }

    proptest! {
        #[test]
        fn mortality_only_drains(
            quality in 0.0f64..=1.0,
            tolerance in 0.0f64..=1.0,
            ages in proptest::collection::vec(0u32..90, 0..60),
            seed in any::<u64>(),
        ) {
            let mut world = world_with(quality, &ages, tolerance);
            let zone = world.zone_mut("Inlet").unwrap();
            let before = zone.counts();
            let mut rng = Stream::from(seed, "test", 0);
            let deaths = apply(zone, &mut rng, &MortalityParams::default());
            let after = zone.counts();
            for i in 0..3 {
                prop_assert!(after[i] <= before[i]);
                prop_assert_eq!(before[i] - after[i], deaths[i] as usize);
            }
        }
    }
}
