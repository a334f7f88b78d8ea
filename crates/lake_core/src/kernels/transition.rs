use std::mem;

use serde::Serialize;

use crate::world::{Individual, Stage, Zone};

/// Counts of individuals promoted during one transition pass.
#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq)]
pub struct Promotions {
    pub to_adult: u32,
    pub to_senior: u32,
}

/// Age every fish by one month and move those that crossed a threshold.
///
/// Each bucket is aged from its contents before this call, so a juvenile
/// promoted to adult this month is neither aged twice nor checked against
/// the senior threshold until next month. Movers are appended to the end of
/// their new bucket in the order they were visited. No randomness is drawn.
pub fn apply(zone: &mut Zone) -> Promotions {
    let thresholds = zone.thresholds();

    let juveniles = mem::take(zone.bucket_mut(Stage::Juvenile));
    let (stay_juvenile, new_adults) = age_and_split(juveniles, thresholds.juvenile_months);

    let adults = mem::take(zone.bucket_mut(Stage::Adult));
    let (mut stay_adult, new_seniors) = age_and_split(adults, thresholds.senior_months);

    let seniors = zone.bucket_mut(Stage::Senior);
    for fish in seniors.iter_mut() {
        fish.age_months += 1;
    }

    let promotions = Promotions {
        to_adult: new_adults.len() as u32,
        to_senior: new_seniors.len() as u32,
    };

    seniors.extend(new_seniors);
    stay_adult.extend(new_adults);
    *zone.bucket_mut(Stage::Adult) = stay_adult;
    *zone.bucket_mut(Stage::Juvenile) = stay_juvenile;
    promotions
}

/// Increment every age, then split into those still below `threshold` and
/// those that reached it, preserving order within each half.
fn age_and_split(cohort: Vec<Individual>, threshold: u32) -> (Vec<Individual>, Vec<Individual>) {
    cohort
        .into_iter()
        .map(|mut fish| {
            fish.age_months += 1;
            fish
        })
        .partition(|fish| fish.age_months < threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Environment, Sex, StageThresholds, World};
    use proptest::prelude::*;

    fn world_with(ages: &[(&str, u32)]) -> World {
        let mut world = World::new(0, StageThresholds::default(), 10_000);
        world.ensure_zone("Pool", Environment::default());
        for &(id, age) in ages {
            world.insert(
                "Pool",
                Environment::default(),
                Individual::new(id, age, 0.8, 0.5, Sex::Female),
            );
        }
        world
    }

    fn ages(zone: &Zone, stage: Stage) -> Vec<(String, u32)> {
        zone.bucket(stage)
            .iter()
            .map(|fish| (fish.id.clone(), fish.age_months))
            .collect()
    }

    #[test]
    fn juvenile_at_five_becomes_adult_at_six() {
        let mut world = world_with(&[("j", 5)]);
        let zone = world.zone_mut("Pool").unwrap();
        let promotions = apply(zone);
        assert_eq!(promotions.to_adult, 1);
        assert_eq!(ages(zone, Stage::Adult), [("j".to_string(), 6)]);
        assert!(zone.bucket(Stage::Juvenile).is_empty());
    }

    #[test]
    fn adult_at_fifty_nine_becomes_senior() {
        let mut world = world_with(&[("a", 59)]);
        let zone = world.zone_mut("Pool").unwrap();
        let promotions = apply(zone);
        assert_eq!(promotions.to_senior, 1);
        assert_eq!(ages(zone, Stage::Senior), [("a".to_string(), 60)]);
    }

    #[test]
    fn promoted_juveniles_are_not_aged_twice() {
        let mut world = world_with(&[("j", 5), ("a", 10), ("s", 80)]);
        let zone = world.zone_mut("Pool").unwrap();
        apply(zone);
        assert_eq!(
            ages(zone, Stage::Adult),
            [("a".to_string(), 11), ("j".to_string(), 6)]
        );
        assert_eq!(ages(zone, Stage::Senior), [("s".to_string(), 81)]);
    }

    #[test]
    fn newly_promoted_seniors_age_once() {
        let mut world = world_with(&[("old", 70), ("a", 59)]);
        let zone = world.zone_mut("Pool").unwrap();
        apply(zone);
        assert_eq!(
            ages(zone, Stage::Senior),
            [("old".to_string(), 71), ("a".to_string(), 60)]
        );
    }

    #[test]
    fn partition_holds_after_many_months() {
        let mut world = world_with(&[("a", 0), ("b", 3), ("c", 5), ("d", 40), ("e", 58)]);
        for _ in 0..70 {
            apply(world.zone_mut("Pool").unwrap());
            world.check_partition().expect("partition holds");
        }
        let zone = world.zone("Pool").unwrap();
        assert_eq!(zone.counts(), [0, 0, 5]);
    }

    proptest! {
        #[test]
        fn buckets_match_ages_after_every_month(
            ages in proptest::collection::vec(0u32..120, 0..60),
            months in 1usize..80,
        ) {
            let ids: Vec<String> = (0..ages.len()).map(|i| format!("CF{i:04}")).collect();
            let fish: Vec<(&str, u32)> = ids
                .iter()
                .map(String::as_str)
                .zip(ages.iter().copied())
                .collect();
            let mut world = world_with(&fish);
            for _ in 0..months {
                let before = world.total_population();
                apply(world.zone_mut("Pool").unwrap());
                prop_assert!(world.check_partition().is_ok());
                prop_assert_eq!(world.total_population(), before);
            }
        }
    }
}
