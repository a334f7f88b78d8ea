use rand::Rng;
use tracing::warn;

use crate::config::{CrowdingResponse, ReproductionParams};
use crate::rng::Stream;
use crate::world::{Individual, SerialCounter, Sex, Stage, Zone};

/// Population above capacity relative to capacity, `max(0, (N - C) / C)`.
///
/// Zero capacity or an empty zone yields zero rather than dividing by zero.
pub fn overcrowding(total: usize, capacity: u32) -> f64 {
    if capacity == 0 || total == 0 {
        return 0.0;
    }
    let capacity = f64::from(capacity);
    ((total as f64 - capacity) / capacity).max(0.0)
}

/// Multiplier that crowding applies to the expected birth count.
pub fn crowding_factor(total: usize, capacity: u32, response: CrowdingResponse) -> f64 {
    let over = overcrowding(total, capacity);
    match response {
        CrowdingResponse::Amplify => over,
        CrowdingResponse::Throttle => (1.0 - over).clamp(0.0, 1.0),
    }
}

/// Expected births this month for a zone with the given composition.
pub fn expected_births(
    adults: usize,
    total: usize,
    water_quality: f64,
    params: &ReproductionParams,
) -> f64 {
    let suitability = water_quality;
    let crowding = crowding_factor(total, params.capacity, params.crowding);
    (params.base_rate * adults as f64 * suitability * crowding).max(0.0)
}

/// Append this month's newborns to the juvenile bucket and return how many
/// were born.
///
/// The integer count is `floor(expected + U)` for one uniform draw `U`, so
/// the long-run mean matches the expected value. Each newborn then draws
/// health, tolerance and sex, in that order. Births stop early if the serial
/// space runs out.
pub fn apply(
    zone: &mut Zone,
    rng: &mut Stream,
    params: &ReproductionParams,
    serials: &mut SerialCounter,
) -> u32 {
    let adults = zone.bucket(Stage::Adult).len();
    if adults == 0 {
        return 0;
    }
    let expected = expected_births(
        adults,
        zone.total(),
        zone.environment().water_quality,
        params,
    );
    let births = (expected + rng.unit()).floor() as u32;

    let juveniles = zone.bucket_mut(Stage::Juvenile);
    juveniles.reserve(births as usize);
    for born in 0..births {
        let Some(id) = serials.next_id() else {
            warn!(born, births, "newborn serials exhausted");
            return born;
        };
        let health = rng.uniform(params.newborn_health.min, params.newborn_health.max);
        let tolerance = rng.uniform(params.newborn_tolerance.min, params.newborn_tolerance.max);
        let sex = if rng.gen_bool(0.5) {
            Sex::Female
        } else {
            Sex::Male
        };
        juveniles.push(Individual::new(id, 0, health, tolerance, sex));
    }
    births
}
