use std::collections::BTreeMap;

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Sex {
    #[default]
    Male,
    Female,
}

impl Sex {
    /// Interpret a roster sex field: `F`/`f` is female, anything else male.
    pub fn from_field(field: &str) -> Self {
        match field.trim().chars().next() {
            Some('F') | Some('f') => Sex::Female,
            _ => Sex::Male,
        }
    }

    pub fn code(self) -> char {
        match self {
            Sex::Male => 'M',
            Sex::Female => 'F',
        }
    }
}

/// A single fish.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Individual {
    pub id: String,
    pub age_months: u32,
    /// Carried for reporting; no transition reads it.
    pub health: f64,
    /// Pollution resistance in `[0, 1]`.
    pub tolerance: f64,
    pub sex: Sex,
}

impl Individual {
    pub fn new(id: impl Into<String>, age_months: u32, health: f64, tolerance: f64, sex: Sex) -> Self {
        Self {
            id: id.into(),
            age_months,
            health,
            tolerance,
            sex,
        }
    }
}

/// Life-stage bucket of an individual.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Juvenile,
    Adult,
    Senior,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Juvenile, Stage::Adult, Stage::Senior];

    pub fn index(self) -> usize {
        match self {
            Stage::Juvenile => 0,
            Stage::Adult => 1,
            Stage::Senior => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Juvenile => "juvenile",
            Stage::Adult => "adult",
            Stage::Senior => "senior",
        }
    }
}

/// Age boundaries between life stages, in months.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StageThresholds {
    /// First age counted as adult.
    pub juvenile_months: u32,
    /// First age counted as senior.
    pub senior_months: u32,
}

impl Default for StageThresholds {
    fn default() -> Self {
        Self {
            juvenile_months: 6,
            senior_months: 60,
        }
    }
}

impl StageThresholds {
    pub fn classify(&self, age_months: u32) -> Stage {
        if age_months < self.juvenile_months {
            Stage::Juvenile
        } else if age_months < self.senior_months {
            Stage::Adult
        } else {
            Stage::Senior
        }
    }
}

/// Per-zone environmental state.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Environment {
    /// 0.0 (poor) to 1.0 (pristine).
    pub water_quality: f64,
    /// Monthly pollution driver, non-negative.
    pub pollution_rate: f64,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            water_quality: 1.0,
            pollution_rate: 0.01,
        }
    }
}

impl Environment {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.water_quality),
            "water_quality {} outside [0, 1]",
            self.water_quality
        );
        ensure!(
            self.pollution_rate.is_finite() && self.pollution_rate >= 0.0,
            "pollution_rate {} must be non-negative",
            self.pollution_rate
        );
        Ok(())
    }
}

/// A named habitat: three stage buckets plus the environment they live in.
#[derive(Clone, Debug, Serialize)]
pub struct Zone {
    name: String,
    pub(crate) environment: Environment,
    pub(crate) thresholds: StageThresholds,
    pub(crate) buckets: [Vec<Individual>; 3],
}

impl Zone {
    fn new(name: &str, environment: Environment, thresholds: StageThresholds) -> Self {
        Self {
            name: name.to_string(),
            environment,
            thresholds,
            buckets: Default::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn thresholds(&self) -> StageThresholds {
        self.thresholds
    }

    /// Place an individual into the bucket its age selects.
    pub fn admit(&mut self, individual: Individual) -> Stage {
        let stage = self.thresholds.classify(individual.age_months);
        self.buckets[stage.index()].push(individual);
        stage
    }

    pub fn bucket(&self, stage: Stage) -> &[Individual] {
        &self.buckets[stage.index()]
    }

    pub(crate) fn bucket_mut(&mut self, stage: Stage) -> &mut Vec<Individual> {
        &mut self.buckets[stage.index()]
    }

    /// Bucket sizes in `[juvenile, adult, senior]` order.
    pub fn counts(&self) -> [usize; 3] {
        [
            self.buckets[0].len(),
            self.buckets[1].len(),
            self.buckets[2].len(),
        ]
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn individuals(&self) -> impl Iterator<Item = (Stage, &Individual)> {
        Stage::ALL
            .into_iter()
            .flat_map(move |stage| self.bucket(stage).iter().map(move |fish| (stage, fish)))
    }
}

/// Hands out `CF%04d` identities for newborns.
#[derive(Clone, Debug, Serialize)]
pub struct SerialCounter {
    next: u64,
}

impl SerialCounter {
    pub fn new(first: u64) -> Self {
        Self { next: first }
    }

    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Keep the counter above the numeric suffix of an existing id. A suffix
    /// of `u64::MAX` has no successor and is never issued, so it is ignored.
    pub fn observe(&mut self, id: &str) {
        let digits: String = id
            .chars()
            .rev()
            .take_while(char::is_ascii_digit)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        if let Some(after) = digits.parse::<u64>().ok().and_then(|s| s.checked_add(1)) {
            self.next = self.next.max(after);
        }
    }

    /// Issue the next identity, or `None` once the serial space is exhausted.
    pub fn next_id(&mut self) -> Option<String> {
        let after = self.next.checked_add(1)?;
        let id = format_id(self.next);
        self.next = after;
        Some(id)
    }
}

pub fn format_id(serial: u64) -> String {
    format!("CF{:04}", serial)
}

/// Every zone of the lake, keyed by name.
#[derive(Clone, Debug, Serialize)]
pub struct World {
    /// Last month applied; 0 before the first update.
    pub month: u32,
    pub seed: u64,
    thresholds: StageThresholds,
    pub(crate) zones: BTreeMap<String, Zone>,
    pub(crate) serials: SerialCounter,
}

impl World {
    pub fn new(seed: u64, thresholds: StageThresholds, first_birth_serial: u64) -> Self {
        Self {
            month: 0,
            seed,
            thresholds,
            zones: BTreeMap::new(),
            serials: SerialCounter::new(first_birth_serial),
        }
    }

    pub fn thresholds(&self) -> StageThresholds {
        self.thresholds
    }

    /// Create `name` with `environment` unless it already exists; an existing
    /// zone keeps its population and environment.
    pub fn ensure_zone(&mut self, name: &str, environment: Environment) -> &mut Zone {
        let thresholds = self.thresholds;
        self.zones
            .entry(name.to_string())
            .or_insert_with(|| Zone::new(name, environment, thresholds))
    }

    /// Add an individual to an existing or newly created zone, keeping the
    /// birth counter above its id.
    pub fn insert(&mut self, zone: &str, environment: Environment, individual: Individual) -> Stage {
        self.serials.observe(&individual.id);
        self.ensure_zone(zone, environment).admit(individual)
    }

    /// Replace the environment of an existing zone. Returns `false` when the
    /// zone is unknown.
    pub fn set_environment(&mut self, zone: &str, environment: Environment) -> bool {
        match self.zones.get_mut(zone) {
            Some(entry) => {
                entry.environment = environment;
                true
            }
            None => false,
        }
    }

    /// Zones in name order.
    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.zones.get(name)
    }

    pub fn zone_mut(&mut self, name: &str) -> Option<&mut Zone> {
        self.zones.get_mut(name)
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    pub fn total_population(&self) -> usize {
        self.zones.values().map(Zone::total).sum()
    }

    pub fn next_serial(&self) -> u64 {
        self.serials.peek()
    }

    /// Verify that every individual sits in the bucket its age selects and
    /// that water quality stays within `[0, 1]`.
    pub fn check_partition(&self) -> Result<()> {
        for zone in self.zones.values() {
            ensure!(
                (0.0..=1.0).contains(&zone.environment.water_quality),
                "zone {} water quality {} outside [0, 1]",
                zone.name,
                zone.environment.water_quality
            );
            for (stage, fish) in zone.individuals() {
                let expected = self.thresholds.classify(fish.age_months);
                ensure!(
                    stage == expected,
                    "zone {} holds {} aged {} in the {} bucket, expected {}",
                    zone.name,
                    fish.id,
                    fish.age_months,
                    stage.label(),
                    expected.label()
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fish(id: &str, age: u32) -> Individual {
        Individual::new(id, age, 0.8, 0.5, Sex::Female)
    }

    #[test]
    fn classify_uses_half_open_thresholds() {
        let thresholds = StageThresholds::default();
        assert_eq!(thresholds.classify(0), Stage::Juvenile);
        assert_eq!(thresholds.classify(5), Stage::Juvenile);
        assert_eq!(thresholds.classify(6), Stage::Adult);
        assert_eq!(thresholds.classify(59), Stage::Adult);
        assert_eq!(thresholds.classify(60), Stage::Senior);
    }

    #[test]
    fn ensure_zone_is_idempotent() {
        let mut world = World::new(1, StageThresholds::default(), 10_000);
        world.insert("Inlet", Environment::default(), fish("CF0001", 12));
        let replaced = Environment {
            water_quality: 0.3,
            pollution_rate: 0.5,
        };
        world.ensure_zone("Inlet", replaced);
        let zone = world.zone("Inlet").expect("zone exists");
        assert_eq!(zone.total(), 1);
        assert_eq!(zone.environment().water_quality, 1.0);
        assert_eq!(world.zone_count(), 1);
    }

    #[test]
    fn insert_routes_by_age() {
        let mut world = World::new(1, StageThresholds::default(), 10_000);
        let env = Environment::default();
        assert_eq!(world.insert("Inlet", env, fish("a", 2)), Stage::Juvenile);
        assert_eq!(world.insert("Inlet", env, fish("b", 30)), Stage::Adult);
        assert_eq!(world.insert("Inlet", env, fish("c", 61)), Stage::Senior);
        assert_eq!(world.zone("Inlet").unwrap().counts(), [1, 1, 1]);
        world.check_partition().expect("partition holds");
    }

    #[test]
    fn zones_iterate_in_name_order() {
        let mut world = World::new(1, StageThresholds::default(), 10_000);
        for name in ["ReefSouth", "Inlet", "Outlet"] {
            world.ensure_zone(name, Environment::default());
        }
        let names: Vec<_> = world.zones().map(Zone::name).collect();
        assert_eq!(names, ["Inlet", "Outlet", "ReefSouth"]);
    }

    #[test]
    fn serial_counter_skips_loaded_ids() {
        let mut world = World::new(1, StageThresholds::default(), 10_000);
        world.insert("Inlet", Environment::default(), fish("CF0042", 8));
        assert_eq!(world.next_serial(), 10_000);
        world.insert("Inlet", Environment::default(), fish("CF12345", 8));
        assert_eq!(world.next_serial(), 12_346);
        world.insert("Inlet", Environment::default(), fish("Nemo", 8));
        assert_eq!(world.next_serial(), 12_346);
    }

    #[test]
    fn next_id_formats_with_padding() {
        let mut serials = SerialCounter::new(7);
        assert_eq!(serials.next_id().as_deref(), Some("CF0007"));
        assert_eq!(serials.next_id().as_deref(), Some("CF0008"));
        assert_eq!(format_id(10_000), "CF10000");
    }

    #[test]
    fn largest_serial_never_collides_or_overflows() {
        let mut world = World::new(1, StageThresholds::default(), 10_000);
        world.insert("Reef", Environment::default(), fish("CF18446744073709551615", 8));
        assert_eq!(world.next_serial(), 10_000);

        world.insert("Reef", Environment::default(), fish("CF18446744073709551613", 8));
        assert_eq!(world.next_serial(), u64::MAX - 1);
        let mut serials = world.serials.clone();
        assert_eq!(
            serials.next_id().as_deref(),
            Some("CF18446744073709551614")
        );
        assert_eq!(serials.next_id(), None);
        assert_eq!(serials.next_id(), None);
        assert_eq!(serials.peek(), u64::MAX);
    }

    #[test]
    fn check_partition_flags_misplaced_individual() {
        let mut world = World::new(1, StageThresholds::default(), 10_000);
        world.insert("Inlet", Environment::default(), fish("a", 3));
        world
            .zone_mut("Inlet")
            .unwrap()
            .bucket_mut(Stage::Juvenile)[0]
            .age_months = 20;
        assert!(world.check_partition().is_err());
    }

    #[test]
    fn sex_field_parsing() {
        assert_eq!(Sex::from_field("F"), Sex::Female);
        assert_eq!(Sex::from_field(" female"), Sex::Female);
        assert_eq!(Sex::from_field("M"), Sex::Male);
        assert_eq!(Sex::from_field(""), Sex::Male);
        assert_eq!(Sex::from_field("x"), Sex::Male);
    }
}
