use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::world::{Environment, StageThresholds};

/// How reproduction responds to a zone holding more fish than its capacity.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CrowdingResponse {
    /// Births scale with `max(0, (N - C) / C)`: zero below capacity, growing
    /// linearly above it.
    #[default]
    Amplify,
    /// Births scale with `1 - max(0, (N - C) / C)`, clamped to `[0, 1]`: full
    /// rate below capacity, none at twice capacity.
    Throttle,
}

/// Inclusive-low, exclusive-high sampling range for newborn and synthetic traits.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct TraitRange {
    pub min: f64,
    pub max: f64,
}

impl TraitRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn validate(&self, name: &str) -> Result<()> {
        ensure!(
            self.min.is_finite() && self.max.is_finite(),
            "{name} range must be finite"
        );
        ensure!(
            self.min <= self.max,
            "{name} range is inverted: {} > {}",
            self.min,
            self.max
        );
        ensure!(
            self.min >= 0.0 && self.max <= 1.0,
            "{name} range must lie within [0, 1]"
        );
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvironmentParams {
    /// Water quality lost per unit of pollution rate each month.
    pub decay_alpha: f64,
    /// Fraction of the gap to pristine water recovered each month.
    pub recovery_beta: f64,
    /// Extra loss applied once a year.
    pub seasonal_pulse: f64,
    /// Month-of-year (`month % 12`) that receives the seasonal pulse.
    pub seasonal_pulse_month: u32,
}

impl Default for EnvironmentParams {
    fn default() -> Self {
        Self {
            decay_alpha: 0.15,
            recovery_beta: 0.04,
            seasonal_pulse: 0.02,
            seasonal_pulse_month: 3,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MortalityParams {
    /// Baseline monthly death probability for every fish.
    pub natural: f64,
    /// Weight of `(1 - water_quality) * (1 - tolerance)` in the death probability.
    pub pollution_multiplier: f64,
    /// Multiplier applied to the death probability of seniors.
    pub senior_multiplier: f64,
}

impl Default for MortalityParams {
    fn default() -> Self {
        Self {
            natural: 0.005,
            pollution_multiplier: 0.6,
            senior_multiplier: 1.5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReproductionParams {
    /// Expected births per adult per month before environment and crowding.
    pub base_rate: f64,
    /// Population at which the crowding factor starts to move.
    pub capacity: u32,
    pub crowding: CrowdingResponse,
    pub newborn_health: TraitRange,
    pub newborn_tolerance: TraitRange,
    /// Lowest serial handed to a newborn.
    pub first_birth_serial: u64,
}

impl Default for ReproductionParams {
    fn default() -> Self {
        Self {
            base_rate: 0.25,
            capacity: 50,
            crowding: CrowdingResponse::Amplify,
            newborn_health: TraitRange::new(0.7, 0.9),
            newborn_tolerance: TraitRange::new(0.2, 0.8),
            first_birth_serial: 10_000,
        }
    }
}

/// Population generated when the roster is missing or too small.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FallbackParams {
    pub zones: Vec<String>,
    /// Pollution rate of the first zone; each following zone adds `pollution_step`.
    pub pollution_base: f64,
    pub pollution_step: f64,
    pub population: u32,
    pub max_age_months: u32,
    pub health: TraitRange,
    pub tolerance: TraitRange,
}

impl Default for FallbackParams {
    fn default() -> Self {
        Self {
            zones: ["Inlet", "ReefNorth", "ReefSouth", "DeepPool", "Outlet"]
                .into_iter()
                .map(String::from)
                .collect(),
            pollution_base: 0.005,
            pollution_step: 0.01,
            population: 120,
            max_age_months: 72,
            health: TraitRange::new(0.7, 1.0),
            tolerance: TraitRange::new(0.2, 1.0),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Run seed. When absent the runner picks one and logs it.
    pub seed: Option<u64>,
    /// Number of months simulated after the initial snapshot.
    pub months: u32,
    /// Months between periodic snapshots.
    pub snapshot_interval: u32,
    pub stages: StageThresholds,
    pub environment: EnvironmentParams,
    pub mortality: MortalityParams,
    pub reproduction: ReproductionParams,
    /// Environment given to zones first seen in the roster.
    pub default_environment: Environment,
    /// Per-zone environment overrides, applied after loading.
    pub zone_environment: BTreeMap<String, Environment>,
    /// Valid roster records required before the roster is trusted.
    pub min_roster_records: usize,
    pub fallback: FallbackParams,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: None,
            months: 144,
            snapshot_interval: 12,
            stages: StageThresholds::default(),
            environment: EnvironmentParams::default(),
            mortality: MortalityParams::default(),
            reproduction: ReproductionParams::default(),
            default_environment: Environment::default(),
            zone_environment: BTreeMap::new(),
            min_roster_records: 100,
            fallback: FallbackParams::default(),
        }
    }
}

impl SimConfig {
    /// Load and validate a JSON configuration document from disk.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open config file {:?}", path))?;
        Self::from_reader(BufReader::new(file))
    }

    /// Deserialize and validate a configuration document from an arbitrary reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let config: Self = serde_json::from_reader(reader).context("invalid config json")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.snapshot_interval > 0, "snapshot_interval must be positive");
        ensure!(
            self.stages.juvenile_months <= self.stages.senior_months,
            "juvenile threshold {} exceeds senior threshold {}",
            self.stages.juvenile_months,
            self.stages.senior_months
        );

        let env = &self.environment;
        for (name, value) in [
            ("environment.decay_alpha", env.decay_alpha),
            ("environment.recovery_beta", env.recovery_beta),
            ("environment.seasonal_pulse", env.seasonal_pulse),
            ("mortality.natural", self.mortality.natural),
            ("mortality.pollution_multiplier", self.mortality.pollution_multiplier),
            ("mortality.senior_multiplier", self.mortality.senior_multiplier),
            ("reproduction.base_rate", self.reproduction.base_rate),
            ("fallback.pollution_base", self.fallback.pollution_base),
            ("fallback.pollution_step", self.fallback.pollution_step),
        ] {
            ensure!(
                value.is_finite() && value >= 0.0,
                "{name} must be a non-negative number, got {value}"
            );
        }
        ensure!(
            env.recovery_beta <= 1.0,
            "environment.recovery_beta must not exceed 1"
        );
        ensure!(
            env.seasonal_pulse_month < 12,
            "environment.seasonal_pulse_month must be in 0..12"
        );

        self.reproduction
            .newborn_health
            .validate("reproduction.newborn_health")?;
        self.reproduction
            .newborn_tolerance
            .validate("reproduction.newborn_tolerance")?;
        self.fallback.health.validate("fallback.health")?;
        self.fallback.tolerance.validate("fallback.tolerance")?;
        ensure!(
            !self.fallback.zones.is_empty(),
            "fallback.zones must name at least one zone"
        );

        self.default_environment
            .validate()
            .context("invalid default_environment")?;
        for (zone, environment) in &self.zone_environment {
            environment
                .validate()
                .with_context(|| format!("invalid zone_environment for {zone}"))?;
        }
        Ok(())
    }
}
