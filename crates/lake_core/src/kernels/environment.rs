use crate::config::EnvironmentParams;
use crate::world::Environment;

/// Months per simulated year, used to locate the seasonal pulse.
pub const MONTHS_PER_YEAR: u32 = 12;

/// Advance a zone's water quality by one month.
///
/// Pollution removes `alpha * pollution_rate`, the remaining gap to pristine
/// water relaxes by `beta`, and the designated month of each year takes an
/// extra seasonal loss. The result is clamped to `[0, 1]` after all three
/// adjustments.
pub fn update(env: &mut Environment, month: u32, params: &EnvironmentParams) {
    let mut quality = env.water_quality;
    quality -= params.decay_alpha * env.pollution_rate;
    quality += params.recovery_beta * (1.0 - quality);
    if is_pulse_month(month, params) {
        quality -= params.seasonal_pulse;
    }
    env.water_quality = quality.clamp(0.0, 1.0);
}

pub fn is_pulse_month(month: u32, params: &EnvironmentParams) -> bool {
    month % MONTHS_PER_YEAR == params.seasonal_pulse_month
}
