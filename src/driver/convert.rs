//! Conversion of physical units into the units the pump works in.
//!
//! All conversions truncate, the pump can't move less than a step anyway and
//! rounding up would deliver more than asked for.

#[cfg(test)]
mod tests;

use super::DriverError;
use crate::{
    config::PumpConfig,
    util::{checked_trunc, snap},
};
use std::{fmt::Display, str::FromStr};

/// An absolute or relative plunger position in steps, never more than the
/// syringe's maximum
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, PartialOrd, Ord)]
pub struct Steps(u32);

impl Steps {
    pub fn get(self) -> u32 {
        self.0
    }
}

/// Top velocity in half-steps per second, never more than the pump's maximum
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, PartialOrd, Ord)]
pub struct Velocity(u32);

impl Velocity {
    pub fn get(self) -> u32 {
        self.0
    }
}

/// A flow rate, either in mL/min or whatever the pump is currently set to
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum FlowRate {
    Default,
    MlPerMin(f64),
}

impl From<f64> for FlowRate {
    fn from(r: f64) -> Self {
        Self::MlPerMin(r)
    }
}

impl FromStr for FlowRate {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "default" {
            return Ok(Self::Default);
        }
        s.parse()
            .map(Self::MlPerMin)
            .map_err(|_| DriverError::InvalidArgument)
    }
}

/// Quantity that didn't fit into the pump's range, see [`DriverError::OutOfRange`]
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Quantity {
    Steps,
    Velocity,
}

impl Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Steps => write!(f, "steps"),
            Self::Velocity => write!(f, "half-steps/s"),
        }
    }
}

fn out_of_range(quantity: Quantity, value: f64, max: u32) -> DriverError {
    DriverError::OutOfRange {
        quantity,
        value,
        max,
    }
}

/// Converts an absolute volume in the syringe to a plunger position
///
/// # Errors
/// [`DriverError::OutOfRange`] if the volume is negative or more than the
/// syringe holds.
///
/// # Examples
/// ```
/// # use tricontinent_pump_driver::{volume_to_steps, PumpConfig};
/// let config = PumpConfig::default();
/// assert_eq!(volume_to_steps(&config, 5.0).unwrap().get(), 3000);
/// assert_eq!(volume_to_steps(&config, 0.0019).unwrap().get(), 1);
/// ```
pub fn volume_to_steps(config: &PumpConfig, volume_ml: f64) -> Result<Steps, DriverError> {
    let steps = config.max_steps as f64 / config.syringe_size_ml * volume_ml;
    checked_trunc(steps, config.max_steps)
        .map(Steps)
        .ok_or_else(|| out_of_range(Quantity::Steps, steps, config.max_steps))
}

/// Converts a flow rate to a top velocity, going over steps per minute
///
/// [`FlowRate::Default`] returns `None`, meaning the velocity directive is left
/// out and the pump keeps its current velocity.
///
/// # Errors
/// [`DriverError::OutOfRange`] if the rate is negative or faster than the pump
/// can go.
pub fn rate_to_velocity(
    config: &PumpConfig,
    rate: FlowRate,
) -> Result<Option<Velocity>, DriverError> {
    let ml_per_min = match rate {
        FlowRate::Default => return Ok(None),
        FlowRate::MlPerMin(r) => r,
    };
    // mL/min / (mL/step), multiplied out so exact rates stay exact
    let steps_per_min = ml_per_min * config.max_steps as f64 / config.syringe_size_ml;
    let half_steps_per_sec = 2.0 * snap(steps_per_min).trunc() / 60.0;
    if steps_per_min < 0.0 {
        return Err(out_of_range(
            Quantity::Velocity,
            2.0 * steps_per_min / 60.0,
            config.top_velocity,
        ));
    }
    checked_trunc(half_steps_per_sec, config.top_velocity)
        .map(|v| Some(Velocity(v)))
        .ok_or_else(|| out_of_range(Quantity::Velocity, half_steps_per_sec, config.top_velocity))
}

/// Range checks a plunger position that is already in steps
pub fn steps(config: &PumpConfig, steps: u32) -> Result<Steps, DriverError> {
    if steps > config.max_steps {
        return Err(out_of_range(Quantity::Steps, steps as f64, config.max_steps));
    }
    Ok(Steps(steps))
}

/// Range checks a velocity that is already in half-steps per second
pub fn velocity(config: &PumpConfig, half_steps_per_sec: u32) -> Result<Velocity, DriverError> {
    if half_steps_per_sec > config.top_velocity {
        return Err(out_of_range(
            Quantity::Velocity,
            half_steps_per_sec as f64,
            config.top_velocity,
        ));
    }
    Ok(Velocity(half_steps_per_sec))
}
