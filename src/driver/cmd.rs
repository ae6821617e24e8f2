//! Provides bindings for the directives of the pump.
//!
//! A [`Directive`] is a single letter, sometimes followed by a number. Multiple
//! directives are joined into a [`Frame`][frame::Frame], which the pump executes
//! from left to right once the frame is terminated by the execute letter.\
//! Numeric arguments can only be constructed through the range checked
//! constructors of [`Steps`], [`Velocity`] and [`Repeats`], so a frame that
//! exists is always one the pump accepts.

#[cfg(test)]
mod tests;

pub mod frame;

use super::{
    convert::{Steps, Velocity},
    map, DriverError,
};
use crate::util::ensure;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

//

/// Position of the fluidic valve
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Valve {
    Inlet,
    Outlet,
    Bypass,
}

impl Valve {
    fn letter(self) -> &'static str {
        match self {
            Self::Inlet => map::VALVE_INLET,
            Self::Outlet => map::VALVE_OUTLET,
            Self::Bypass => map::VALVE_BYPASS,
        }
    }
}

impl FromStr for Valve {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inlet" => Ok(Self::Inlet),
            "outlet" => Ok(Self::Outlet),
            "bypass" => Ok(Self::Bypass),
            _ => Err(DriverError::InvalidValvePosition(s.to_string())),
        }
    }
}

//

/// Side the valve points to while the plunger moves to its home position
///
/// Depends on how the pump is plumbed, "input left" is the factory default.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, Default, Serialize, Deserialize)]
pub enum InitDirection {
    #[default]
    #[serde(rename = "Z")]
    InputLeft,
    #[serde(rename = "Y")]
    InputRight,
}

impl InitDirection {
    fn letter(self) -> &'static str {
        match self {
            Self::InputLeft => map::INIT_INPUT_LEFT,
            Self::InputRight => map::INIT_INPUT_RIGHT,
        }
    }
}

impl FromStr for InitDirection {
    type Err = DriverError;

    /// Takes the letter the pump uses, `"Z"` or `"Y"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            map::INIT_INPUT_LEFT => Ok(Self::InputLeft),
            map::INIT_INPUT_RIGHT => Ok(Self::InputRight),
            _ => Err(DriverError::InvalidArgument),
        }
    }
}

//

/// Direction fluid is moved in by [`Pump::transfer`][crate::Pump::transfer]
///
/// `In` moves one stroke from inlet to outlet, `Out` from outlet to inlet.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// Valve the syringe is filled from and valve it is emptied to
    pub fn valves(self) -> (Valve, Valve) {
        match self {
            Self::In => (Valve::Inlet, Valve::Outlet),
            Self::Out => (Valve::Outlet, Valve::Inlet),
        }
    }
}

impl TryFrom<&str> for Direction {
    type Error = DriverError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            _ => Err(DriverError::InvalidDirection(s.to_string())),
        }
    }
}

impl FromStr for Direction {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

//

/// Direction of a relative plunger move
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Travel {
    /// Draws fluid into the syringe
    Pickup,
    /// Pushes fluid out of the syringe
    Dispense,
}

//

/// How often a frame is executed, see [`Directive::Repeat`]
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub struct Repeats(u16);

impl Repeats {
    pub const MAX: u16 = 30000;

    /// # Errors
    /// Returns [`DriverError::InvalidArgument`] if `n` is 0, which the pump
    /// takes as "repeat forever", or bigger than [`Repeats::MAX`].
    pub fn new(n: u16) -> Result<Self, DriverError> {
        ensure!(n >= 1 && n <= Self::MAX, DriverError::InvalidArgument);
        Ok(Self(n))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

//

/// A single token of a [`Frame`][frame::Frame]
///
/// The execute letter is not a directive, every frame is terminated by it.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Directive {
    /// Moves the plunger to its home position
    Initialize(InitDirection),
    Valve(Valve),
    /// Moves the plunger to an absolute position
    Goto(Steps),
    Pickup(Steps),
    Dispense(Steps),
    /// Sets the top velocity for the moves following it
    Velocity(Velocity),
    /// Repeats everything before it in the frame
    Repeat(Repeats),
    /// Asks for the status byte
    Query,
    /// Asks for one of the numbered reports
    Report(u8),
}

impl Directive {
    pub fn relative(travel: Travel, steps: Steps) -> Self {
        match travel {
            Travel::Pickup => Self::Pickup(steps),
            Travel::Dispense => Self::Dispense(steps),
        }
    }
}

impl Display for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Directive::Initialize(d) => write!(f, "{}", d.letter()),
            Directive::Valve(v) => write!(f, "{}", v.letter()),
            Directive::Goto(s) => write!(f, "{}{}", map::ABSOLUTE_POSITION, s.get()),
            Directive::Pickup(s) => write!(f, "{}{}", map::RELATIVE_PICKUP, s.get()),
            Directive::Dispense(s) => write!(f, "{}{}", map::RELATIVE_DISPENSE, s.get()),
            Directive::Velocity(v) => write!(f, "{}{}", map::TOP_VELOCITY, v.get()),
            Directive::Repeat(n) => write!(f, "{}{}", map::REPEAT, n.get()),
            Directive::Query => write!(f, "{}", map::QUERY),
            Directive::Report(n) => write!(f, "{}{}", map::REPORT, n),
        }
    }
}
