//! Configuration of the serial port, the polling and the pumps on the bus.
//!
//! Everything has a default, so an empty file is a valid configuration for a
//! single C3000 with a 5 mL syringe at address 1 on `/dev/ttyUSB0`.
//!
//! ```toml
//! [port]
//! path = "/dev/ttyUSB0"
//! baud_rate = 9600
//!
//! [poll]
//! interval_ms = 50
//! max_attempts = 2400
//! completion_deadline_ms = 3600000
//!
//! [[pumps]]
//! address = 1
//! syringe_size_ml = 5.0
//! max_steps = 3000
//! top_velocity = 6000
//! initialisation_direction = "Z"
//! stroke_volume_ml = 5.0
//! ```


use crate::driver::{
    cmd::{frame::PumpAddress, InitDirection},
    transport::{DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT},
};
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path, time::Duration};
use thiserror::Error;

/// Errors while loading or checking a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    IoError(#[from] io::Error),
    #[error(transparent)]
    TomlError(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

macro_rules! invalid {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(ConfigError::Invalid(format!($($arg)*)));
        }
    };
}

//

/// Everything the unit conversion and frame building of one pump depend on
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PumpConfig {
    pub syringe_size_ml: f64,
    /// Steps of a full stroke, 3000 for a C3000 in normal mode
    pub max_steps: u32,
    /// Fastest velocity in half-steps per second
    pub top_velocity: u32,
    pub initialisation_direction: InitDirection,
    /// Volume moved by one [`transfer`][crate::Pump::transfer]
    pub stroke_volume_ml: f64,
}

impl Default for PumpConfig {
    fn default() -> Self {
        PumpConfig {
            syringe_size_ml: 5.0,
            max_steps: 3000,
            top_velocity: 6000,
            initialisation_direction: InitDirection::InputLeft,
            stroke_volume_ml: 5.0,
        }
    }
}

impl PumpConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        invalid!(
            self.syringe_size_ml.is_finite() && self.syringe_size_ml > 0.0,
            "syringe size must be positive, was {}",
            self.syringe_size_ml
        );
        invalid!(self.max_steps > 0, "max steps must be positive");
        invalid!(
            self.stroke_volume_ml > 0.0 && self.stroke_volume_ml <= self.syringe_size_ml,
            "stroke volume must be within 0 < stroke <= {}, was {}",
            self.syringe_size_ml,
            self.stroke_volume_ml
        );
        Ok(())
    }
}

//

/// Bounds of the readiness and initialization polls
///
/// A poll gives up after `max_attempts` queries or once `deadline_ms` passed,
/// whatever comes first. Before every query it sleeps `interval_ms`.
///
/// Waiting for a motion to finish has its own, much longer bounds. A frame with
/// many repeats at a low velocity keeps the pump busy for hours, pick
/// `completion_deadline_ms` after the slowest frame that is sent.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
    pub deadline_ms: u64,
    /// How long a single read waits for a reply
    pub read_timeout_ms: u64,
    pub completion_max_attempts: u32,
    pub completion_deadline_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            interval_ms: 50,
            max_attempts: 2400,
            deadline_ms: 120_000,
            read_timeout_ms: DEFAULT_READ_TIMEOUT.as_millis() as u64,
            // an hour of queries every 50 ms
            completion_max_attempts: 72_000,
            completion_deadline_ms: 3_600_000,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn completion_deadline(&self) -> Duration {
        Duration::from_millis(self.completion_deadline_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        invalid!(self.max_attempts > 0, "max attempts must be positive");
        invalid!(self.deadline_ms > 0, "deadline must be positive");
        // a serial port returns from every read right away otherwise
        invalid!(self.read_timeout_ms > 0, "read timeout must be positive");
        invalid!(
            self.completion_max_attempts > 0,
            "completion max attempts must be positive"
        );
        invalid!(
            self.completion_deadline_ms > 0,
            "completion deadline must be positive"
        );
        Ok(())
    }
}

//

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    pub path: String,
    pub baud_rate: u32,
}

impl Default for PortConfig {
    fn default() -> Self {
        PortConfig {
            path: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// A pump on the bus together with its syringe
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PumpEntry {
    pub address: u8,
    #[serde(flatten)]
    pub pump: PumpConfig,
}

impl Default for PumpEntry {
    fn default() -> Self {
        PumpEntry {
            address: 1,
            pump: PumpConfig::default(),
        }
    }
}

//

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: PortConfig,
    pub poll: PollConfig,
    pub pumps: Vec<PumpEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: PortConfig::default(),
            poll: PollConfig::default(),
            pumps: vec![PumpEntry::default()],
        }
    }
}

impl Config {
    /// Parses and validates a configuration
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        invalid!(self.port.baud_rate > 0, "baud rate must be positive");
        self.poll.validate()?;
        let mut seen = Vec::with_capacity(self.pumps.len());
        for entry in &self.pumps {
            invalid!(
                PumpAddress::new(entry.address).is_ok(),
                "address must be {} <= address <= {}, was {}",
                PumpAddress::MIN,
                PumpAddress::MAX,
                entry.address
            );
            invalid!(
                !seen.contains(&entry.address),
                "address {} configured twice",
                entry.address
            );
            seen.push(entry.address);
            entry.pump.validate()?;
        }
        Ok(())
    }
}
