//! Rust driver for TriContinent C3000 syringe pumps and other pumps speaking
//! the same ASCII protocol over RS232/RS485.
//!
//! # Usage
//! Each serial bus with connected pumps gets its own [`Driver`]. Pumps can then
//! be added to a driver by calling [`Driver::add_pump`] with their address and
//! the [`PumpConfig`] of the syringe mounted on them. A [`Pump`] converts
//! volumes and flow rates into steps and velocities, builds the command
//! [`Frame`]s and polls the pump until it is done.
//!
//! Every poll is bounded by the [`PollConfig`] of the driver, a pump that never
//! answers results in a [`DriverError::Timeout`] instead of a hang.
//!
//! The driver logs through the [`log`] facade and doesn't install a logger
//! itself.
//!
//! # Examples
//! ```no_run
//! # use tricontinent_pump_driver::{Driver, PumpConfig, SerialTransport};
//! let mut driver = Driver::new(SerialTransport::new("/dev/ttyUSB0", 9600));
//! driver.open().unwrap();
//! let mut p1 = driver.add_pump(1, PumpConfig::default()).unwrap();
//!
//! p1.initialize().unwrap();
//! p1.is_ready().unwrap();
//! // 3 strokes of 5 mL from inlet to outlet
//! p1.transfer("in", 3).unwrap();
//! driver.close().unwrap();
//! ```
//!
//! A whole setup can also be described in a TOML file, see [`config`].
//! ```no_run
//! # use tricontinent_pump_driver::{Config, Driver};
//! let config = Config::load("pumps.toml").unwrap();
//! let (mut driver, mut pumps) = Driver::from_config(&config).unwrap();
//! driver.open().unwrap();
//! for pump in pumps.iter_mut() {
//!     pump.initialize().unwrap();
//! }
//! ```

pub mod config;
mod driver;
pub(crate) mod util;

pub use config::{Config, ConfigError, PollConfig, PortConfig, PumpConfig, PumpEntry};
pub use driver::{
    cmd::{
        frame::{ErrorCode, Frame, InitState, PumpAddress, ReadinessState, Reply},
        Direction, Directive, InitDirection, Repeats, Travel, Valve,
    },
    convert::{rate_to_velocity, volume_to_steps, FlowRate, Quantity, Steps, Velocity},
    pump::Pump,
    transport::{
        ClearInput, SerialTransport, StreamTransport, Transport, TransportError,
        DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT,
    },
    Driver, DriverError,
};
