#[cfg(test)]
mod tests;

pub mod cmd;
pub mod convert;
mod map;
mod parse;
pub mod pump;
pub mod transport;

use self::{
    cmd::frame::{Frame, InitState, PumpAddress, ReadinessState, Reply},
    convert::Quantity,
    parse::ParseError,
    pump::Pump,
    transport::{SerialTransport, Transport, TransportError},
};
use crate::{
    config::{Config, ConfigError, PollConfig, PumpConfig},
    util::ensure,
};
use log::{debug, trace, warn};
use nom::Finish;
use std::{
    cell::RefCell,
    collections::HashSet,
    convert::Infallible,
    fmt::Debug,
    rc::Rc,
    thread,
    time::{Duration, Instant},
};
use thiserror::Error;

// unfortunately, due to rustfmt not having the blank_lines_upper_bound feature
// stable yet, we gotta put comments in between the different sections. otherwise
// its just too much

//

/// Errors returned by any part of the driver
#[derive(Error, Debug)]
pub enum DriverError {
    /// Thrown by [`Driver::add_pump`] if the given address was out of bounds
    #[error("address must be 1 <= address <= 9, was {0}")]
    InvalidAddress(u8),
    /// Thrown by [`Driver::add_pump`] if a pump with that address already
    /// exists in that driver
    #[error("pump already exists: {0}")]
    AlreadyExists(PumpAddress),
    /// Thrown if a volume, rate or raw value doesn't fit into what the pump can do
    #[error("{quantity} out of range: {value} is not within 0..={max}")]
    OutOfRange {
        quantity: Quantity,
        value: f64,
        max: u32,
    },
    #[error("invalid direction {0:?}, expected \"in\" or \"out\"")]
    InvalidDirection(String),
    #[error("invalid valve position {0:?}, expected \"inlet\", \"outlet\" or \"bypass\"")]
    InvalidValvePosition(String),
    /// Thrown if an argument doesn't match the requirements of the pump
    #[error("invalid value for command argument")]
    InvalidArgument,
    /// Thrown if a reply didn't match any status the pump is known to send
    #[error("pump sent an unexpected status: {:?}", String::from_utf8_lossy(.0))]
    UnexpectedStatus(Vec<u8>),
    /// Thrown if a poll ran out of attempts or time
    #[error("no answer from pump {address} after {attempts} attempts")]
    Timeout { address: PumpAddress, attempts: u32 },
    /// Thrown by [`Pump::initialize`] if the pump never became ready
    #[error("pump {0} never became ready")]
    DeviceUnresponsive(PumpAddress),
    /// Thrown by motion commands if the pump wasn't initialized
    #[error("pump {0} is not initialized")]
    NotInitialized(PumpAddress),
    /// Thrown by motion commands if the pump didn't become ready before sending
    #[error("pump {0} is not ready")]
    NotReady(PumpAddress),
    /// Wrapper around [`TransportError`]
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Wrapper around [`ConfigError`]
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// lets functions take anything that converts into a value either infallibly or
// with a DriverError
impl From<Infallible> for DriverError {
    fn from(e: Infallible) -> Self {
        match e {}
    }
}

// turns running out of time into a more specific error
pub(crate) fn timeout_as(e: DriverError, err: DriverError) -> DriverError {
    match e {
        DriverError::Timeout { .. } => err,
        e => e,
    }
}

//

// every operation borrows this for its whole write/read exchange, so replies
// can't get mixed up between pumps on the same bus
pub(crate) struct InnerDriver<T: Transport> {
    transport: T,
    poll: PollConfig,
    pumps: HashSet<PumpAddress>,
}

impl<T: Transport> InnerDriver<T> {
    // Should only be called by the drop function in Pump
    pub fn drop_pump(&mut self, address: PumpAddress) {
        self.pumps.remove(&address);
    }

    pub fn send(&mut self, frame: &Frame) -> Result<(), DriverError> {
        debug!("sending {:?}", frame.to_string());
        self.transport.write_frame(&frame.to_bytes())?;
        Ok(())
    }

    // sends a frame and reads a single reply, which is empty if the pump
    // didn't answer in time
    fn exchange(&mut self, frame: &Frame) -> Result<Vec<u8>, DriverError> {
        self.send(frame)?;
        let line = self.transport.read_line(self.poll.read_timeout())?;
        if line.is_empty() {
            debug!("pump {} didn't answer in time", frame.address());
        } else {
            debug!("received {:?}", String::from_utf8_lossy(&line));
        }
        Ok(line)
    }

    // calls attempt until it returns something, sleeping the poll interval
    // before each call. gives up once the attempts or the deadline run out
    fn poll<R, F>(
        &mut self,
        address: PumpAddress,
        what: &str,
        (max_attempts, deadline): (u32, Duration),
        mut attempt: F,
    ) -> Result<R, DriverError>
    where
        F: FnMut(&mut Self) -> Result<Option<R>, DriverError>,
    {
        let started = Instant::now();
        let mut attempts = 0;
        while attempts < max_attempts && started.elapsed() < deadline {
            thread::sleep(self.poll.interval());
            attempts += 1;
            trace!("polling {} of pump {}, attempt {}", what, address, attempts);
            if let Some(r) = attempt(self)? {
                return Ok(r);
            }
        }
        warn!(
            "gave up polling {} of pump {} after {} attempts in {:?}",
            what,
            address,
            attempts,
            started.elapsed()
        );
        Err(DriverError::Timeout { address, attempts })
    }

    fn status_bounds(&self) -> (u32, Duration) {
        (self.poll.max_attempts, self.poll.deadline())
    }

    fn completion_bounds(&self) -> (u32, Duration) {
        (
            self.poll.completion_max_attempts,
            self.poll.completion_deadline(),
        )
    }

    fn poll_ready(
        &mut self,
        address: PumpAddress,
        what: &str,
        bounds: (u32, Duration),
    ) -> Result<(), DriverError> {
        let frame = Frame::query(address);
        self.poll(address, what, bounds, |d| {
            let reply = d.exchange(&frame)?;
            Ok(reply.contains(&map::READY_MARKER).then_some(()))
        })
    }

    /// Blocks until the pump answers a query with the ready marker anywhere in
    /// its reply. Other status bytes are ignored on purpose.
    pub fn wait_ready(&mut self, address: PumpAddress) -> Result<(), DriverError> {
        let bounds = self.status_bounds();
        self.poll_ready(address, "readiness", bounds)
    }

    /// Same as [`wait_ready`][InnerDriver::wait_ready], but bounded by how long
    /// a motion may take instead of how long a status query may take
    pub fn wait_done(&mut self, address: PumpAddress) -> Result<(), DriverError> {
        let bounds = self.completion_bounds();
        self.poll_ready(address, "completion", bounds)
    }

    pub fn query_readiness(
        &mut self,
        address: PumpAddress,
    ) -> Result<ReadinessState, DriverError> {
        let line = self.exchange(&Frame::query(address))?;
        ensure!(
            !line.is_empty(),
            DriverError::Timeout {
                address,
                attempts: 1
            }
        );
        let (_, reply) = Reply::parse(&line)
            .finish()
            .map_err(|_| DriverError::UnexpectedStatus(line.clone()))?;
        ReadinessState::from_status(reply.status).ok_or_else(|| {
            warn!("pump {} sent unknown status byte {:#04x}", address, reply.status);
            DriverError::UnexpectedStatus(line)
        })
    }

    /// Waits until the pump is ready, then asks for the initialization report
    /// until a reply carries it
    pub fn query_initialized(&mut self, address: PumpAddress) -> Result<bool, DriverError> {
        self.wait_ready(address)?;
        let frame = Frame::report_initialized(address);
        let bounds = self.status_bounds();
        self.poll(address, "initialization state", bounds, |d| {
            let reply = d.exchange(&frame)?;
            match InitState::parse(&reply).finish() {
                Ok((_, state)) => Ok(Some(state.into())),
                Err(ParseError::InvalidValue) => {
                    warn!("pump {} sent unknown initialization state", address);
                    Err(DriverError::UnexpectedStatus(reply.clone()))
                }
                // no marker in there, ask again
                Err(ParseError::NomError(_)) => Ok(None),
            }
        })
    }
}

impl<T: Transport + Debug> Debug for InnerDriver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "InnerDriver {{ transport: {:?}, poll: {:?}, pumps: {:?} }}",
            self.transport, self.poll, self.pumps,
        )
    }
}

//

/// Represents a single serial bus with pumps attached to it
///
/// `T` is the transport used to actually communicate with the pumps, usually
/// a [`SerialTransport`]. The driver itself doesn't really do much, to actually
/// communicate with a pump, a [`Pump`] is needed, which can be obtained by
/// calling [`add_pump`][Driver::add_pump].
///
/// The transport is only dropped once the driver and all [`Pump`]s that
/// originated from it are dropped.
#[derive(Debug)]
pub struct Driver<T: Transport> {
    inner: Rc<RefCell<InnerDriver<T>>>,
}

impl<T: Transport> Driver<T> {
    /// Returns a new driver polling with the default bounds
    pub fn new(transport: T) -> Self {
        Self::with_poll_config(transport, PollConfig::default())
    }

    pub fn with_poll_config(transport: T, poll: PollConfig) -> Self {
        Driver {
            inner: Rc::new(RefCell::new(InnerDriver {
                transport,
                poll,
                pumps: HashSet::with_capacity(PumpAddress::MAX as usize),
            })),
        }
    }

    pub fn open(&mut self) -> Result<(), DriverError> {
        self.inner.borrow_mut().transport.open()?;
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), DriverError> {
        self.inner.borrow_mut().transport.close()?;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.inner.borrow().transport.is_open()
    }

    /// Opens the connection, runs `f` and closes the connection again, no matter
    /// whether `f` failed. An error of `f` takes precedence over one of closing.
    ///
    /// # Examples
    /// ```no_run
    /// # use tricontinent_pump_driver::{Driver, PumpConfig, SerialTransport};
    /// let mut driver = Driver::new(SerialTransport::new("/dev/ttyUSB0", 9600));
    /// driver
    ///     .session(|driver| {
    ///         let mut pump = driver.add_pump(1, PumpConfig::default())?;
    ///         pump.initialize()?;
    ///         pump.transfer("in", 3)
    ///     })
    ///     .unwrap();
    /// ```
    pub fn session<R, F>(&mut self, f: F) -> Result<R, DriverError>
    where
        F: FnOnce(&mut Self) -> Result<R, DriverError>,
    {
        self.open()?;
        let res = f(self);
        let closed = self.close();
        let r = res?;
        closed?;
        Ok(r)
    }

    /// Returns a pump with the given address and syringe.
    ///
    /// A pump is removed from the driver simply by dropping it.
    ///
    /// # Errors
    /// Will return a [`DriverError::InvalidAddress`] if the given address is
    /// out of bounds and [`DriverError::Config`] if `config` is invalid. If a
    /// pump with this address already exists in this driver,
    /// [`DriverError::AlreadyExists`] is returned.
    pub fn add_pump(&mut self, address: u8, config: PumpConfig) -> Result<Pump<T>, DriverError> {
        let address = PumpAddress::new(address)?;
        config.validate()?;
        let mut inner = self.inner.borrow_mut();
        ensure!(
            !inner.pumps.contains(&address),
            DriverError::AlreadyExists(address)
        );
        inner.pumps.insert(address);
        Ok(Pump::new(Rc::clone(&self.inner), address, config))
    }
}

impl Driver<SerialTransport> {
    /// Builds a driver for the configured port together with all configured
    /// pumps. The port isn't opened yet.
    pub fn from_config(
        config: &Config,
    ) -> Result<(Self, Vec<Pump<SerialTransport>>), DriverError> {
        config.validate()?;
        let transport = SerialTransport::new(config.port.path.clone(), config.port.baud_rate);
        let mut driver = Driver::with_poll_config(transport, config.poll);
        let pumps = config
            .pumps
            .iter()
            .map(|e| driver.add_pump(e.address, e.pump.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((driver, pumps))
    }
}
