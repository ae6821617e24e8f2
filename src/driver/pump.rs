
use super::{
    cmd::{
        frame::{Frame, PumpAddress, ReadinessState},
        Direction, Directive, Repeats, Travel, Valve,
    },
    convert::{self, FlowRate},
    timeout_as,
    transport::Transport,
    DriverError, InnerDriver,
};
use crate::{config::PumpConfig, util::ensure};
use log::{debug, info};
use std::{cell::RefCell, fmt::Debug, rc::Rc};

/// A single pump on the bus
///
/// Every function that talks to the pump blocks until the exchange is done.
/// None of them cache anything about the pump, the pump itself is the only
/// source of truth since it can be reset or power cycled at any time.
///
/// This type is not threadsafe.
///
/// # Examples
/// ```no_run
/// # use tricontinent_pump_driver::{Driver, FlowRate, PumpConfig, SerialTransport};
/// let mut driver = Driver::new(SerialTransport::new("/dev/ttyUSB0", 9600));
/// driver.open().unwrap();
/// let mut pump = driver.add_pump(1, PumpConfig::default()).unwrap();
///
/// pump.initialize().unwrap();
/// pump.set_position(2.5, FlowRate::MlPerMin(10.0)).unwrap();
/// pump.transfer("out", 2).unwrap();
/// ```
pub struct Pump<T: Transport> {
    driver: Rc<RefCell<InnerDriver<T>>>,
    address: PumpAddress,
    config: PumpConfig,
}

impl<T: Transport> Pump<T> {
    pub(super) fn new(
        driver: Rc<RefCell<InnerDriver<T>>>,
        address: PumpAddress,
        config: PumpConfig,
    ) -> Self {
        Pump {
            driver,
            address,
            config,
        }
    }

    pub fn address(&self) -> PumpAddress {
        self.address
    }

    pub fn config(&self) -> &PumpConfig {
        &self.config
    }

    // sends a motion frame once the pump is initialized and ready, then blocks
    // until the pump is done with it. the frame is complete before anything is
    // sent, so a failed precondition never leaves half a command on the bus
    fn run(&mut self, frame: Frame) -> Result<(), DriverError> {
        let address = self.address;
        let mut driver = self.driver.borrow_mut();
        let initialized = driver
            .query_initialized(address)
            .map_err(|e| timeout_as(e, DriverError::NotReady(address)))?;
        ensure!(initialized, DriverError::NotInitialized(address));
        driver
            .wait_ready(address)
            .map_err(|e| timeout_as(e, DriverError::NotReady(address)))?;
        driver.send(&frame)?;
        driver.wait_done(address)
    }

    //

    /// Polls the pump until it is ready
    ///
    /// Ready means that the reply to a query contains the ready marker anywhere,
    /// nothing else about the reply is looked at.
    ///
    /// # Errors
    /// [`DriverError::Timeout`] if the pump wasn't ready within the poll bounds
    /// of the driver.
    pub fn is_ready(&mut self) -> Result<bool, DriverError> {
        self.driver.borrow_mut().wait_ready(self.address)?;
        Ok(true)
    }

    /// Queries the status byte once and decodes it, without waiting for the
    /// pump to become ready
    pub fn query_readiness(&mut self) -> Result<ReadinessState, DriverError> {
        self.driver.borrow_mut().query_readiness(self.address)
    }

    /// Waits for the pump to become ready and asks whether it is initialized
    ///
    /// # Errors
    /// [`DriverError::UnexpectedStatus`] if the pump answers with anything but
    /// `0` or `1`, [`DriverError::Timeout`] if it doesn't answer at all.
    pub fn is_initialized(&mut self) -> Result<bool, DriverError> {
        self.driver.borrow_mut().query_initialized(self.address)
    }

    /// Moves the plunger to its home position, unless the pump is initialized
    /// already. Doesn't wait for the move to finish.
    ///
    /// # Errors
    /// [`DriverError::DeviceUnresponsive`] if the pump doesn't become ready.
    pub fn initialize(&mut self) -> Result<(), DriverError> {
        let address = self.address;
        let mut driver = self.driver.borrow_mut();
        let initialized = driver
            .query_initialized(address)
            .map_err(|e| timeout_as(e, DriverError::DeviceUnresponsive(address)))?;
        if initialized {
            debug!("pump {} is initialized already", address);
            return Ok(());
        }
        driver
            .wait_ready(address)
            .map_err(|e| timeout_as(e, DriverError::DeviceUnresponsive(address)))?;
        driver.send(&Frame::new(
            address,
            [Directive::Initialize(self.config.initialisation_direction)],
        ))?;
        info!("initialising pump {}", address);
        Ok(())
    }

    //

    pub fn switch_valve(&self, valve: Valve) -> Directive {
        Directive::Valve(valve)
    }

    /// Returns the directive to move the plunger to the absolute position that
    /// holds `volume_ml`
    pub fn goto_position(&self, volume_ml: f64) -> Result<Directive, DriverError> {
        convert::volume_to_steps(&self.config, volume_ml).map(Directive::Goto)
    }

    /// Returns the directive to set the velocity for `rate`, `None` for
    /// [`FlowRate::Default`]
    pub fn pump_rate(&self, rate: FlowRate) -> Result<Option<Directive>, DriverError> {
        Ok(convert::rate_to_velocity(&self.config, rate)?.map(Directive::Velocity))
    }

    pub fn repeat(&self, n: u16) -> Result<Directive, DriverError> {
        Repeats::new(n).map(Directive::Repeat)
    }

    //

    /// Sends the given directives as a single frame once the pump is
    /// initialized and ready, then waits until it is done
    ///
    /// # Errors
    /// [`DriverError::NotInitialized`] or [`DriverError::NotReady`] if the
    /// preconditions aren't met, nothing is sent in that case.
    /// [`DriverError::Timeout`] if the pump doesn't finish within the
    /// completion bounds of the poll config.
    pub fn execute<D>(&mut self, directives: D) -> Result<(), DriverError>
    where
        D: IntoIterator<Item = Directive>,
    {
        let frame = Frame::new(self.address, directives);
        self.run(frame)
    }

    /// Moves one stroke volume from inlet to outlet (`"in"`) or from outlet to
    /// inlet (`"out"`), `repeats` times
    ///
    /// # Errors
    /// [`DriverError::InvalidDirection`] for any direction but `"in"` and
    /// `"out"`, before anything is sent. Otherwise see [`execute`][Pump::execute].
    pub fn transfer<D>(&mut self, direction: D, repeats: u16) -> Result<(), DriverError>
    where
        D: TryInto<Direction>,
        DriverError: From<D::Error>,
    {
        let direction = direction.try_into()?;
        let (from, to) = direction.valves();
        let directives = [
            self.switch_valve(from),
            self.goto_position(self.config.stroke_volume_ml)?,
            self.switch_valve(to),
            self.goto_position(0.0)?,
            self.repeat(repeats)?,
        ];
        info!(
            "pump {} is transferring from {:?} to {:?} {} times",
            self.address, from, to, repeats
        );
        self.execute(directives)?;
        info!("pump {} done", self.address);
        Ok(())
    }

    /// Moves the plunger to the absolute position holding `volume_ml` at `rate`
    pub fn set_position(&mut self, volume_ml: f64, rate: FlowRate) -> Result<(), DriverError> {
        let velocity = self.pump_rate(rate)?;
        let goto = self.goto_position(volume_ml)?;
        self.execute(velocity.into_iter().chain([goto]))
    }

    /// Sets the velocity of following moves. [`FlowRate::Default`] leaves the
    /// velocity as it is and doesn't send anything.
    pub fn set_rate(&mut self, rate: FlowRate) -> Result<(), DriverError> {
        match self.pump_rate(rate)? {
            Some(d) => self.execute([d]),
            None => Ok(()),
        }
    }

    /// Moves the plunger `steps` relative to where it is, at `half_steps_per_sec`
    /// and optionally repeated. Meant for callers that work in device units,
    /// like making the pump hum a frequency.
    pub fn move_relative(
        &mut self,
        half_steps_per_sec: u32,
        travel: Travel,
        steps: u32,
        repeats: Option<u16>,
    ) -> Result<(), DriverError> {
        let velocity = convert::velocity(&self.config, half_steps_per_sec)?;
        let steps = convert::steps(&self.config, steps)?;
        let repeat = repeats.map(|n| self.repeat(n)).transpose()?;
        self.execute(
            [Directive::Velocity(velocity), Directive::relative(travel, steps)]
                .into_iter()
                .chain(repeat),
        )
    }
}

impl<T: Transport> Debug for Pump<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pump {{ address: {}, config: {:?} }}",
            self.address, self.config
        )
    }
}

impl<T: Transport> Drop for Pump<T> {
    /// Removes the pump from the driver, so a new pump with the same address
    /// can be added
    fn drop(&mut self) {
        self.driver.borrow_mut().drop_pump(self.address);
    }
}
