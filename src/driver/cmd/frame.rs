
use super::{
    super::{
        map,
        parse::{parse_byte, parse_enum_value, reply_start, skip_marker, PResult},
        DriverError,
    },
    Directive,
};
use crate::util::ensure;
use nom::{
    bytes::complete::{tag, take_until},
    sequence::{preceded, terminated, tuple},
    Parser,
};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::fmt::Display;

// unfortunately, due to rustfmt not having the blank_lines_upper_bound feature
// stable yet, we gotta put comments in between the different sections. otherwise
// its just too much

//

/// Holds the address of a pump on the bus
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, PartialOrd, Ord)]
pub struct PumpAddress(u8);

impl PumpAddress {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 9;

    /// # Errors
    /// Returns [`DriverError::InvalidAddress`] if `address` isn't between
    /// [`PumpAddress::MIN`] and [`PumpAddress::MAX`]
    pub fn new(address: u8) -> Result<Self, DriverError> {
        ensure!(
            address >= Self::MIN && address <= Self::MAX,
            DriverError::InvalidAddress(address)
        );
        Ok(Self(address))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for PumpAddress {
    type Error = DriverError;

    fn try_from(a: u8) -> Result<Self, Self::Error> {
        Self::new(a)
    }
}

impl From<PumpAddress> for u8 {
    fn from(a: PumpAddress) -> Self {
        a.0
    }
}

impl Display for PumpAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//

/// A complete message to one pump
///
/// A frame can't be changed once it's built, to send something else a new
/// one has to be built.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Frame {
    address: PumpAddress,
    directives: Vec<Directive>,
}

impl Frame {
    pub fn new<D>(address: PumpAddress, directives: D) -> Self
    where
        D: IntoIterator<Item = Directive>,
    {
        Frame {
            address,
            directives: directives.into_iter().collect(),
        }
    }

    /// Frame asking for the status byte
    pub fn query(address: PumpAddress) -> Self {
        Self::new(address, [Directive::Query])
    }

    /// Frame asking whether the pump is initialized
    pub fn report_initialized(address: PumpAddress) -> Self {
        Self::new(address, [Directive::Report(map::REPORT_INITIALIZED)])
    }

    pub fn address(&self) -> PumpAddress {
        self.address
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", map::FRAME_START, self.address)?;
        for d in &self.directives {
            write!(f, "{}", d)?;
        }
        write!(f, "{}{}", map::EXECUTE, map::FRAME_END)
    }
}

//

/// A reply of a pump, which always comes from the master address `0`
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Reply {
    pub status: u8,
    pub data: Vec<u8>,
}

impl Reply {
    pub(crate) fn parse(s: &[u8]) -> PResult<'_, Self> {
        preceded(
            reply_start,
            tuple((
                parse_byte,
                terminated(take_until(b"\x03" as &[u8]), tag(b"\x03" as &[u8])),
            )),
        )
        .map(|(status, data): (u8, &[u8])| Reply {
            status,
            data: data.to_vec(),
        })
        .parse(s)
    }
}

//

/// Error codes in the low nibble of the status byte
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, FromPrimitive)]
pub enum ErrorCode {
    InitializationError = 1,
    InvalidCommand = 2,
    InvalidOperand = 3,
    InvalidCommandSequence = 4,
    EepromFailure = 6,
    NotInitialized = 7,
    PlungerOverload = 9,
    ValveOverload = 10,
    PlungerMoveNotAllowed = 11,
    CommandOverflow = 15,
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({})", self, *self as u8)
    }
}

//

/// State of a pump as told by a single status byte
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum ReadinessState {
    Busy,
    Idle,
    IdleWithError(ErrorCode),
}

impl ReadinessState {
    const ALWAYS_SET: u8 = 0x40;
    const READY: u8 = 0x20;
    const ERROR: u8 = 0x0f;

    /// Decodes a status byte. Bit 6 is always set, bit 5 is set while the pump
    /// is idle and the low nibble holds an error code.
    ///
    /// Returns `None` if the byte isn't a status byte or the error code is
    /// unknown.
    pub fn from_status(status: u8) -> Option<Self> {
        if status & Self::ALWAYS_SET == 0 {
            return None;
        }
        if status & Self::READY == 0 {
            return Some(Self::Busy);
        }
        match status & Self::ERROR {
            0 => Some(Self::Idle),
            code => ErrorCode::from_u8(code).map(Self::IdleWithError),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

//

/// Answer to the initialization report
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, FromPrimitive)]
pub enum InitState {
    Uninitialized,
    Initialized,
}

impl InitState {
    /// Parses the digit right after the first ready marker of a reply
    pub(crate) fn parse(s: &[u8]) -> PResult<'_, Self> {
        preceded(skip_marker, |s| {
            parse_enum_value(s, parse_byte, |d: u8| {
                d.checked_sub(b'0').and_then(InitState::from_u8)
            })
        })
        .parse(s)
    }
}

impl From<InitState> for bool {
    fn from(s: InitState) -> Self {
        matches!(s, InitState::Initialized)
    }
}
