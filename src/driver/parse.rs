use super::map;
use nom::{
    bytes::complete::{tag, take, take_until},
    sequence::preceded,
    IResult, Parser,
};
use std::fmt::Debug;
use thiserror::Error;

/// Gets thrown when a reply of a pump can't be parsed
#[derive(Error, Debug)]
pub enum ParseError<I: Debug> {
    /// Gets thrown when a value in a reply doesn't have a matching enum variant
    #[error("Invalid Value while Parsing")]
    InvalidValue,
    /// Wrapper around [`nom::error::Error`]
    #[error("nom error: {0:?}")]
    NomError(nom::error::Error<I>),
}

impl<I: Debug> nom::error::ParseError<I> for ParseError<I> {
    fn from_error_kind(input: I, kind: nom::error::ErrorKind) -> Self {
        Self::NomError(nom::error::Error::from_error_kind(input, kind))
    }

    /// basically copied from nom::error::Error::append
    fn append(_: I, _: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

impl<I: Debug> From<nom::error::Error<I>> for ParseError<I> {
    fn from(e: nom::error::Error<I>) -> Self {
        Self::NomError(e)
    }
}

pub(super) type PResult<'a, O> = IResult<&'a [u8], O, ParseError<&'a [u8]>>;

const MARKER: &[u8] = &[map::READY_MARKER];

/// Reads a single byte
pub(super) fn parse_byte(s: &[u8]) -> PResult<'_, u8> {
    take(1usize).map(|b: &[u8]| b[0]).parse(s)
}

/// Skips everything up to and including the first ready marker
pub(super) fn skip_marker(s: &[u8]) -> PResult<'_, &[u8]> {
    preceded(take_until(MARKER), tag(MARKER)).parse(s)
}

/// Skips anything before the frame start (pumps sometimes send a leading
/// `0xff` after power up) and the master address `0` replies come from
pub(super) fn reply_start(s: &[u8]) -> PResult<'_, &[u8]> {
    preceded(take_until(map::FRAME_START.as_bytes()), tag(b"/0" as &[u8])).parse(s)
}

#[inline]
pub(super) fn parse_enum_value<'a, P, C, O, O2>(
    s: &'a [u8],
    mut parser: P,
    constructor: C,
) -> PResult<'a, O2>
where
    P: FnMut(&'a [u8]) -> PResult<'a, O>,
    C: Fn(O) -> Option<O2>,
{
    let (rem, res) = parser(s)?;
    Ok((
        rem,
        constructor(res).ok_or(nom::Err::Error(ParseError::InvalidValue))?,
    ))
}
