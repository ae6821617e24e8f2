//! The byte level connection to the pumps.
//!
//! A [`Transport`] knows nothing about frames except that a reply ends with a
//! line feed. [`SerialTransport`] is what's used with real pumps,
//! [`StreamTransport`] wraps anything that is [`Read`] + [`Write`], for example
//! a TCP connection to a serial device server or a mocked interface in tests.


use log::info;
use serialport::{ClearBuffer, SerialPort};
use std::{
    fmt::Debug,
    io::{self, BufRead, BufReader, Read, Write},
    net::TcpStream,
    time::Duration,
};
use thiserror::Error;

/// Baud rate the pumps ship with
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// How long a read waits for a reply by default
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Errors of the connection itself
#[derive(Error, Debug)]
pub enum TransportError {
    /// Thrown when reading or writing before [`Transport::open`] or after
    /// [`Transport::close`]
    #[error("connection is not open")]
    NotOpen,
    /// Wrapper around [`io::Error`]
    #[error(transparent)]
    IoError(#[from] io::Error),
    /// Wrapper around [`serialport::Error`]
    #[error(transparent)]
    SerialPortError(#[from] serialport::Error),
}

/// A connection to a bus with one or more pumps on it
pub trait Transport {
    fn open(&mut self) -> Result<(), TransportError>;

    /// Closes the connection. Closing a closed connection does nothing.
    fn close(&mut self) -> Result<(), TransportError>;

    fn is_open(&self) -> bool;

    /// Discards everything that was received but not read yet, then writes
    /// `frame` completely
    fn write_frame(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Reads until and including the next `\n`. If `timeout` passes first,
    /// whatever was read until then is returned, which might be nothing.
    fn read_line(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError>;
}

// read errors that just mean the timeout passed
fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

fn read_line_from<R: BufRead>(reader: &mut R) -> Result<Vec<u8>, TransportError> {
    // size chosen more or less randomly, should fit most replies
    let mut buf = Vec::with_capacity(32);
    match reader.read_until(b'\n', &mut buf) {
        Ok(_) => Ok(buf),
        Err(e) if is_timeout(&e) => Ok(buf),
        Err(e) => Err(e.into()),
    }
}

// throws away what the bufreader already pulled from the interface
fn discard_buffered<R: Read>(reader: &mut BufReader<R>) {
    let n = reader.buffer().len();
    reader.consume(n);
}

//

/// A serial port, opened on [`open`][Transport::open] and closed on
/// [`close`][Transport::close] or when dropped
///
/// # Examples
/// ```no_run
/// # use tricontinent_pump_driver::{SerialTransport, Transport};
/// let mut port = SerialTransport::new("/dev/ttyUSB0", 9600);
/// port.open().unwrap();
/// port.write_frame(b"/1QR\r").unwrap();
/// ```
pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    // wrap into bufreader so receiving until '\n' is easier
    port: Option<BufReader<Box<dyn SerialPort>>>,
}

impl SerialTransport {
    pub fn new<P: Into<String>>(path: P, baud_rate: u32) -> Self {
        SerialTransport {
            path: path.into(),
            baud_rate,
            port: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn port(&mut self) -> Result<&mut BufReader<Box<dyn SerialPort>>, TransportError> {
        self.port.as_mut().ok_or(TransportError::NotOpen)
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        if self.port.is_some() {
            return Ok(());
        }
        let port = serialport::new(self.path.as_str(), self.baud_rate)
            .timeout(DEFAULT_READ_TIMEOUT)
            .open()?;
        self.port = Some(BufReader::new(port));
        info!("opened connection on port {}", self.path);
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        // dropping the port closes it
        if self.port.take().is_some() {
            info!("connection on port {} closed", self.path);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        let port = self.port()?;
        port.get_ref().clear(ClearBuffer::Input)?;
        discard_buffered(port);
        let iface = port.get_mut();
        iface.write_all(frame)?;
        iface.flush()?;
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let port = self.port()?;
        port.get_mut().set_timeout(timeout)?;
        read_line_from(port)
    }
}

impl Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SerialTransport {{ path: {:?}, baud_rate: {}, open: {} }}",
            self.path,
            self.baud_rate,
            self.is_open()
        )
    }
}

//

/// Throws away whatever input is waiting on a stream
pub type ClearInput<I> = fn(&mut I) -> io::Result<()>;

/// Any byte stream used as a bus
///
/// The stream is connected already, [`open`][Transport::open] and
/// [`close`][Transport::close] only decide whether it may be used. The timeout
/// given to [`read_line`][Transport::read_line] can't be applied to an arbitrary
/// stream, its own read timeout (e.g. [`std::net::TcpStream::set_read_timeout`])
/// is used instead.
///
/// An arbitrary stream can't be asked for the input that is waiting on it, so
/// a transport made with [`new`][StreamTransport::new] only discards what it
/// has buffered itself before a write. A late reply still in the stream is then
/// read as the answer to the next frame. Use
/// [`with_input_clear`][StreamTransport::with_input_clear] or
/// [`tcp`][StreamTransport::tcp] to discard that too.
pub struct StreamTransport<I: Read + Write> {
    stream: BufReader<I>,
    open: bool,
    clear_input: Option<ClearInput<I>>,
}

impl<I: Read + Write> StreamTransport<I> {
    pub fn new(stream: I) -> Self {
        StreamTransport {
            stream: BufReader::new(stream),
            open: false,
            clear_input: None,
        }
    }

    /// `clear_input` is called on the stream before every write
    pub fn with_input_clear(stream: I, clear_input: ClearInput<I>) -> Self {
        StreamTransport {
            clear_input: Some(clear_input),
            ..Self::new(stream)
        }
    }

    pub fn into_inner(self) -> I {
        self.stream.into_inner()
    }
}

impl<I: Read + Write> Transport for StreamTransport<I> {
    fn open(&mut self) -> Result<(), TransportError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        discard_buffered(&mut self.stream);
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        discard_buffered(&mut self.stream);
        let iface = self.stream.get_mut();
        if let Some(clear) = self.clear_input {
            clear(iface)?;
        }
        iface.write_all(frame)?;
        iface.flush()?;
        Ok(())
    }

    fn read_line(&mut self, _timeout: Duration) -> Result<Vec<u8>, TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        read_line_from(&mut self.stream)
    }
}

impl StreamTransport<TcpStream> {
    /// A serial device server reached over TCP
    pub fn tcp(stream: TcpStream) -> Self {
        Self::with_input_clear(stream, drain_tcp)
    }
}

// reads without blocking until nothing is left
fn drain_tcp(stream: &mut TcpStream) -> io::Result<()> {
    stream.set_nonblocking(true)?;
    let mut buf = [0u8; 64];
    let drained = loop {
        match stream.read(&mut buf) {
            // peer closed, the next write will tell
            Ok(0) => break Ok(()),
            Ok(_) => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => break Err(e),
        }
    };
    stream.set_nonblocking(false)?;
    drained
}

impl<I: Read + Write> Debug for StreamTransport<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StreamTransport {{ open: {} }}", self.open)
    }
}
