
use std::{
    cell::RefCell,
    collections::VecDeque,
    io::{self, Read, Write},
    rc::Rc,
};

// used to mock the serial line of a pump to test the driver
// the idea is that read holds the replies the pump would send, one chunk per
// read call, and write records every frame the driver sent. once a chunk is
// read it is removed from the queue. reading from an empty queue behaves like
// a serial port whose read timeout expired, so polling loops can be tested
// without a pump answering.
//
// chunks queued with add_stale are input that arrived before the driver's
// next write, clear_input drops those and keeps the replies to come
//
// clones share the same buffers, so a test can keep one clone and hand the
// other to the driver
//
// don't be alarmed if you think it's slow or inefficient or anything, it doesn't
// need to be fast nor pretty nor efficient, its just for testing. it needs to be
// easy
pub struct Interface {
    read: Rc<RefCell<VecDeque<Chunk>>>,
    written: Rc<RefCell<Vec<Vec<u8>>>>,
}

struct Chunk {
    data: Vec<u8>,
    stale: bool,
}

impl Read for Interface {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut q = self.read.borrow_mut();
        let chunk = match q.front_mut() {
            Some(c) => &mut c.data,
            None => return Err(io::Error::new(io::ErrorKind::TimedOut, "read was empty")),
        };
        let n = buf.len().min(chunk.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        chunk.drain(..n);
        if chunk.is_empty() {
            q.pop_front();
        }
        Ok(n)
    }
}

impl Write for Interface {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.borrow_mut().push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Clone for Interface {
    fn clone(&self) -> Self {
        Interface {
            read: self.read.clone(),
            written: self.written.clone(),
        }
    }
}

impl Default for Interface {
    fn default() -> Self {
        Self::new()
    }
}

impl Interface {
    pub fn new() -> Self {
        Interface {
            read: Rc::new(RefCell::new(VecDeque::new())),
            written: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Queues `buf` to be returned by a later read
    pub fn add_read(&mut self, buf: &[u8]) {
        self.read.borrow_mut().push_back(Chunk {
            data: buf.to_vec(),
            stale: false,
        })
    }

    /// Queues `buf` as input that is already waiting on the line, so
    /// [`clear_input`][Interface::clear_input] throws it away
    pub fn add_stale(&mut self, buf: &[u8]) {
        self.read.borrow_mut().push_back(Chunk {
            data: buf.to_vec(),
            stale: true,
        })
    }

    /// Drops all stale input, like flushing the receive buffer of a port
    pub fn clear_input(&mut self) -> io::Result<()> {
        self.read.borrow_mut().retain(|c| !c.stale);
        Ok(())
    }

    /// Queues a complete reply frame from the master address `0` with the
    /// given status byte and data, terminated like the pump terminates them
    pub fn add_reply(&mut self, status: u8, data: &[u8]) {
        let mut frame = b"/0".to_vec();
        frame.push(status);
        frame.extend_from_slice(data);
        frame.extend_from_slice(b"\x03\r\n");
        self.add_read(&frame)
    }

    /// Queues a reply to a readiness query saying the pump is idle
    pub fn add_ready(&mut self) {
        self.add_reply(b'`', b"")
    }

    /// Queues a reply to a readiness query saying the pump is busy
    pub fn add_busy(&mut self) {
        self.add_reply(b'@', b"")
    }

    /// Queues a reply to the initialization report
    pub fn add_initialized(&mut self, initialized: bool) {
        self.add_reply(b'`', if initialized { b"1" } else { b"0" })
    }

    /// Returns every write the driver made so far, one entry per write call
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.written.borrow().clone()
    }

    /// Returns every write concatenated
    pub fn written_bytes(&self) -> Vec<u8> {
        self.written.borrow().concat()
    }

    pub fn write_count(&self) -> usize {
        self.written.borrow().len()
    }

    /// Returns true if all queued replies have been read
    pub fn is_empty(&self) -> bool {
        self.read.borrow().is_empty()
    }
}
