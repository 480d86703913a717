//! Byte-stream transport abstraction.
//!
//! The protocol engine only requires timeout-bounded reads and an unbounded
//! write; everything else (port configuration, buffering, platform quirks)
//! stays behind this trait. Timeouts are NOT errors: a read that runs out of
//! time returns the bytes that did arrive, possibly none. A hard I/O failure
//! is an `Err`.

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};

/// A timeout-bounded byte stream.
pub trait Transport {
    /// Read up to `buf.len()` bytes. Returns the number of bytes read, which
    /// is fewer than requested (possibly zero) when the per-call timeout
    /// expires first.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Read one line, including its terminator. Returns whatever arrived
    /// before the timeout; an empty vec means nothing did.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;

    /// Write the whole buffer. No timeout applies.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
}

/// Read exactly `len` bytes, or report a timeout.
///
/// Returns `None` when the transport yielded fewer bytes than requested; the
/// partial data is discarded, matching the protocol rule that no partial
/// frame state survives across calls.
pub fn read_full<T: Transport + ?Sized>(
    transport: &mut T,
    len: usize,
) -> io::Result<Option<Vec<u8>>> {
    let mut buf = vec![0u8; len];
    let n = transport.read(&mut buf)?;
    if n < len {
        return Ok(None);
    }
    Ok(Some(buf))
}

/// [`Transport`] implementation over a serial port.
///
/// Mirrors the timeout discipline the engine expects: `read` keeps pulling
/// from the port until the buffer is full or a read times out, then reports
/// how far it got.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open a serial port at the given baud rate with a per-read timeout,
    /// discarding anything the module queued before we attached.
    pub fn open(path: &str, baud: u32, timeout: Duration) -> io::Result<Self> {
        let port = serialport::new(path, baud)
            .timeout(timeout)
            .open()
            .map_err(io::Error::from)?;
        port.clear(ClearBuffer::Input).map_err(io::Error::from)?;
        Ok(SerialTransport { port })
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::TimedOut => break,
                Err(err) => return Err(err),
            }
        }
        Ok(filled)
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut line = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::TimedOut => break,
                Err(err) => return Err(err),
            }
        }
        Ok(line)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.port.write_all(buf)
    }
}
