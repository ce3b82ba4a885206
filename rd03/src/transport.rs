use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::debug;

use crate::error::Error;

/// Byte link to the sensor.
///
/// `read_byte` may return `None` when nothing arrived; callers check
/// `bytes_available` first when they must not wait.
pub trait Transport {
    fn open(&mut self, baud: u32) -> Result<(), Error>;
    fn write(&mut self, bytes: &[u8]) -> Result<usize, Error>;
    fn bytes_available(&mut self) -> Result<bool, Error>;
    fn read_byte(&mut self) -> Result<Option<u8>, Error>;
}

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// A serial device (`/dev/serial0`, `/dev/ttyUSB0`, ...) opened lazily by [`Transport::open`].
pub struct SerialTransport {
    path: String,
    timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            timeout: DEFAULT_READ_TIMEOUT,
            port: None,
        }
    }

    /// Per-read timeout of the underlying port.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, Error> {
        self.port.as_mut().ok_or(Error::NotOpen)
    }
}

impl Transport for SerialTransport {
    fn open(&mut self, baud: u32) -> Result<(), Error> {
        let port = serialport::new(&self.path, baud)
            .timeout(self.timeout)
            .open()?;
        // stale report frames from before the reconfigure
        port.clear(ClearBuffer::Input)?;
        debug!(path = %self.path, baud, "serial port open");
        self.port = Some(port);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        let port = self.port()?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(bytes.len())
    }

    fn bytes_available(&mut self) -> Result<bool, Error> {
        Ok(self.port()?.bytes_to_read()? > 0)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, Error> {
        let mut buf = [0u8; 1];
        match self.port()?.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory transport: queued receive bytes, recorded writes.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    pub baud: Option<u32>,
    pub rx: std::collections::VecDeque<u8>,
    pub written: Vec<Vec<u8>>,
}

#[cfg(test)]
impl MockTransport {
    pub fn with_rx(bytes: &[u8]) -> Self {
        Self {
            rx: bytes.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn queue(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }
}

#[cfg(test)]
impl Transport for MockTransport {
    fn open(&mut self, baud: u32) -> Result<(), Error> {
        self.baud = Some(baud);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        self.written.push(bytes.to_vec());
        Ok(bytes.len())
    }

    fn bytes_available(&mut self) -> Result<bool, Error> {
        Ok(!self.rx.is_empty())
    }

    fn read_byte(&mut self) -> Result<Option<u8>, Error> {
        Ok(self.rx.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn serial_transport_requires_open() {
        let mut transport = SerialTransport::new("/dev/null-rd03");
        assert!(!transport.is_open());
        assert!(matches!(transport.bytes_available(), Err(Error::NotOpen)));
        assert!(matches!(transport.read_byte(), Err(Error::NotOpen)));
        assert!(matches!(transport.write(&[0x00]), Err(Error::NotOpen)));
    }

    #[test]
    fn opening_missing_device_fails() {
        let mut transport = SerialTransport::new("/dev/does-not-exist-rd03");
        assert!(transport.open(115_200).is_err());
        assert!(!transport.is_open());
    }

    #[test]
    fn mock_round_trip() {
        let mut mock = MockTransport::with_rx(&[1, 2]);
        assert_eq!(mock.read_byte().unwrap(), Some(1));
        mock.queue(&[3]);
        assert_eq!(mock.read_byte().unwrap(), Some(2));
        assert!(mock.bytes_available().unwrap());
        assert_eq!(mock.read_byte().unwrap(), Some(3));
        assert!(!mock.bytes_available().unwrap());
        assert_eq!(mock.read_byte().unwrap(), None);
    }
}
