use std::time::Duration;

/// Everything that can go wrong talking to an RD-03.
///
/// Malformed frames are not represented here: the decoder drops them and keeps
/// scanning, so the caller only ever sees conditions it can act on.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serial-port error: {0}")]
    SerialPort(#[from] serialport::Error),
    #[error("transport used before it was opened")]
    NotOpen,
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
    #[error("no complete frame within {0:?}")]
    Timeout(Duration),
    #[error("frame buffer full ({capacity} bytes) without a complete frame")]
    BufferOverflow { capacity: usize },
}
