//! Driver for the **Ai‑Thinker RD‑03 mm‑Wave presence radar**
//!
//! A *blocking*, `std`‑based Rust interface to the RD‑03 over a UART (`/dev/serial0`,
//! `/dev/ttyAMA0`, USB serial adapters, …) using the
//! [`serialport`](https://crates.io/crates/serialport) crate.
//!
//! The sensor is switched into its *reporting* mode, in which it streams a short binary
//! packet about every 100 ms carrying a presence flag and a coarse range. The driver
//! finds those packets in the raw byte stream and keeps the last one:
//!
//! ```ignore
//! use rd03::{RD03, SerialTransport};
//!
//! let mut radar = RD03::new(SerialTransport::new("/dev/serial0"));
//! radar.begin(0, 6, 5)?;            // window 0–4.2 m, 5 s absence delay
//!
//! loop {
//!     radar.read()?;                // blocks until one frame is decoded
//!     println!("{} {}", radar.get_someone(), radar.get_distance());
//! }
//! ```
//!
//! ---
//! # High‑level contents
//! * **[`RD03`]** – owns the transport, the sensor configuration and the last reading.
//! * **[`FrameDecoder`]** – header/trailer state machine, one byte per call, resumable.
//! * **[`Command`]** – the fixed configuration frames sent by `begin`.
//! * **[`Transport`]** – the byte link; [`SerialTransport`] for real hardware.
//! * **Error handling** – one [`Error`] enum wrapping `std::io::Error` and
//!   `serialport::Error` plus protocol errors (`BufferOverflow`, `Timeout`).
//!
//! ## Differences from the vendor Arduino library
//! | Arduino                              | Rust                                                   |
//! |--------------------------------------|--------------------------------------------------------|
//! | `while(start_reading)` busy loop      | Same by default, plus `read_timeout` and `poll`        |
//! | Unchecked writes past the buffer      | `BufferOverflow`, decoder resynchronises               |
//! | `uint8_t` buffer index               | `usize`, capacity 512                                  |
//! | `_max < 0` clamp on unsigned         | Saturating clamp on the 0‑15 / 0‑30 ranges             |
//! | Globals on the class                 | One owned `RD03<T>` per sensor                         |
//!
//! `get_someone` still compares the raw distance byte against thresholds scaled by
//! 70 cm, as the vendor library does. [`DistanceGate::Code`] compares unscaled instead.

mod command;
mod config;
mod error;
mod frame;
mod session;
mod transport;

pub use command::{
    configuration_sequence, Command, COMMAND_END, COMMAND_HEADER, PARAMETER_VALUE,
};
pub use config::{
    DistanceGate, SensorConfig, SessionOptions, DEFAULT_BAUD, DISTANCE_UNIT_CM,
    MAX_DELAY_CODE, MAX_DISTANCE_CODE,
};
pub use error::Error;
pub use frame::{
    DecoderState, FrameDecoder, SensorReading, BUFFER_CAPACITY, FE_LAST, FH_LAST, FRAME_END,
    FRAME_HEADER, MIN_FRAME_LEN, RANGE_OFFSET, REPORT_FRAME_LEN, SOMEONE_OFFSET,
};
pub use session::RD03;
pub use transport::{SerialTransport, Transport};
