//! Command frames sent to the sensor while configuring it.
//!
//! Layout: `FD FC FB FA | len u16 LE | command word u16 LE | payload | 04 03 02 01`.
//! Parameter writes (command word `0x0007`) carry a u16 parameter id followed by a
//! u32 value; the value's low byte sits at [`PARAMETER_VALUE`].

use crate::config::SensorConfig;

pub const COMMAND_HEADER: [u8; 4] = [0xFD, 0xFC, 0xFB, 0xFA];
pub const COMMAND_END: [u8; 4] = [0x04, 0x03, 0x02, 0x01];

/// Offset of the parameter value inside a parameter-write frame.
pub const PARAMETER_VALUE: usize = 0x0A;

const OPEN_COMMAND_MODE: [u8; 14] = [
    0xFD, 0xFC, 0xFB, 0xFA, 0x04, 0x00, 0xFF, 0x00, 0x01, 0x00, 0x04, 0x03, 0x02, 0x01,
];
const CLOSE_COMMAND_MODE: [u8; 12] = [
    0xFD, 0xFC, 0xFB, 0xFA, 0x02, 0x00, 0xFE, 0x00, 0x04, 0x03, 0x02, 0x01,
];
const SET_MIN_DISTANCE: [u8; 18] = [
    0xFD, 0xFC, 0xFB, 0xFA, 0x08, 0x00, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04,
    0x03, 0x02, 0x01,
];
const SET_MAX_DISTANCE: [u8; 18] = [
    0xFD, 0xFC, 0xFB, 0xFA, 0x08, 0x00, 0x07, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04,
    0x03, 0x02, 0x01,
];
const SET_DELAY_TIME: [u8; 18] = [
    0xFD, 0xFC, 0xFB, 0xFA, 0x08, 0x00, 0x07, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04,
    0x03, 0x02, 0x01,
];
// mode 0x04 = reporting (binary presence + range frames)
const REPORTING_MODE: [u8; 18] = [
    0xFD, 0xFC, 0xFB, 0xFA, 0x08, 0x00, 0x12, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x04,
    0x03, 0x02, 0x01,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    OpenCommandMode,
    SetMinDistance(u8),
    SetMaxDistance(u8),
    SetDelay(u8),
    ReportingMode,
    CloseCommandMode,
}

impl Command {
    /// Encoded frame, ready for the wire.
    pub fn to_bytes(self) -> Vec<u8> {
        match self {
            Command::OpenCommandMode => OPEN_COMMAND_MODE.to_vec(),
            Command::SetMinDistance(code) => with_parameter(SET_MIN_DISTANCE, code),
            Command::SetMaxDistance(code) => with_parameter(SET_MAX_DISTANCE, code),
            Command::SetDelay(code) => with_parameter(SET_DELAY_TIME, code),
            Command::ReportingMode => REPORTING_MODE.to_vec(),
            Command::CloseCommandMode => CLOSE_COMMAND_MODE.to_vec(),
        }
    }
}

fn with_parameter(mut frame: [u8; 18], value: u8) -> Vec<u8> {
    frame[PARAMETER_VALUE] = value;
    frame.to_vec()
}

/// Commands `begin` transmits, in order.
///
/// The minimum distance is normally enforced host-side only; the sensor's
/// set-min-distance frame is included when `send_min_distance` is set.
pub fn configuration_sequence(config: &SensorConfig, send_min_distance: bool) -> Vec<Command> {
    let mut seq = vec![Command::OpenCommandMode];
    if send_min_distance {
        seq.push(Command::SetMinDistance(config.min_distance_code()));
    }
    seq.extend([
        Command::SetMaxDistance(config.max_distance_code()),
        Command::SetDelay(config.delay_code()),
        Command::ReportingMode,
        Command::CloseCommandMode,
    ]);
    seq
}
