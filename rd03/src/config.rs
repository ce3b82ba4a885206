use std::time::Duration;

use crate::frame::BUFFER_CAPACITY;

/// UART speed the RD-03 ships with.
pub const DEFAULT_BAUD: u32 = 115_200;

/// One distance code step, in centimetres.
pub const DISTANCE_UNIT_CM: u16 = 70;
pub const MAX_DISTANCE_CODE: u8 = 15;
pub const MAX_DELAY_CODE: u8 = 30;

/// Detection window and absence delay, already clamped to the sensor's ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SensorConfig {
    min_distance_code: u8,
    max_distance_code: u8,
    delay_code: u8,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self::new(0, MAX_DISTANCE_CODE, 5)
    }
}

impl SensorConfig {
    /// Out-of-range values saturate: distances at 15 (10.5 m), delay at 30 s.
    pub fn new(min_distance_code: u8, max_distance_code: u8, delay_code: u8) -> Self {
        Self {
            min_distance_code: min_distance_code.min(MAX_DISTANCE_CODE),
            max_distance_code: max_distance_code.min(MAX_DISTANCE_CODE),
            delay_code: delay_code.min(MAX_DELAY_CODE),
        }
    }

    pub fn min_distance_code(&self) -> u8 {
        self.min_distance_code
    }

    pub fn max_distance_code(&self) -> u8 {
        self.max_distance_code
    }

    pub fn delay_code(&self) -> u8 {
        self.delay_code
    }

    pub fn min_distance_cm(&self) -> u16 {
        u16::from(self.min_distance_code) * DISTANCE_UNIT_CM
    }

    pub fn max_distance_cm(&self) -> u16 {
        u16::from(self.max_distance_code) * DISTANCE_UNIT_CM
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(u64::from(self.delay_code))
    }
}

/// How `get_someone` compares the reported distance against the configured window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DistanceGate {
    /// Raw distance byte against `code * 70`, as the vendor Arduino library does.
    #[default]
    Scaled,
    /// Raw distance byte against the codes themselves.
    Code,
}

impl DistanceGate {
    pub fn admits(self, distance: u8, config: &SensorConfig) -> bool {
        let (lo, hi) = match self {
            DistanceGate::Scaled => (config.min_distance_cm(), config.max_distance_cm()),
            DistanceGate::Code => (
                u16::from(config.min_distance_code),
                u16::from(config.max_distance_code),
            ),
        };
        (lo..=hi).contains(&u16::from(distance))
    }
}

/// Session behaviour that is not sent to the sensor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    pub baud_rate: u32,
    /// Wait after opening the port before the first command.
    pub boot_delay: Duration,
    /// Wait after every command frame. The sensor sends acks but they are not read.
    pub settle_delay: Duration,
    /// Also transmit set-min-distance during `begin`.
    pub send_min_distance: bool,
    pub distance_gate: DistanceGate,
    pub buffer_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD,
            boot_delay: Duration::from_millis(100),
            settle_delay: Duration::from_millis(150),
            send_min_distance: false,
            distance_gate: DistanceGate::Scaled,
            buffer_capacity: BUFFER_CAPACITY,
        }
    }
}

impl SessionOptions {
    /// No boot or settle waits. Meant for in-memory transports.
    pub fn without_delays(mut self) -> Self {
        self.boot_delay = Duration::ZERO;
        self.settle_delay = Duration::ZERO;
        self
    }
}
