use std::thread::sleep;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::command::configuration_sequence;
use crate::config::{SensorConfig, SessionOptions};
use crate::error::Error;
use crate::frame::{FrameDecoder, SensorReading};
use crate::transport::Transport;

// ------------------------------------------------------------------------------------------------
// Main driver struct
// ------------------------------------------------------------------------------------------------

pub struct RD03<T> {
    transport: T,
    decoder: FrameDecoder,
    options: SessionOptions,
    config: SensorConfig,
    reading: Option<SensorReading>,
}

impl<T: Transport> RD03<T> {
    // -----------------------------------------------------------------------------------------
    // ctor / accessors
    // -----------------------------------------------------------------------------------------

    pub fn new(transport: T) -> Self {
        Self::with_options(transport, SessionOptions::default())
    }

    pub fn with_options(transport: T, options: SessionOptions) -> Self {
        Self {
            transport,
            decoder: FrameDecoder::with_capacity(options.buffer_capacity),
            options,
            config: SensorConfig::default(),
            reading: None,
        }
    }

    /// Configuration in effect since the last `begin`.
    pub fn config(&self) -> SensorConfig {
        self.config
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Last decoded frame, `None` until the first one arrives.
    pub fn last_reading(&self) -> Option<SensorReading> {
        self.reading
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    // -----------------------------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------------------------

    /// Clamp and store the detection window, open the port and switch the sensor to
    /// reporting mode.
    ///
    /// * `min` / `max` – distance codes 0-15, 70 cm each.
    /// * `delay` – seconds (0-30) before an absent target is reported.
    pub fn begin(&mut self, min: u8, max: u8, delay: u8) -> Result<SensorConfig, Error> {
        let config = SensorConfig::new(min, max, delay);
        self.begin_with(config)?;
        Ok(config)
    }

    /// Same as [`begin`](Self::begin) with a prebuilt config.
    ///
    /// Commands are fire-and-forget: the settle delay stands in for reading acks.
    pub fn begin_with(&mut self, config: SensorConfig) -> Result<(), Error> {
        self.config = config;
        self.transport.open(self.options.baud_rate)?;
        sleep(self.options.boot_delay);

        for cmd in configuration_sequence(&config, self.options.send_min_distance) {
            let frame = cmd.to_bytes();
            debug!(?cmd, "sending command frame");
            let written = self.transport.write(&frame)?;
            if written != frame.len() {
                return Err(Error::ShortWrite { written, expected: frame.len() });
            }
            sleep(self.options.settle_delay);
        }

        info!(
            min_cm = config.min_distance_cm(),
            max_cm = config.max_distance_cm(),
            delay_s = config.delay_code(),
            "RD-03 in reporting mode"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------------------------

    /// Block until one full frame has been decoded.
    ///
    /// Starts from an empty buffer and spins on the transport with no timeout, so
    /// a silent sensor blocks forever; see [`read_timeout`](Self::read_timeout).
    /// Call at least every 100 ms so the sensor's reports do not pile up.
    pub fn read(&mut self) -> Result<SensorReading, Error> {
        self.decoder.reset();
        loop {
            if let Some(reading) = self.drain_available()? {
                return Ok(reading);
            }
            std::hint::spin_loop();
        }
    }

    /// Like [`read`](Self::read) but gives up with [`Error::Timeout`] once `budget`
    /// has elapsed. The stored reading is left untouched on timeout.
    pub fn read_timeout(&mut self, budget: Duration) -> Result<SensorReading, Error> {
        self.decoder.reset();
        let start = Instant::now();
        loop {
            if let Some(reading) = self.drain_available()? {
                return Ok(reading);
            }
            if start.elapsed() >= budget {
                debug!(buffered = self.decoder.len(), "read budget exhausted");
                return Err(Error::Timeout(budget));
            }
            std::hint::spin_loop();
        }
    }

    /// Consume whatever the transport has buffered without waiting.
    ///
    /// The decoder is not reset, so a frame split across calls still resolves.
    /// `Ok(None)` means no frame completed yet.
    pub fn poll(&mut self) -> Result<Option<SensorReading>, Error> {
        self.drain_available()
    }

    fn drain_available(&mut self) -> Result<Option<SensorReading>, Error> {
        while self.transport.bytes_available()? {
            let Some(byte) = self.transport.read_byte()? else {
                break;
            };
            if let Some(reading) = self.decoder.push(byte)? {
                self.reading = Some(reading);
                return Ok(Some(reading));
            }
        }
        Ok(None)
    }

    // -----------------------------------------------------------------------------------------
    // Public API (1:1 with the vendor library)
    // -----------------------------------------------------------------------------------------

    /// Someone present and inside the configured distance window.
    pub fn get_someone(&self) -> bool {
        let reading = self.reading.unwrap_or_default();
        reading.someone_present
            && self
                .options
                .distance_gate
                .admits(reading.distance_code, &self.config)
    }

    /// Raw distance byte of the last frame.
    pub fn get_distance(&self) -> u8 {
        self.reading.unwrap_or_default().distance_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, PARAMETER_VALUE};
    use crate::config::{DistanceGate, DEFAULT_BAUD};
    use crate::frame::{report_frame, DecoderState, BUFFER_CAPACITY};
    use crate::transport::MockTransport;
    use test_log::test;

    fn radar(rx: &[u8]) -> RD03<MockTransport> {
        RD03::with_options(
            MockTransport::with_rx(rx),
            SessionOptions::default().without_delays(),
        )
    }

    #[test]
    fn begin_clamps_before_transmission() {
        let mut radar = radar(&[]);
        let config = radar.begin(20, 3, 40).unwrap();
        assert_eq!(config, SensorConfig::new(15, 3, 30));
        assert_eq!(config.min_distance_code(), 15);
        assert_eq!(radar.config(), config);

        let written = &radar.transport().written;
        assert_eq!(written.len(), 5);
        assert_eq!(written[1][PARAMETER_VALUE], 3);
        assert_eq!(written[2][PARAMETER_VALUE], 30);
    }

    #[test]
    fn begin_opens_and_sends_sequence() {
        let mut radar = radar(&[]);
        radar.begin(1, 8, 2).unwrap();
        assert_eq!(radar.transport().baud, Some(DEFAULT_BAUD));

        let expected: Vec<Vec<u8>> = [
            Command::OpenCommandMode,
            Command::SetMaxDistance(8),
            Command::SetDelay(2),
            Command::ReportingMode,
            Command::CloseCommandMode,
        ]
        .into_iter()
        .map(Command::to_bytes)
        .collect();
        assert_eq!(radar.transport().written, expected);
    }

    #[test]
    fn begin_can_send_min_distance() {
        let options = SessionOptions {
            send_min_distance: true,
            ..SessionOptions::default().without_delays()
        };
        let mut radar = RD03::with_options(MockTransport::default(), options);
        radar.begin(4, 8, 2).unwrap();
        let written = &radar.transport().written;
        assert_eq!(written.len(), 6);
        assert_eq!(written[1], Command::SetMinDistance(4).to_bytes());
    }

    #[test]
    fn read_decodes_frame_after_noise() {
        let mut rx = vec![0x55; 30];
        rx.extend(report_frame(1, 5));
        let mut radar = radar(&rx);

        let reading = radar.read().unwrap();
        assert_eq!(reading, SensorReading { someone_present: true, distance_code: 5 });
        assert_eq!(radar.last_reading(), Some(reading));
        assert_eq!(radar.get_distance(), 5);
    }

    #[test]
    fn read_stops_at_first_frame() {
        let mut rx = report_frame(1, 5);
        rx.extend(report_frame(0, 6));
        let mut radar = radar(&rx);

        assert_eq!(radar.read().unwrap().distance_code, 5);
        assert_eq!(radar.transport().rx.len(), 45);
        assert_eq!(radar.read().unwrap().distance_code, 6);
    }

    #[test]
    fn read_resets_partial_state() {
        let mut radar = radar(&[]);
        // half a frame left over from an earlier poll
        radar.transport_mut().queue(&report_frame(1, 9)[..20]);
        assert_eq!(radar.poll().unwrap(), None);

        radar.transport_mut().queue(&report_frame(1, 11));
        assert_eq!(radar.read().unwrap().distance_code, 11);
    }

    #[test]
    fn get_someone_uses_scaled_window() {
        let mut radar = radar(&report_frame(1, 5));
        radar.begin(0, 1, 0).unwrap();
        radar.read().unwrap();
        // 5 <= 1 * 70
        assert!(radar.get_someone());

        let mut radar = self::radar(&report_frame(1, 5));
        radar.begin(1, 3, 0).unwrap();
        radar.read().unwrap();
        // 5 < 1 * 70
        assert!(!radar.get_someone());
        assert_eq!(radar.get_distance(), 5);
    }

    #[test]
    fn get_someone_requires_presence() {
        let mut radar = radar(&report_frame(0, 5));
        radar.begin(0, 15, 0).unwrap();
        radar.read().unwrap();
        assert!(!radar.get_someone());
    }

    #[test]
    fn code_gate_compares_unscaled() {
        let options = SessionOptions {
            distance_gate: DistanceGate::Code,
            ..SessionOptions::default().without_delays()
        };
        let mut radar = RD03::with_options(MockTransport::with_rx(&report_frame(1, 20)), options);
        radar.begin(0, 15, 0).unwrap();
        radar.read().unwrap();
        assert!(!radar.get_someone());
    }

    #[test]
    fn no_reading_yet() {
        let radar = radar(&[]);
        assert_eq!(radar.last_reading(), None);
        assert!(!radar.get_someone());
        assert_eq!(radar.get_distance(), 0);
    }

    #[test]
    fn read_timeout_on_silence() {
        let mut radar = radar(&[0x01, 0x02]);
        let err = radar.read_timeout(Duration::from_millis(5)).unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(radar.last_reading(), None);
    }

    #[test]
    fn read_timeout_returns_frame() {
        let mut radar = radar(&report_frame(1, 3));
        let reading = radar.read_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(reading.distance_code, 3);
    }

    #[test]
    fn stale_reading_survives_timeout() {
        let mut radar = radar(&report_frame(1, 8));
        radar.read().unwrap();
        assert!(radar.read_timeout(Duration::from_millis(1)).is_err());
        assert_eq!(radar.get_distance(), 8);
    }

    #[test]
    fn poll_resumes_across_calls() {
        let frame = report_frame(1, 17);
        let mut radar = radar(&[]);
        assert_eq!(radar.poll().unwrap(), None);

        for chunk in frame.chunks(10) {
            assert_eq!(radar.last_reading(), None);
            radar.transport_mut().queue(chunk);
            if let Some(reading) = radar.poll().unwrap() {
                assert_eq!(reading.distance_code, 17);
            }
        }
        assert_eq!(radar.get_distance(), 17);
    }

    #[test]
    fn overflow_is_surfaced_and_resets() {
        let mut rx = vec![0x00; BUFFER_CAPACITY + 1];
        rx.extend(report_frame(1, 4));
        let mut radar = radar(&rx);

        assert!(matches!(
            radar.read().unwrap_err(),
            Error::BufferOverflow { capacity: BUFFER_CAPACITY }
        ));
        assert!(radar.decoder.is_empty());
        assert_eq!(radar.decoder.state(), DecoderState::Searching);

        assert_eq!(radar.read().unwrap().distance_code, 4);
    }
}
