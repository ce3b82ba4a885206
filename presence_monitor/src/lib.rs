use std::error::Error;
use std::time::{SystemTime, UNIX_EPOCH};

use rd03::{SerialTransport, Transport, RD03};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use config::MonitorConfig;
use data::{PresenceLogger, PresenceSample, PresenceTracker, Transition};

pub mod config;
pub mod data;

/// Open the sensor on `config.port` and log presence until Ctrl-C.
pub async fn presence_monitor(config: MonitorConfig) -> Result<(), Box<dyn Error>> {
    let cancel = CancellationToken::new();
    let cloned_cancel = cancel.clone();

    // Spawn shutdown signal handler
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {e}");
        }
        info!("Shutdown signal received.");
        cancel.cancel();
    });

    let mut radar = RD03::new(SerialTransport::new(config.port.as_str()));
    let sensor = config.sensor;
    // begin() sleeps between command frames
    tokio::task::block_in_place(|| radar.begin_with(sensor))?;
    info!("RD-03 on {} configured.", config.port);

    let mut logger = match &config.data_dir {
        Some(dir) => Some(PresenceLogger::new(dir, config.flush_every)?),
        None => None,
    };

    tokio::select! {
        res = collect_readings(&mut radar, logger.as_mut(), &config) => {
            res?;
            info!("Sensor polling completed.");
        },
        _ = cloned_cancel.cancelled() => {
            info!("Received shutdown signal.");
        }
    }

    info!("Monitor stopped.");
    Ok(())
}

/// Poll the radar on `config.poll_interval`, logging transitions and samples.
///
/// Read timeouts and buffer overflows are logged and skipped; transport errors end
/// the loop.
pub async fn collect_readings<T: Transport>(
    radar: &mut RD03<T>,
    mut logger: Option<&mut PresenceLogger>,
    config: &MonitorConfig,
) -> Result<(), Box<dyn Error>> {
    let mut interval = tokio::time::interval(config.poll_interval);
    let mut tracker = PresenceTracker::default();

    loop {
        interval.tick().await;
        let reading = match tokio::task::block_in_place(|| radar.read_timeout(config.read_budget)) {
            Ok(reading) => reading,
            Err(e @ (rd03::Error::Timeout(_) | rd03::Error::BufferOverflow { .. })) => {
                warn!("RD-03 read failed: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let sample = PresenceSample::new(unix_seconds(), reading, radar.get_someone());
        debug!(?sample, "presence sample");
        match tracker.update(&sample) {
            Some(Transition::Arrived { distance_code, .. }) => {
                info!("Someone arrived (distance {distance_code}).")
            }
            Some(Transition::Left { present_for_s, .. }) => {
                info!("Presence cleared after {present_for_s} s.")
            }
            None => {}
        }
        if let Some(logger) = logger.as_deref_mut() {
            logger.append(sample)?;
        }
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
