//! Runtime settings for the monitor, read from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use rd03::SensorConfig;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Serial device the RD-03 is attached to.
    pub port: String,
    pub sensor: SensorConfig,
    /// How often a read is attempted.
    pub poll_interval: Duration,
    /// Time budget of one read before it is abandoned.
    pub read_budget: Duration,
    /// Directory for the CSV log. No file is written when unset.
    pub data_dir: Option<String>,
    pub flush_every: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            port: "/dev/serial0".to_string(),
            sensor: SensorConfig::default(),
            poll_interval: Duration::from_millis(100),
            read_budget: Duration::from_millis(500),
            data_dir: None,
            flush_every: 50,
        }
    }
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source. Missing keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let sensor = defaults.sensor;

        let min = parse(&lookup, "RD03_MIN_DISTANCE")?.unwrap_or(sensor.min_distance_code());
        let max = parse(&lookup, "RD03_MAX_DISTANCE")?.unwrap_or(sensor.max_distance_code());
        let delay = parse(&lookup, "RD03_DELAY")?.unwrap_or(sensor.delay_code());

        let poll_ms = parse::<u64, _>(&lookup, "RD03_POLL_MS")?;
        let budget_ms = parse::<u64, _>(&lookup, "RD03_READ_BUDGET_MS")?;
        let flush_every = parse(&lookup, "PRESENCE_FLUSH_EVERY")?.unwrap_or(defaults.flush_every);
        if flush_every == 0 {
            return Err(ConfigError::Zero("PRESENCE_FLUSH_EVERY"));
        }
        if poll_ms == Some(0) {
            return Err(ConfigError::Zero("RD03_POLL_MS"));
        }

        Ok(Self {
            port: lookup("RD03_PORT").unwrap_or(defaults.port),
            sensor: SensorConfig::new(min, max, delay),
            poll_interval: poll_ms.map(Duration::from_millis).unwrap_or(defaults.poll_interval),
            read_budget: budget_ms.map(Duration::from_millis).unwrap_or(defaults.read_budget),
            data_dir: lookup("PRESENCE_DATA_DIR").filter(|dir| !dir.is_empty()),
            flush_every,
        })
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
