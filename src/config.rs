use std::time::Duration;

use crate::command::InitVariant;

/// Default 7-bit bus address of the sensor.
pub const SENSOR_ADDRESS: u8 = 0x38;

/// The vendor advises against measuring more often than this.
pub const MIN_CYCLE_REST: Duration = Duration::from_millis(2000);

/// Timing and protocol settings for one sensor instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub address: u8,
    pub init: InitVariant,
    /// Settling time before the first command after power-on.
    pub power_on_delay: Duration,
    /// Pause between the init command and the confirming status read. `None` skips it.
    pub post_init_delay: Option<Duration>,
    pub poll_interval: Duration,
    /// Rest between the end of one measurement cycle and the next trigger.
    pub cycle_rest: Duration,
    pub soft_reset_delay: Duration,
    /// Busy status reads tolerated before giving up with `MeasurementTimeout`.
    pub max_busy_polls: u32,
    /// Consecutive `TransportNotReady` failures that force a full re-initialization.
    pub reinit_after_not_ready: u32,
    /// Long sleeps are split into slices of at most this length; the stop signal is checked
    /// between slices.
    pub sleep_slice: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: SENSOR_ADDRESS,
            init: InitVariant::default(),
            power_on_delay: Duration::from_millis(50),
            post_init_delay: Some(Duration::from_millis(350)),
            poll_interval: Duration::from_millis(80),
            cycle_rest: Duration::from_millis(5000),
            soft_reset_delay: Duration::from_millis(20),
            max_busy_polls: 20,
            reinit_after_not_ready: 2,
            sleep_slice: Duration::from_millis(100),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: cannot parse {value:?} as {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{var}: must be greater than zero")]
    Zero { var: &'static str },
}

fn parse_u32(var: &'static str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.into(),
        expected: "an unsigned integer",
    })
}

fn parse_millis(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    parse_u32(var, value).map(|ms| Duration::from_millis(u64::from(ms)))
}

fn parse_address(var: &'static str, value: &str) -> Result<u8, ConfigError> {
    let value_trimmed = value.trim();
    let parsed = match value_trimmed
        .strip_prefix("0x")
        .or_else(|| value_trimmed.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => value_trimmed.parse().ok(),
    };
    match parsed {
        Some(addr) if addr <= 0x7F => Ok(addr),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.into(),
            expected: "a 7-bit i2c address",
        }),
    }
}

impl Config {
    /// Overlays `AHT10_*` variables from the process environment on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_vars(std::env::vars())
    }

    /// Overlays recognised `AHT10_*` keys; anything else is ignored.
    pub fn with_vars<K, V>(
        mut self,
        vars: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, ConfigError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref();
            match key.as_ref() {
                "AHT10_ADDRESS" => self.address = parse_address("AHT10_ADDRESS", value)?,
                "AHT10_INIT_VARIANT" => {
                    self.init =
                        InitVariant::from_name(value).ok_or_else(|| ConfigError::Invalid {
                            var: "AHT10_INIT_VARIANT",
                            value: value.into(),
                            expected: "one of normal, cycle, command, legacy",
                        })?
                }
                "AHT10_POWER_ON_DELAY_MS" => {
                    self.power_on_delay = parse_millis("AHT10_POWER_ON_DELAY_MS", value)?
                }
                "AHT10_POST_INIT_DELAY_MS" => {
                    let delay = parse_millis("AHT10_POST_INIT_DELAY_MS", value)?;
                    self.post_init_delay = (!delay.is_zero()).then_some(delay);
                }
                "AHT10_POLL_INTERVAL_MS" => {
                    self.poll_interval = parse_millis("AHT10_POLL_INTERVAL_MS", value)?
                }
                "AHT10_CYCLE_REST_MS" => {
                    self.cycle_rest = parse_millis("AHT10_CYCLE_REST_MS", value)?
                }
                "AHT10_MAX_BUSY_POLLS" => {
                    self.max_busy_polls = parse_u32("AHT10_MAX_BUSY_POLLS", value)?;
                    if self.max_busy_polls == 0 {
                        return Err(ConfigError::Zero {
                            var: "AHT10_MAX_BUSY_POLLS",
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(self)
    }
}
