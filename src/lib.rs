//! Driver for AHT10 humidity/temperature sensors on an I2C bus.
//!
//! [`Aht10`] owns a [`BusTransport`] and runs the init, trigger, poll and convert cycle. Command
//! encoding ([`SensorCommand`]) and frame decoding ([`RawFrame`]) are pure and work on bytes
//! only.

mod command;
mod config;
mod convert;
mod driver;
mod error;
mod frame;
mod report;
mod transport;

#[cfg(all(test, feature = "hw-tests"))]
mod hw_tests;

pub use command::{InitMode, InitVariant, SensorCommand};
pub use config::{Config, ConfigError, MIN_CYCLE_REST, SENSOR_ADDRESS};
pub use convert::{humidity_fraction, temperature_celsius, Measurement};
pub use driver::{Aht10, DriverState, RunSummary, StopSignal};
pub use error::*;
pub use frame::{Mode, RawFrame, RawReading, Status, FRAME_LEN};
pub use report::{Event, LogReporter, Reporter};
pub use transport::{BusTransport, HalBus, I2cBus, SharedBus, TRANSACTION_TIMEOUT};
pub use embedded_hal;
pub use i2c;
