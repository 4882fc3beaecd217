//! Reads an AHT10 on a Linux I2C bus every few seconds and logs the results.
//!
//! ```text
//! $ aht10-monitor /dev/i2c-1 3
//! INFO aht10_monitor: reading humidity_percent=41.2 temperature_celsius=22.7 provisional=false
//! ```
//!
//! The optional second argument stops after that many readings. Settings come from `AHT10_*`
//! variables, optionally in a `.env` file; `RUST_LOG` controls verbosity.
//! Build with `cargo build --features linux`.

use std::error::Error;
use std::sync::mpsc::channel;
use std::thread;

use aht10_monitor::{Aht10, Config, Event, HalBus, LogReporter, Reporter};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = match std::env::args().nth(1) {
        Some(val) => val,
        None => return Err("Missing argument: i2c device, e.g. /dev/i2c-1".into()),
    };
    let max_readings = match std::env::args().nth(2) {
        Some(val) => Some(val.parse::<u64>()?),
        None => None,
    };
    let config = Config::from_env()?;
    info!(%path, ?config, "starting");

    let bus = linux_embedded_hal::I2cdev::new(&path)?;
    let mut sensor = Aht10::new(HalBus::new(bus), linux_embedded_hal::Delay, config);
    let stop = sensor.stop_signal();

    let (tx, rx) = channel();
    let worker = thread::spawn(move || sensor.run(tx));

    let mut log = LogReporter;
    let mut readings = 0;
    for event in rx {
        if matches!(event, Event::Reading(_)) {
            readings += 1;
        }
        log.report(event);
        if max_readings.is_some_and(|max| readings >= max) {
            stop.stop();
            break;
        }
    }

    match worker.join() {
        Ok(summary) => info!(?summary, "done"),
        Err(_) => error!("measurement thread panicked"),
    }
    Ok(())
}
