//! This module contains automated testcases that require a Linux host with an AHT10 wired to an
//! I2C bus, so they're not run by default. Set `AHT10_I2C_DEV` (default `/dev/i2c-1`) and run:
//! `cargo test --features hw-tests`

use serial_test::serial;

use crate::{Aht10, Config, HalBus};

fn open() -> Aht10<HalBus<linux_embedded_hal::I2cdev>, linux_embedded_hal::Delay> {
    let path = std::env::var("AHT10_I2C_DEV").unwrap_or_else(|_| "/dev/i2c-1".into());
    let bus = linux_embedded_hal::I2cdev::new(path).unwrap();
    Aht10::new(HalBus::new(bus), linux_embedded_hal::Delay, Config::default())
}

#[test]
#[serial]
pub fn test_initialize() {
    let status = open().initialize().unwrap();
    assert!(status.is_calibrated());
}

#[test]
#[serial]
pub fn test_measure() {
    let m = open().measure().unwrap();
    assert!((0.0..1.0).contains(&m.humidity_fraction));
    assert!((-40.0..85.0).contains(&m.temperature_celsius));
}
