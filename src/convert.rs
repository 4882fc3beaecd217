use crate::frame::RawReading;

// full scale of a 20-bit field
const FULL_SCALE: f32 = (1u32 << 20) as f32;

/// One converted reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Relative humidity as a fraction in `[0, 1)`.
    pub humidity_fraction: f32,
    pub temperature_celsius: f32,
    /// Set when the status byte did not mark the data as fresh (calibration disabled or a
    /// measurement still in progress). The values are converted regardless; callers decide
    /// whether to keep them.
    pub provisional: bool,
}

impl Measurement {
    pub fn humidity_percent(&self) -> f32 {
        self.humidity_fraction * 100.0
    }
}

pub fn humidity_fraction(humidity_raw: u32) -> f32 {
    humidity_raw as f32 / FULL_SCALE
}

pub fn temperature_celsius(temperature_raw: u32) -> f32 {
    (temperature_raw as f32 / FULL_SCALE) * 200.0 - 50.0
}

impl From<RawReading> for Measurement {
    fn from(raw: RawReading) -> Self {
        Self {
            humidity_fraction: humidity_fraction(raw.humidity_raw),
            temperature_celsius: temperature_celsius(raw.temperature_raw),
            provisional: !raw.status.is_fresh(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{RawFrame, Status};

    #[test]
    fn test_reference_frame() {
        let m = Measurement::from(RawFrame([0x04, 0x19, 0x8C, 0x1A, 0x4D, 0x55]).decode());
        // 0x198C1 / 2^20 and 0x0A4D55 / 2^20 * 200 - 50
        assert!((m.humidity_fraction - 0.099_793_434).abs() < 1e-6);
        assert!((m.temperature_celsius - 78.775_978).abs() < 1e-4);
        assert!((m.humidity_percent() - 9.979_343).abs() < 1e-4);
        assert!(!m.provisional);
    }

    #[test]
    fn test_bounds_over_full_range() {
        for raw in 0..(1u32 << 20) {
            let h = humidity_fraction(raw);
            let t = temperature_celsius(raw);
            assert!((0.0..1.0).contains(&h), "humidity {h} out of range for {raw}");
            assert!((-50.0..150.0).contains(&t), "temperature {t} out of range for {raw}");
        }
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(humidity_fraction(0), 0.0);
        assert_eq!(temperature_celsius(0), -50.0);
        assert_eq!(temperature_celsius(1 << 19), 50.0);
    }

    #[test]
    fn test_provisional_when_uncalibrated() {
        let raw = RawReading {
            status: Status(0x00),
            humidity_raw: 1 << 19,
            temperature_raw: 1 << 19,
        };
        let m = Measurement::from(raw);
        assert!(m.provisional);
        assert_eq!(m.humidity_fraction, 0.5);
        assert_eq!(m.temperature_celsius, 50.0);
    }
}
