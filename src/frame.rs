use crate::{Error, Result};

/// Length of every reply the sensor sends: one status byte and five data bytes.
pub const FRAME_LEN: usize = 6;

const STATUS_BUSY: u8 = 0x40;
const STATUS_MODE: u8 = 0x30;
const STATUS_CAL: u8 = 0x04;

/// A reply frame as read from the bus. The array type guarantees the length; use
/// [`RawFrame::from_slice`] to validate whatever a transport returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame(pub [u8; FRAME_LEN]);

impl RawFrame {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let frame: [u8; FRAME_LEN] = bytes.try_into().map_err(|_| Error::UnexpectedFrameLength {
            expected: FRAME_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(frame))
    }

    pub fn status(&self) -> Status {
        Status(self.0[0])
    }

    /// Splits the five data bytes into the two packed 20-bit fields.
    pub fn decode(&self) -> RawReading {
        let b = self.0.map(u32::from);
        RawReading {
            status: Status(self.0[0]),
            // upper 20 bits of bytes 1..=3
            humidity_raw: (b[1] << 12) | (b[2] << 4) | (b[3] >> 4),
            // lower 20 bits of bytes 3..=5
            temperature_raw: ((b[3] & 0x0F) << 16) | (b[4] << 8) | b[5],
        }
    }
}

/// Operating mode reported in status bits 5..4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Sleeps between measurements.
    Normal,
    /// Measures continuously.
    Cycle,
    Command,
}

/// The status byte that leads every reply frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub u8);

impl Status {
    /// A measurement is in progress and the data bytes are stale.
    pub fn is_busy(self) -> bool {
        self.0 & STATUS_BUSY != 0
    }

    pub fn is_calibrated(self) -> bool {
        self.0 & STATUS_CAL != 0
    }

    pub fn mode(self) -> Mode {
        match (self.0 & STATUS_MODE) >> 4 {
            0b00 => Mode::Normal,
            0b01 => Mode::Cycle,
            _ => Mode::Command,
        }
    }

    /// Data can be trusted: calibration enabled and no measurement in progress.
    pub fn is_fresh(self) -> bool {
        self.is_calibrated() && !self.is_busy()
    }
}

/// Unscaled fields extracted from one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReading {
    pub status: Status,
    pub humidity_raw: u32,
    pub temperature_raw: u32,
}
