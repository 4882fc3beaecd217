//! Byte sequences for the sensor's command set. Nothing here touches the bus; the driver hands
//! the finished [`SensorCommand`] to a `BusTransport` in a single write.

#[allow(dead_code)]
pub(crate) mod constants {
    pub const CMD_INIT: u8 = 0xE1;
    pub const CMD_INIT_LEGACY: u8 = 0xA8;
    pub const CMD_MEASURE: u8 = 0xAC;
    pub const CMD_SOFT_RESET: u8 = 0xBA;

    // first init payload byte, OR'd together
    pub const INIT_MODE_NORMAL: u8 = 0x00;
    pub const INIT_MODE_CYCLE: u8 = 0x20;
    pub const INIT_MODE_COMMAND: u8 = 0x40;
    pub const INIT_CAL_ENABLE: u8 = 0x08;

    pub const MEASURE_BEGIN: u8 = 0x33;
    pub const BYTE_ZERO: u8 = 0x00;
}
use constants::*;

/// Measurement mode requested in the init payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitMode {
    /// Sleep between measurements.
    #[default]
    Normal,
    /// Continuous measurement.
    Cycle,
    Command,
}

impl InitMode {
    const fn flags(self) -> u8 {
        match self {
            InitMode::Normal => INIT_MODE_NORMAL,
            InitMode::Cycle => INIT_MODE_CYCLE,
            InitMode::Command => INIT_MODE_COMMAND,
        }
    }
}

/// Which of the two known init encodings to send.
///
/// `Calibrated` (0xE1 with the calibration-enable flag) is the canonical one. `Legacy` (0xA8 with
/// an all-zero payload) exists for older sensor revisions and must be selected explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitVariant {
    Calibrated(InitMode),
    Legacy,
}

impl Default for InitVariant {
    fn default() -> Self {
        InitVariant::Calibrated(InitMode::Normal)
    }
}

/// A single command frame: opcode plus up to two payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorCommand {
    opcode: u8,
    payload: [u8; 2],
    payload_len: u8,
}

impl SensorCommand {
    const fn new(opcode: u8, payload: [u8; 2], payload_len: u8) -> Self {
        Self {
            opcode,
            payload,
            payload_len,
        }
    }

    pub const fn init(variant: InitVariant) -> Self {
        match variant {
            InitVariant::Calibrated(mode) => {
                Self::new(CMD_INIT, [mode.flags() | INIT_CAL_ENABLE, BYTE_ZERO], 2)
            }
            InitVariant::Legacy => Self::new(CMD_INIT_LEGACY, [BYTE_ZERO, BYTE_ZERO], 2),
        }
    }

    pub const fn measure() -> Self {
        Self::new(CMD_MEASURE, [MEASURE_BEGIN, BYTE_ZERO], 2)
    }

    pub const fn soft_reset() -> Self {
        Self::new(CMD_SOFT_RESET, [0, 0], 0)
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.payload_len as usize]
    }

    /// Opcode followed by the payload, exactly as it goes on the wire after the address byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.payload().len());
        bytes.push(self.opcode);
        bytes.extend_from_slice(self.payload());
        bytes
    }
}

impl InitVariant {
    /// Parses the names accepted by `AHT10_INIT_VARIANT`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(InitVariant::Calibrated(InitMode::Normal)),
            "cycle" => Some(InitVariant::Calibrated(InitMode::Cycle)),
            "command" => Some(InitVariant::Calibrated(InitMode::Command)),
            "legacy" => Some(InitVariant::Legacy),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_canonical() {
        let cmd = SensorCommand::init(InitVariant::default());
        assert_eq!(cmd.opcode(), 0xE1);
        assert_eq!(cmd.payload(), &[0x08, 0x00]);
        assert_eq!(cmd.to_bytes(), vec![0xE1, 0x08, 0x00]);
    }

    #[test]
    fn test_init_is_pure() {
        let first = SensorCommand::init(InitVariant::default());
        let second = SensorCommand::init(InitVariant::default());
        assert_eq!(first, second);
        assert_eq!(first.to_bytes(), second.to_bytes());
    }

    #[test]
    fn test_init_modes() {
        let cycle = SensorCommand::init(InitVariant::Calibrated(InitMode::Cycle));
        assert_eq!(cycle.payload(), &[0x28, 0x00]);
        let command = SensorCommand::init(InitVariant::Calibrated(InitMode::Command));
        assert_eq!(command.payload(), &[0x48, 0x00]);
    }

    #[test]
    fn test_init_legacy() {
        let cmd = SensorCommand::init(InitVariant::Legacy);
        assert_eq!(cmd.to_bytes(), vec![0xA8, 0x00, 0x00]);
    }

    #[test]
    fn test_measure() {
        assert_eq!(SensorCommand::measure().to_bytes(), vec![0xAC, 0x33, 0x00]);
    }

    #[test]
    fn test_soft_reset_has_no_payload() {
        let cmd = SensorCommand::soft_reset();
        assert_eq!(cmd.opcode(), 0xBA);
        assert!(cmd.payload().is_empty());
        assert_eq!(cmd.to_bytes(), vec![0xBA]);
    }

    #[test]
    fn test_variant_names() {
        assert_eq!(
            InitVariant::from_name(" Cycle "),
            Some(InitVariant::Calibrated(InitMode::Cycle))
        );
        assert_eq!(InitVariant::from_name("legacy"), Some(InitVariant::Legacy));
        assert_eq!(InitVariant::from_name("turbo"), None);
    }
}
