#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("no acknowledgement from the i2c device")]
    NoAcknowledgment,

    #[error("i2c bus busy beyond the transaction timeout")]
    BusTimeout,

    #[error("i2c transport not ready")]
    TransportNotReady,

    #[error("invalid argument for an i2c transaction")]
    InvalidArgument,

    #[error("expected a {expected}-byte reply frame, got {actual} bytes")]
    UnexpectedFrameLength { expected: usize, actual: usize },

    #[error("sensor still busy after {polls} status reads")]
    MeasurementTimeout { polls: u32 },

    #[error("stop requested")]
    Stopped,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Fieldless mirror of [`Error`], carried by `DriverState::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoAcknowledgment,
    BusTimeout,
    TransportNotReady,
    InvalidArgument,
    UnexpectedFrameLength,
    MeasurementTimeout,
    Stopped,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoAcknowledgment => ErrorKind::NoAcknowledgment,
            Error::BusTimeout => ErrorKind::BusTimeout,
            Error::TransportNotReady => ErrorKind::TransportNotReady,
            Error::InvalidArgument => ErrorKind::InvalidArgument,
            Error::UnexpectedFrameLength { .. } => ErrorKind::UnexpectedFrameLength,
            Error::MeasurementTimeout { .. } => ErrorKind::MeasurementTimeout,
            Error::Stopped => ErrorKind::Stopped,
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        use std::io::ErrorKind;
        match value {
            Error::NoAcknowledgment => ErrorKind::NotConnected.into(),
            Error::BusTimeout => ErrorKind::TimedOut.into(),
            Error::TransportNotReady => ErrorKind::NotFound.into(),
            Error::InvalidArgument => ErrorKind::InvalidInput.into(),
            Error::UnexpectedFrameLength { .. } => ErrorKind::UnexpectedEof.into(),
            Error::MeasurementTimeout { .. } => ErrorKind::TimedOut.into(),
            Error::Stopped => ErrorKind::Interrupted.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        match value.kind() {
            std::io::ErrorKind::NotConnected => Error::NoAcknowledgment,
            std::io::ErrorKind::TimedOut => Error::BusTimeout,
            std::io::ErrorKind::ResourceBusy => Error::BusTimeout,
            std::io::ErrorKind::InvalidInput => Error::InvalidArgument,
            std::io::ErrorKind::Interrupted => Error::Stopped,
            _ => Error::TransportNotReady,
        }
    }
}

impl From<embedded_hal::i2c::ErrorKind> for Error {
    fn from(value: embedded_hal::i2c::ErrorKind) -> Self {
        use embedded_hal::i2c::ErrorKind;
        match value {
            ErrorKind::NoAcknowledge(_) => Error::NoAcknowledgment,
            ErrorKind::ArbitrationLoss | ErrorKind::Bus => Error::BusTimeout,
            _ => Error::TransportNotReady,
        }
    }
}
