use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::trace;

use crate::{Error, Result};

/// Upper bound any transaction is expected to honour before failing with `Error::BusTimeout`.
/// The adapters below rely on the underlying bus implementation to enforce it.
pub const TRANSACTION_TIMEOUT: Duration = Duration::from_secs(1);

// no sensor command carries more than two payload bytes
const MAX_PAYLOAD: usize = 2;

/// Byte-level access to a device on the bus. Used by `crate::driver`; can be replaced with
/// `MockTransport` for testing.
pub trait BusTransport {
    /// start, address+W, `opcode`, `payload`, stop. Every byte must be acknowledged.
    fn write(&mut self, address: u8, opcode: u8, payload: &[u8]) -> Result<()>;

    /// start, address+R, `length` bytes (NACK on the last), stop.
    fn read(&mut self, address: u8, length: usize) -> Result<Vec<u8>>;
}

impl<T: BusTransport + ?Sized> BusTransport for &mut T {
    #[inline]
    fn write(&mut self, address: u8, opcode: u8, payload: &[u8]) -> Result<()> {
        (**self).write(address, opcode, payload)
    }

    #[inline]
    fn read(&mut self, address: u8, length: usize) -> Result<Vec<u8>> {
        (**self).read(address, length)
    }
}

fn check_request(payload_len: usize, read_len: usize) -> Result<()> {
    if payload_len > MAX_PAYLOAD || read_len == 0 {
        Err(Error::InvalidArgument)
    } else {
        Ok(())
    }
}

fn command_bytes(opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + payload.len());
    buf.push(opcode);
    buf.extend_from_slice(payload);
    buf
}

/// Adapter for masters implementing the `i2c` crate's `BulkTransfer`, e.g. USB-to-I2C bridges.
/// Errors are classified through `std::io::ErrorKind`.
pub struct I2cBus<B> {
    bus: B,
}

impl<B> I2cBus<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn into_inner(self) -> B {
        self.bus
    }
}

fn classify_io<E: Into<std::io::Error>>(err: E) -> Error {
    let err: std::io::Error = err.into();
    Error::from(err)
}

impl<B> BusTransport for I2cBus<B>
where
    B: i2c::Master + i2c::BulkTransfer,
    <B as i2c::Master>::Error: Into<std::io::Error>,
{
    fn write(&mut self, address: u8, opcode: u8, payload: &[u8]) -> Result<()> {
        check_request(payload.len(), 1)?;
        let data = command_bytes(opcode, payload);
        trace!(address, ?data, "i2c write");
        self.bus
            .i2c_transfer(&mut [i2c::Message::Write {
                address: u16::from(address),
                data: &data,
                flags: Default::default(),
            }])
            .map_err(classify_io)
    }

    fn read(&mut self, address: u8, length: usize) -> Result<Vec<u8>> {
        check_request(0, length)?;
        let mut data = vec![0u8; length];
        self.bus
            .i2c_transfer(&mut [i2c::Message::Read {
                address: u16::from(address),
                data: &mut data,
                flags: Default::default(),
            }])
            .map_err(classify_io)?;
        trace!(address, ?data, "i2c read");
        Ok(data)
    }
}

/// Adapter for any `embedded-hal` 1.0 blocking I2C master (Linux `/dev/i2c-N`, MCU HALs).
pub struct HalBus<I> {
    bus: I,
}

impl<I> HalBus<I> {
    pub fn new(bus: I) -> Self {
        Self { bus }
    }

    pub fn into_inner(self) -> I {
        self.bus
    }
}

fn classify_hal<E: embedded_hal::i2c::Error>(err: E) -> Error {
    Error::from(err.kind())
}

impl<I: embedded_hal::i2c::I2c> BusTransport for HalBus<I> {
    fn write(&mut self, address: u8, opcode: u8, payload: &[u8]) -> Result<()> {
        check_request(payload.len(), 1)?;
        let data = command_bytes(opcode, payload);
        trace!(address, ?data, "i2c write");
        self.bus.write(address, &data).map_err(classify_hal)
    }

    fn read(&mut self, address: u8, length: usize) -> Result<Vec<u8>> {
        check_request(0, length)?;
        let mut data = vec![0u8; length];
        self.bus.read(address, &mut data).map_err(classify_hal)?;
        trace!(address, ?data, "i2c read");
        Ok(data)
    }
}

/// A transport shared with other code in the host. Each transaction holds the lock for its whole
/// duration so nothing else can interleave on the bus mid-transfer.
pub struct SharedBus<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> SharedBus<T> {
    pub fn new(transport: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(transport)),
        }
    }

    pub fn from_arc(inner: Arc<Mutex<T>>) -> Self {
        Self { inner }
    }
}

impl<T> Clone for SharedBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: BusTransport> BusTransport for SharedBus<T> {
    fn write(&mut self, address: u8, opcode: u8, payload: &[u8]) -> Result<()> {
        // a poisoned lock means another user panicked mid-transaction
        let mut bus = self.inner.lock().map_err(|_| Error::TransportNotReady)?;
        bus.write(address, opcode, payload)
    }

    fn read(&mut self, address: u8, length: usize) -> Result<Vec<u8>> {
        let mut bus = self.inner.lock().map_err(|_| Error::TransportNotReady)?;
        bus.read(address, length)
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Write {
        pub address: u8,
        pub data: Vec<u8>,
    }

    /// Scripted transport: reads are served from a queue, writes are recorded. Unscheduled reads
    /// fail with `NoAcknowledgment`, as an absent device would.
    #[derive(Default)]
    pub struct MockTransport {
        pub writes: Vec<Write>,
        pub reads: Vec<(u8, usize)>,
        next_reads: VecDeque<Result<Vec<u8>>>,
        next_write_results: VecDeque<Result<()>>,
    }

    impl BusTransport for MockTransport {
        fn write(&mut self, address: u8, opcode: u8, payload: &[u8]) -> Result<()> {
            self.writes.push(Write {
                address,
                data: command_bytes(opcode, payload),
            });
            self.next_write_results.pop_front().unwrap_or(Ok(()))
        }

        fn read(&mut self, address: u8, length: usize) -> Result<Vec<u8>> {
            self.reads.push((address, length));
            self.next_reads
                .pop_front()
                .unwrap_or(Err(Error::NoAcknowledgment))
        }
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn schedule_read(&mut self, data: &[u8]) {
            self.next_reads.push_back(Ok(data.into()));
        }

        pub fn schedule_read_error(&mut self, err: Error) {
            self.next_reads.push_back(Err(err));
        }

        /// Outcome of the next write; writes with nothing scheduled succeed.
        pub fn schedule_write_result(&mut self, result: Result<()>) {
            self.next_write_results.push_back(result);
        }

        pub fn pending_reads(&self) -> usize {
            self.next_reads.len()
        }

        pub fn write_bytes(&self) -> Vec<Vec<u8>> {
            self.writes.iter().map(|w| w.data.clone()).collect()
        }
    }
}
