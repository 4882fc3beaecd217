//! The measurement state machine.
//!
//! ```text
//!  Uninitialized ──(power-on delay, INIT)──► Initializing ──(status read)──► Idle
//!        ▲                                                                   │
//!        │                                                                MEASURE
//!        │                                                                   ▼
//!        │                                                          MeasurementTriggered
//!        │                                                                   │
//!        │                                      busy, poll interval ┌────────┤
//!        │                                                          └──► PollingBusy
//!        │                                                                   │ ready
//!        └──── Error(kind) ◄── failures                          reading, rest, back to Idle
//! ```
//!
//! `Error` is never terminal. Failures while initializing, a run of `TransportNotReady` or a
//! sensor stuck busy send the driver back to `Uninitialized`; anything else resumes from `Idle`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use tracing::{debug, error, info, warn};

use crate::command::SensorCommand;
use crate::config::{Config, MIN_CYCLE_REST};
use crate::convert::Measurement;
use crate::frame::{RawFrame, Status, FRAME_LEN};
use crate::report::{Event, Reporter};
use crate::transport::BusTransport;
use crate::{Error, ErrorKind, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Uninitialized,
    Initializing,
    Idle,
    MeasurementTriggered,
    PollingBusy,
    Error(ErrorKind),
}

/// Cooperative cancellation for [`Aht10::run`]. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters returned by [`Aht10::run`] once it stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub readings: u64,
    pub errors: u64,
}

struct Counting<R> {
    inner: R,
    summary: RunSummary,
}

impl<R: Reporter> Reporter for Counting<R> {
    fn report(&mut self, event: Event) {
        match event {
            Event::Reading(_) => self.summary.readings += 1,
            Event::Error { .. } => self.summary.errors += 1,
        }
        self.inner.report(event)
    }

    fn transition(&mut self, from: DriverState, to: DriverState) {
        self.inner.transition(from, to)
    }
}

// for the one-shot operations, which return their errors instead
struct Quiet;

impl Reporter for Quiet {
    fn report(&mut self, _event: Event) {}
}

/// An AHT10 on bus transport `T`, sleeping through `D`.
pub struct Aht10<T, D> {
    transport: T,
    delay: D,
    config: Config,
    state: DriverState,
    stop: StopSignal,
    not_ready_streak: u32,
}

impl<T: BusTransport, D: DelayNs> Aht10<T, D> {
    pub fn new(transport: T, delay: D, mut config: Config) -> Self {
        if config.cycle_rest < MIN_CYCLE_REST {
            warn!(
                requested_ms = config.cycle_rest.as_millis() as u64,
                "cycle rest below the vendor minimum, clamping"
            );
            config.cycle_rest = MIN_CYCLE_REST;
        }
        Self {
            transport,
            delay,
            config,
            state: DriverState::Uninitialized,
            stop: StopSignal::new(),
            not_ready_streak: 0,
        }
    }

    /// Replaces the driver's own stop signal with one owned by the host.
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Destroys the driver and gives back the transport and delay.
    pub fn release(self) -> (T, D) {
        (self.transport, self.delay)
    }

    /// Power-on sequence: settle, send INIT, read the status back. Returns that status.
    pub fn initialize(&mut self) -> Result<Status> {
        let result = self.power_up(&mut Quiet);
        if result.is_err() {
            self.settle(&mut Quiet);
        }
        result
    }

    /// A single measurement: trigger, poll until ready, convert. Initializes first if needed.
    pub fn measure(&mut self) -> Result<Measurement> {
        let result = self.measure_with(&mut Quiet);
        if result.is_err() {
            self.settle(&mut Quiet);
        }
        result
    }

    /// Sends SOFT_RESET and waits for it to complete. The sensor must be initialized again.
    pub fn soft_reset(&mut self) -> Result<()> {
        let result = self.send(SensorCommand::soft_reset());
        // the sensor may have reset even if the ack got lost
        self.enter(DriverState::Uninitialized, &mut Quiet);
        result?;
        self.pause(self.config.soft_reset_delay)
    }

    /// Runs measurement cycles until the stop signal is raised, sending every reading and
    /// every recovered failure to `reporter`.
    pub fn run<R: Reporter>(&mut self, reporter: R) -> RunSummary {
        let mut reporter = Counting {
            inner: reporter,
            summary: RunSummary::default(),
        };
        info!(address = self.config.address, "measurement loop started");
        while !self.stop.is_stopped() {
            reporter.summary.cycles += 1;
            // only a stop request escapes a cycle
            if self.cycle(&mut reporter).is_err() {
                break;
            }
        }
        self.settle(&mut reporter);
        info!(summary = ?reporter.summary, "measurement loop stopped");
        reporter.summary
    }

    fn cycle<R: Reporter>(&mut self, reporter: &mut R) -> Result<()> {
        match self.measure_with(reporter) {
            Ok(measurement) => {
                debug!(?measurement, "measurement complete");
                reporter.report(Event::Reading(measurement));
            }
            Err(Error::Stopped) => return Err(Error::Stopped),
            Err(err) => self.recover(err, reporter),
        }
        self.pause(self.config.cycle_rest)
    }

    fn power_up<R: Reporter>(&mut self, reporter: &mut R) -> Result<Status> {
        self.enter(DriverState::Uninitialized, reporter);
        self.pause(self.config.power_on_delay)?;
        // transports arrive configured, so INIT is the first thing on the wire
        self.send(SensorCommand::init(self.config.init))?;
        self.enter(DriverState::Initializing, reporter);
        if let Some(delay) = self.config.post_init_delay {
            self.pause(delay)?;
        }

        let status = self.read_status(reporter)?;
        debug!(
            status = status.0,
            calibrated = status.is_calibrated(),
            mode = ?status.mode(),
            "sensor initialized"
        );
        if !status.is_calibrated() {
            warn!(status = status.0, "calibration bit clear after init");
        }
        self.enter(DriverState::Idle, reporter);
        Ok(status)
    }

    /// Status read after INIT. Frames of the wrong length are read again.
    fn read_status<R: Reporter>(&mut self, reporter: &mut R) -> Result<Status> {
        let mut attempts = 1;
        loop {
            match self.read_frame() {
                Ok(frame) => return Ok(frame.status()),
                Err(err @ Error::UnexpectedFrameLength { .. })
                    if attempts < self.config.max_busy_polls =>
                {
                    attempts += 1;
                    self.transient(err, reporter);
                    self.pause(self.config.poll_interval)?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn measure_with<R: Reporter>(&mut self, reporter: &mut R) -> Result<Measurement> {
        if self.state != DriverState::Idle {
            self.power_up(reporter)?;
        }

        self.send(SensorCommand::measure())?;
        self.enter(DriverState::MeasurementTriggered, reporter);
        self.enter(DriverState::PollingBusy, reporter);

        // a timeout needs at least one frame that showed the busy bit
        let mut saw_busy = false;
        let mut last_error = None;
        for poll in 1..=self.config.max_busy_polls {
            self.pause(self.config.poll_interval)?;
            let frame = match self.read_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    if self.needs_reinit(&err) {
                        return Err(err);
                    }
                    last_error = Some(err.clone());
                    self.transient(err, reporter);
                    continue;
                }
            };

            let raw = frame.decode();
            debug!(
                poll,
                frame = ?frame.0,
                humidity_raw = raw.humidity_raw,
                temperature_raw = raw.temperature_raw,
                "frame read"
            );
            if raw.status.is_busy() {
                debug!(poll, "sensor still busy");
                saw_busy = true;
                continue;
            }
            self.enter(DriverState::Idle, reporter);
            return Ok(Measurement::from(raw));
        }

        match last_error {
            Some(err) if !saw_busy => Err(err),
            _ => Err(Error::MeasurementTimeout {
                polls: self.config.max_busy_polls,
            }),
        }
    }

    /// Moves through `Error` to the nearest state the next cycle can start from.
    fn recover<R: Reporter>(&mut self, error: Error, reporter: &mut R) {
        let state = self.state;
        match error {
            Error::MeasurementTimeout { .. } => error!(?state, %error, "sensor stuck busy"),
            _ => warn!(?state, %error, "measurement cycle failed"),
        }
        self.enter(DriverState::Error(error.kind()), reporter);

        let reinit = match error {
            Error::MeasurementTimeout { .. } => {
                self.reset_after_timeout();
                true
            }
            _ => {
                self.needs_reinit(&error)
                    || matches!(
                        state,
                        DriverState::Uninitialized | DriverState::Initializing
                    )
            }
        };
        reporter.report(Event::Error { state, error });

        let next = if reinit {
            DriverState::Uninitialized
        } else {
            DriverState::Idle
        };
        self.enter(next, reporter);
    }

    fn reset_after_timeout(&mut self) {
        if let Err(err) = self.send(SensorCommand::soft_reset()) {
            warn!(%err, "soft reset failed");
        }
        // a stop raised here is seen by the caller's next pause
        let _ = self.pause(self.config.soft_reset_delay);
    }

    /// Reports a failure that is retried in place and returns to the current state.
    fn transient<R: Reporter>(&mut self, error: Error, reporter: &mut R) {
        let state = self.state;
        warn!(?state, %error, "retrying read");
        self.enter(DriverState::Error(error.kind()), reporter);
        reporter.report(Event::Error { state, error });
        self.enter(state, reporter);
    }

    fn needs_reinit(&self, error: &Error) -> bool {
        *error == Error::TransportNotReady
            && self.not_ready_streak >= self.config.reinit_after_not_ready
    }

    // Leaves half-finished steps after a stop or a failed one-shot call.
    fn settle<R: Reporter>(&mut self, reporter: &mut R) {
        match self.state {
            DriverState::MeasurementTriggered | DriverState::PollingBusy => {
                self.enter(DriverState::Idle, reporter)
            }
            DriverState::Initializing | DriverState::Error(_) => {
                self.enter(DriverState::Uninitialized, reporter)
            }
            DriverState::Uninitialized | DriverState::Idle => {}
        }
    }

    fn enter<R: Reporter>(&mut self, to: DriverState, reporter: &mut R) {
        let from = self.state;
        if from != to {
            debug!(?from, ?to, "state transition");
            self.state = to;
            reporter.transition(from, to);
        }
    }

    fn send(&mut self, command: SensorCommand) -> Result<()> {
        debug!(
            opcode = command.opcode(),
            payload = ?command.payload(),
            "sending command"
        );
        let result = self
            .transport
            .write(self.config.address, command.opcode(), command.payload());
        self.track(result)
    }

    fn read_frame(&mut self) -> Result<RawFrame> {
        let result = self.transport.read(self.config.address, FRAME_LEN);
        let bytes = self.track(result)?;
        RawFrame::from_slice(&bytes)
    }

    // counts consecutive TransportNotReady failures across transactions
    fn track<V>(&mut self, result: Result<V>) -> Result<V> {
        match &result {
            Ok(_) => self.not_ready_streak = 0,
            Err(Error::TransportNotReady) => self.not_ready_streak += 1,
            Err(_) => {}
        }
        result
    }

    /// Sleeps in slices of `sleep_slice`, checking the stop signal before each one.
    fn pause(&mut self, duration: Duration) -> Result<()> {
        let slice = self.config.sleep_slice.max(Duration::from_micros(1));
        let mut remaining = duration;
        loop {
            if self.stop.is_stopped() {
                return Err(Error::Stopped);
            }
            if remaining.is_zero() {
                return Ok(());
            }
            let step = remaining.min(slice);
            self.delay
                .delay_us(u32::try_from(step.as_micros()).unwrap_or(u32::MAX));
            remaining -= step;
        }
    }
}
