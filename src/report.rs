use std::sync::mpsc::Sender;

use tracing::{info, warn};

use crate::convert::Measurement;
use crate::driver::DriverState;
use crate::Error;

/// Something the measurement loop produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Reading(Measurement),
    /// A failure that was recovered from; `state` is where the driver was when it happened.
    Error { state: DriverState, error: Error },
}

/// Receives the output of `Aht10::run`.
pub trait Reporter {
    fn report(&mut self, event: Event);

    /// Called on every state change. Most reporters don't care.
    fn transition(&mut self, _from: DriverState, _to: DriverState) {}
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn report(&mut self, event: Event) {
        (**self).report(event)
    }

    fn transition(&mut self, from: DriverState, to: DriverState) {
        (**self).transition(from, to)
    }
}

/// Forwards events to another thread. A dropped receiver is not an error for the loop; the
/// event is discarded.
impl Reporter for Sender<Event> {
    fn report(&mut self, event: Event) {
        if self.send(event).is_err() {
            warn!("event receiver dropped");
        }
    }
}

/// Emits every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, event: Event) {
        match event {
            Event::Reading(m) => info!(
                humidity_percent = m.humidity_percent(),
                temperature_celsius = m.temperature_celsius,
                provisional = m.provisional,
                "reading"
            ),
            Event::Error { state, error } => warn!(?state, %error, "measurement cycle failed"),
        }
    }
}
