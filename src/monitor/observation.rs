//! # Observation Channel
//!
//! Single-slot hand-off of the latest sample from the sampling loop to a
//! slower display consumer.
//!
//! The producer overwrites the slot every cycle and never waits. The
//! consumer wakes on a fixed display interval, takes whatever is newest,
//! compares it with the record it last rendered and only renders on change.
//! Records published between two wake-ups are never seen.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::ministick::direction::Direction;

/// Snapshot of one sampling cycle, used only for display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservationRecord {
    pub axis0: f64,
    pub axis1: f64,
    pub direction: Direction,
    pub is_warmup: bool,
}

/// Producer half, owned by the sampling loop
#[derive(Debug, Clone)]
pub struct ObservationSender {
    slot: watch::Sender<Option<ObservationRecord>>,
}

impl ObservationSender {
    /// Replace the pending record. Never blocks, even with no consumer.
    pub fn publish(&self, record: ObservationRecord) {
        self.slot.send_replace(Some(record));
    }
}

/// Consumer half
#[derive(Debug)]
pub struct ObservationReceiver {
    slot: watch::Receiver<Option<ObservationRecord>>,
}

impl ObservationReceiver {
    /// Take the newest record if it was published since the last take.
    ///
    /// Never waits. Returns `None` when nothing new is pending or the
    /// producer is gone.
    pub fn take_changed(&mut self) -> Option<ObservationRecord> {
        match self.slot.has_changed() {
            Ok(true) => *self.slot.borrow_and_update(),
            Ok(false) | Err(_) => None,
        }
    }

    /// Returns `true` once the producer has been dropped
    pub fn is_closed(&self) -> bool {
        self.slot.has_changed().is_err()
    }
}

/// Create a connected producer/consumer pair
#[must_use]
pub fn channel() -> (ObservationSender, ObservationReceiver) {
    let (tx, rx) = watch::channel(None);
    (ObservationSender { slot: tx }, ObservationReceiver { slot: rx })
}

/// Writes a record to the log
pub fn render(record: &ObservationRecord) {
    if record.is_warmup {
        info!("Warm-up period: ignoring initial readings");
    } else {
        info!(
            "Mini stick axis 0: {:.3}, axis 1: {:.3}, direction: {}",
            record.axis0, record.axis1, record.direction
        );
    }
}

/// Throttled consumer that renders each distinct record once
pub struct DisplayConsumer {
    receiver: ObservationReceiver,
    interval: Duration,
    last: Option<ObservationRecord>,
}

impl DisplayConsumer {
    pub fn new(receiver: ObservationReceiver, interval: Duration) -> Self {
        Self {
            receiver,
            interval,
            last: None,
        }
    }

    /// Render with [`render`] until cancelled or the producer goes away
    pub async fn run(self, cancel: CancellationToken) {
        self.run_with(cancel, render).await;
    }

    /// Render with a custom sink until cancelled or the producer goes away
    pub async fn run_with<F>(mut self, cancel: CancellationToken, mut sink: F)
    where
        F: FnMut(&ObservationRecord),
    {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.receiver.take_changed() {
                Some(record) if self.last != Some(record) => {
                    sink(&record);
                    self.last = Some(record);
                }
                Some(_) => {}
                None if self.receiver.is_closed() => break,
                None => {}
            }
        }
        debug!("Display consumer stopped");
    }
}
