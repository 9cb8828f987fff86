//! # Sampling Loop
//!
//! Fixed-rate poll of the throttle that drives the movement keys.
//!
//! ## Phases
//!
//! - **Warmup**: from session start until the warm-up deadline. Readings are
//!   classified and published for display, but keys are never touched.
//! - **Active**: every direction change is turned into key events.
//!
//! The loop never returns to Warmup.
//!
//! ## Cycle
//!
//! 1. Check cancellation
//! 2. Read the throttle and extract the mini-stick axes
//! 3. Classify the reading
//! 4. Publish an [`ObservationRecord`]
//! 5. When Active and the direction changed, drive the key transition
//! 6. Sleep for the rest of the period
//!
//! Whatever ends the loop (cancellation or a read/injection error), every
//! key is released before `run` returns.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::observation::{ObservationRecord, ObservationSender};
use crate::device::reader_trait::{ReadingBuffers, ThrottleReader};
use crate::error::Result;
use crate::keyboard::injector_trait::KeyInjector;
use crate::keyboard::KeyStateDriver;
use crate::ministick::direction::{classify, Direction};
use crate::ministick::keys::keys_for;

/// Default poll rate in Hz
pub const DEFAULT_POLL_RATE_HZ: u32 = 60;

/// Default warm-up window in milliseconds
pub const DEFAULT_WARMUP_MS: u64 = 3000;

/// Timing parameters for one sampling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingSettings {
    /// Nominal cycle period
    pub period: Duration,
    /// Time after session start during which keys are not driven
    pub warmup: Duration,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self::from_rate(DEFAULT_POLL_RATE_HZ, Duration::from_millis(DEFAULT_WARMUP_MS))
    }
}

impl SamplingSettings {
    /// Builds settings from a poll rate in Hz.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use hotas_ministick::monitor::sampler::SamplingSettings;
    ///
    /// let settings = SamplingSettings::from_rate(60, Duration::from_secs(3));
    /// assert_eq!(settings.period.as_micros(), 16_666);
    /// ```
    #[must_use]
    pub fn from_rate(rate_hz: u32, warmup: Duration) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / f64::from(rate_hz.max(1))),
            warmup,
        }
    }
}

/// Sampling loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Warmup,
    Active,
}

/// One session's polling loop
pub struct SamplingLoop<R, I> {
    reader: R,
    buffers: ReadingBuffers,
    driver: Arc<KeyStateDriver<I>>,
    observations: ObservationSender,
    settings: SamplingSettings,
    warmup_deadline: Instant,
    phase: Phase,
    last_direction: Direction,
}

impl<R: ThrottleReader, I: KeyInjector> SamplingLoop<R, I> {
    /// Creates a loop whose warm-up starts at `started_at`.
    pub fn new(
        reader: R,
        driver: Arc<KeyStateDriver<I>>,
        observations: ObservationSender,
        settings: SamplingSettings,
        started_at: Instant,
    ) -> Self {
        let buffers = ReadingBuffers::for_reader(&reader);
        let warmup_deadline = started_at + settings.warmup;
        Self {
            reader,
            buffers,
            driver,
            observations,
            settings,
            warmup_deadline,
            phase: Phase::Warmup,
            last_direction: Direction::Neutral,
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Direction whose keys are currently held
    pub fn last_direction(&self) -> Direction {
        self.last_direction
    }

    /// Runs one cycle (read, classify, publish, drive) at time `now`.
    ///
    /// Returns the classified direction.
    ///
    /// # Errors
    ///
    /// Returns the device or injector error that ended the cycle.
    pub fn step(&mut self, now: Instant) -> Result<Direction> {
        if self.phase == Phase::Warmup && now >= self.warmup_deadline {
            self.phase = Phase::Active;
            info!("Warm-up complete, driving keys");
        }

        self.buffers.fill(&mut self.reader)?;
        let reading = self.buffers.ministick()?;
        let direction = classify(reading.axis0, reading.axis1);

        self.observations.publish(ObservationRecord {
            axis0: reading.axis0,
            axis1: reading.axis1,
            direction,
            is_warmup: self.phase == Phase::Warmup,
        });

        if self.phase == Phase::Active && direction != self.last_direction {
            debug!("Direction {} -> {}", self.last_direction, direction);
            self.driver
                .transition(keys_for(self.last_direction), keys_for(direction))?;
            self.last_direction = direction;
        }

        trace!("Cycle: {:?} -> {}", reading, direction);
        Ok(direction)
    }

    /// Poll at the configured rate until `cancel` fires or a cycle fails.
    ///
    /// Every key is released before returning, on every exit path.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        info!(
            "Sampling mini-stick every {:?} (warm-up {:?})",
            self.settings.period, self.settings.warmup
        );

        let mut ticker = interval(self.settings.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        let result = loop {
            if cancel.is_cancelled() {
                break Ok(());
            }
            if let Err(e) = self.step(Instant::now()) {
                warn!("Sampling stopped: {}", e);
                break Err(e);
            }
            tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                _ = ticker.tick() => {}
            }
        };

        self.driver.release_all();
        debug!("Sampling loop finished, keys released");
        result
    }
}
