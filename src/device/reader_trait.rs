//! Trait abstraction for reading raw controller state to enable testing

use crate::error::{HotasError, Result};
use crate::ministick::direction::AxisReading;

use super::{MINISTICK_AXIS_0, MINISTICK_AXIS_1};

/// Trait for synchronous controller reads
#[cfg_attr(test, mockall::automock)]
pub trait ThrottleReader: Send {
    /// Number of (buttons, switches, axes) the device reports
    fn counts(&self) -> (usize, usize, usize);

    /// Fill caller-provided buffers with the current state. Axis values are
    /// normalized to `0.0..=1.0`.
    fn get_current_reading(
        &mut self,
        buttons: &mut [bool],
        switches: &mut [i32],
        axes: &mut [f64],
    ) -> Result<()>;
}

/// Fixed-size buffers reused across polls
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingBuffers {
    pub buttons: Vec<bool>,
    pub switches: Vec<i32>,
    pub axes: Vec<f64>,
}

impl ReadingBuffers {
    /// Allocates buffers sized for `reader`.
    pub fn for_reader<R: ThrottleReader + ?Sized>(reader: &R) -> Self {
        let (buttons, switches, axes) = reader.counts();
        Self {
            buttons: vec![false; buttons],
            switches: vec![0; switches],
            axes: vec![0.0; axes],
        }
    }

    /// Polls `reader` into these buffers.
    pub fn fill<R: ThrottleReader + ?Sized>(&mut self, reader: &mut R) -> Result<()> {
        reader.get_current_reading(&mut self.buttons, &mut self.switches, &mut self.axes)
    }

    /// Extracts the two mini-stick axes.
    ///
    /// # Errors
    ///
    /// Returns `Device` error if the axis array is too short.
    pub fn ministick(&self) -> Result<AxisReading> {
        match (self.axes.get(MINISTICK_AXIS_0), self.axes.get(MINISTICK_AXIS_1)) {
            (Some(&axis0), Some(&axis1)) => Ok(AxisReading::new(axis0, axis1)),
            _ => Err(HotasError::Device(format!(
                "Device reports {} axes, mini-stick needs index {}",
                self.axes.len(),
                MINISTICK_AXIS_1
            ))),
        }
    }
}
