//! # evdev Throttle Reader
//!
//! Reads the throttle's raw state through the Linux evdev interface.
//!
//! ## Buffer Layout
//!
//! - Axes: every supported absolute axis except the hats, in ascending evdev
//!   code order, normalized to `0.0..=1.0` from the axis' min/max
//! - Switches: hat axes (ABS_HAT0X..ABS_HAT3Y), raw -1/0/1
//! - Buttons: every supported key, in ascending code order

use evdev::{AbsoluteAxisType, Device, Key};
use std::path::Path;
use tracing::{info, trace};

use super::reader_trait::ThrottleReader;
use super::{ControllerInfo, DeviceIdentity, NodeStamp};
use crate::error::{HotasError, Result};

/// Returns `true` for the hat axes, which are reported as switches.
fn is_hat(axis: AbsoluteAxisType) -> bool {
    (AbsoluteAxisType::ABS_HAT0X.0..=AbsoluteAxisType::ABS_HAT3Y.0).contains(&axis.0)
}

/// Splits the supported absolute axes into (analog axes, hats).
fn split_axes(device: &Device) -> (Vec<AbsoluteAxisType>, Vec<AbsoluteAxisType>) {
    device
        .supported_absolute_axes()
        .map(|set| set.iter().partition(|axis| !is_hat(*axis)))
        .unwrap_or_default()
}

/// Normalizes a raw axis value to `0.0..=1.0`.
///
/// Degenerate ranges (max <= min) report center.
///
/// # Examples
///
/// ```
/// use hotas_ministick::device::throttle::normalize_axis;
///
/// assert_eq!(normalize_axis(0, 0, 1023), 0.0);
/// assert_eq!(normalize_axis(1023, 0, 1023), 1.0);
/// assert_eq!(normalize_axis(0, -128, 127), 128.0 / 255.0);
/// ```
#[must_use]
pub fn normalize_axis(value: i32, minimum: i32, maximum: i32) -> f64 {
    if maximum <= minimum {
        return 0.5;
    }
    (f64::from(value) - f64::from(minimum)) / (f64::from(maximum) - f64::from(minimum))
}

/// Builds a [`ControllerInfo`] for an opened evdev device.
pub fn describe(path: &Path, node: NodeStamp, device: &Device) -> ControllerInfo {
    let id = device.input_id();
    let (axes, hats) = split_axes(device);

    ControllerInfo {
        path: path.to_path_buf(),
        node,
        identity: DeviceIdentity::new(id.vendor(), id.product()),
        name: device.name().unwrap_or("Unknown").to_string(),
        axis_count: axes.len(),
        button_count: device.supported_keys().map_or(0, |keys| keys.iter().count()),
        switch_count: hats.len(),
    }
}

/// Throttle handle backed by an evdev device node
pub struct EvdevThrottle {
    device: Device,
    device_path: String,
    axes: Vec<AbsoluteAxisType>,
    hats: Vec<AbsoluteAxisType>,
    keys: Vec<Key>,
}

impl std::fmt::Debug for EvdevThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevThrottle")
            .field("device_path", &self.device_path)
            .field("axes", &self.axes.len())
            .finish_non_exhaustive()
    }
}

impl EvdevThrottle {
    /// Open the controller described by `info`
    ///
    /// # Errors
    ///
    /// - `Device`: the node cannot be opened (unplugged, permission denied)
    /// - `DeviceNotFound`: the node now belongs to a different model
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hotas_ministick::device::throttle::EvdevThrottle;
    /// # use hotas_ministick::device::ControllerInfo;
    /// # fn info() -> ControllerInfo { unimplemented!() }
    ///
    /// let throttle = EvdevThrottle::open(&info())?;
    /// println!("Reading throttle at: {}", throttle.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(info: &ControllerInfo) -> Result<Self> {
        let device = Device::open(&info.path).map_err(|e| {
            HotasError::Device(format!("Failed to open {}: {}", info.path.display(), e))
        })?;

        let id = device.input_id();
        if DeviceIdentity::new(id.vendor(), id.product()) != info.identity {
            return Err(HotasError::DeviceNotFound {
                vendor_id: info.identity.vendor_id,
                product_id: info.identity.product_id,
            });
        }

        let (axes, hats) = split_axes(&device);
        let keys: Vec<Key> = device
            .supported_keys()
            .map(|set| set.iter().collect())
            .unwrap_or_default();

        let device_path = info.path.to_string_lossy().to_string();
        info!(
            "Opened throttle at {} ({} axes, {} switches, {} buttons)",
            device_path,
            axes.len(),
            hats.len(),
            keys.len()
        );

        Ok(Self {
            device,
            device_path,
            axes,
            hats,
            keys,
        })
    }

    /// Get the device path of this throttle
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

impl ThrottleReader for EvdevThrottle {
    fn counts(&self) -> (usize, usize, usize) {
        (self.keys.len(), self.hats.len(), self.axes.len())
    }

    fn get_current_reading(
        &mut self,
        buttons: &mut [bool],
        switches: &mut [i32],
        axes: &mut [f64],
    ) -> Result<()> {
        let abs = self.device.get_abs_state().map_err(|e| {
            HotasError::Device(format!("Failed to read axes from {}: {}", self.device_path, e))
        })?;
        let pressed = self.device.get_key_state().map_err(|e| {
            HotasError::Device(format!("Failed to read buttons from {}: {}", self.device_path, e))
        })?;

        for (slot, axis) in axes.iter_mut().zip(&self.axes) {
            let info = &abs[axis.0 as usize];
            *slot = normalize_axis(info.value, info.minimum, info.maximum);
        }
        for (slot, hat) in switches.iter_mut().zip(&self.hats) {
            *slot = abs[hat.0 as usize].value;
        }
        for (slot, key) in buttons.iter_mut().zip(&self.keys) {
            *slot = pressed.contains(*key);
        }

        trace!("Polled {}", self.device_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_unsigned_range() {
        assert_eq!(normalize_axis(0, 0, 255), 0.0);
        assert_eq!(normalize_axis(255, 0, 255), 1.0);
        assert!((normalize_axis(128, 0, 255) - 0.502).abs() < 0.001);
    }

    #[test]
    fn test_normalize_signed_range() {
        assert_eq!(normalize_axis(-32768, -32768, 32767), 0.0);
        assert_eq!(normalize_axis(32767, -32768, 32767), 1.0);
    }

    #[test]
    fn test_normalize_degenerate_range_is_center() {
        assert_eq!(normalize_axis(5, 10, 10), 0.5);
        assert_eq!(normalize_axis(5, 10, 0), 0.5);
    }

    #[test]
    fn test_normalize_out_of_range_noise_passes_through() {
        assert!(normalize_axis(260, 0, 255) > 1.0);
        assert!(normalize_axis(-3, 0, 255) < 0.0);
    }

    #[test]
    fn test_hat_axes_are_switches() {
        assert!(is_hat(AbsoluteAxisType::ABS_HAT0X));
        assert!(is_hat(AbsoluteAxisType::ABS_HAT3Y));
        assert!(!is_hat(AbsoluteAxisType::ABS_X));
        assert!(!is_hat(AbsoluteAxisType::ABS_THROTTLE));
        assert!(!is_hat(AbsoluteAxisType::ABS_PRESSURE));
    }

    // Integration test - only runs with real hardware
    #[test]
    #[ignore]
    fn test_read_with_real_hardware() {
        use crate::device::reader_trait::ReadingBuffers;
        use crate::device::scanner::{DeviceEnumerator, EvdevEnumerator};
        use crate::device::DeviceIdentity;

        let info = EvdevEnumerator::default()
            .scan()
            .into_iter()
            .find(|info| info.matches(DeviceIdentity::THROTTLE))
            .expect("Throttle not connected");

        let mut throttle = EvdevThrottle::open(&info).unwrap();
        let mut buffers = ReadingBuffers::for_reader(&throttle);
        buffers.fill(&mut throttle).unwrap();
        println!("Mini-stick: {:?}", buffers.ministick().unwrap());
    }
}
