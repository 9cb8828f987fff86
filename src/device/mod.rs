//! # Device Module
//!
//! Throttle discovery, hot-plug tracking and raw reading.
//!
//! This module handles:
//! - Identifying the target throttle by vendor and product ID
//! - Tracking connected controllers in a lock-guarded registry
//! - Periodically scanning `/dev/input` for attach/detach
//! - Reading button, switch and axis state via evdev
//!
//! ## Target Hardware
//!
//! The throttle is identified by:
//! - Vendor ID: 1848 (0x0738)
//! - Product ID: 41493 (0xA215)
//!
//! Its mini-stick reports on axes 6 and 7 of the normalized axis array.

pub mod reader_trait;
pub mod registry;
pub mod scanner;
pub mod throttle;

use std::fmt;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

/// Throttle vendor ID
pub const THROTTLE_VENDOR_ID: u16 = 1848;

/// Throttle product ID
pub const THROTTLE_PRODUCT_ID: u16 = 41493;

/// Index of the first mini-stick axis in the axis array
pub const MINISTICK_AXIS_0: usize = 6;

/// Index of the second mini-stick axis in the axis array
pub const MINISTICK_AXIS_1: usize = 7;

/// Vendor/product pair that identifies a controller model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceIdentity {
    /// The throttle this bridge drives.
    pub const THROTTLE: DeviceIdentity = DeviceIdentity {
        vendor_id: THROTTLE_VENDOR_ID,
        product_id: THROTTLE_PRODUCT_ID,
    };

    #[must_use]
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// Identifies one attachment behind a device node path.
///
/// A replug usually gets the same `eventN` name back, but the node itself is
/// recreated, so its inode and change time differ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NodeStamp {
    pub device_number: u64,
    pub inode: u64,
    pub changed_ns: i128,
}

impl NodeStamp {
    /// Stamp of the node at `path`, or `None` if it no longer exists.
    pub fn of(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        Some(Self {
            device_number: meta.rdev(),
            inode: meta.ino(),
            changed_ns: i128::from(meta.ctime()) * 1_000_000_000 + i128::from(meta.ctime_nsec()),
        })
    }
}

/// Description of one connected raw controller.
///
/// The device node path is the handle; `node` tells two attachments at the
/// same path apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerInfo {
    /// Device node, e.g. `/dev/input/event12`
    pub path: PathBuf,
    pub node: NodeStamp,
    pub identity: DeviceIdentity,
    /// Human-readable device name
    pub name: String,
    pub axis_count: usize,
    pub button_count: usize,
    pub switch_count: usize,
}

impl ControllerInfo {
    /// Returns `true` if this controller is of the given model.
    #[must_use]
    pub fn matches(&self, identity: DeviceIdentity) -> bool {
        self.identity == identity
    }
}
