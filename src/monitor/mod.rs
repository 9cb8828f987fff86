//! # Monitoring
//!
//! Everything that runs while the throttle is attached:
//!
//! - [`sampler`]: fixed-rate poll, classify, drive keys
//! - [`observation`]: latest-sample hand-off to the console display
//! - [`lifecycle`]: starts and stops sessions on attach/detach

pub mod lifecycle;
pub mod observation;
pub mod sampler;
