//! # HOTAS Mini-Stick Library
//!
//! Turn the mini-stick on a HOTAS throttle into WASD movement keys.
//!
//! The throttle is polled at a fixed rate, each reading is classified into one
//! of nine directions, and the difference between consecutive directions is
//! emitted as key-down/key-up events on a virtual keyboard.

pub mod config;
pub mod device;
pub mod error;
pub mod keyboard;
pub mod ministick;
pub mod monitor;
