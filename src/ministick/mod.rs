//! # Mini-Stick Module
//!
//! Pure translation from mini-stick axis readings to movement keys.
//!
//! This module handles:
//! - Classifying a 2-axis reading into one of nine directions
//! - Resolving a direction into the set of movement keys to hold

pub mod direction;
pub mod keys;
