//! # Mini-Stick Direction Classifier
//!
//! Maps a pair of normalized mini-stick axis values onto one of nine
//! discrete directions.
//!
//! ## Anchors
//!
//! Each direction owns an anchor point in axis space. A reading matches an
//! anchor when both axes are within [`TOLERANCE`] of it. Anchors are tested
//! in a fixed priority order and the first match wins:
//!
//! | Priority | Anchor (axis0, axis1) | Direction |
//! |----------|-----------------------|-------------|
//! | 1 | (0.5, 0.5) | Neutral |
//! | 2 | (0.0, 0.0) | Up |
//! | 3 | (1.0, 1.0) | Down |
//! | 4 | (1.0, 0.0) | Right |
//! | 5 | (0.0, 1.0) | Left |
//! | 6 | (0.5, 0.0) | TopRight |
//! | 7 | (0.0, 0.5) | TopLeft |
//! | 8 | (0.5, 1.0) | BottomLeft |
//! | 9 | (1.0, 0.5) | BottomRight |
//!
//! The bands overlap, so the order is observable: `(0.25, 0.25)` sits on the
//! edge of both the Neutral and Up bands and resolves to Neutral. Readings
//! outside every band fall back to Neutral.
//!
//! ## Usage
//!
//! ```
//! use hotas_ministick::ministick::direction::{classify, Direction};
//!
//! assert_eq!(classify(0.5, 0.5), Direction::Neutral);
//! assert_eq!(classify(0.02, 0.0), Direction::Up);
//! assert_eq!(classify(0.25, 0.25), Direction::Neutral);
//! ```

use std::fmt;

/// Acceptance radius around each anchor, applied to both axes independently.
pub const TOLERANCE: f64 = 0.25;

/// Anchor table in priority order.
const ANCHORS: [(f64, f64, Direction); 9] = [
    (0.5, 0.5, Direction::Neutral),
    (0.0, 0.0, Direction::Up),
    (1.0, 1.0, Direction::Down),
    (1.0, 0.0, Direction::Right),
    (0.0, 1.0, Direction::Left),
    (0.5, 0.0, Direction::TopRight),
    (0.0, 0.5, Direction::TopLeft),
    (0.5, 1.0, Direction::BottomLeft),
    (1.0, 0.5, Direction::BottomRight),
];

/// Discrete mini-stick direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Stick centered (or outside every band).
    #[default]
    Neutral,
    Up,
    Down,
    Left,
    Right,
    TopRight,
    TopLeft,
    BottomRight,
    BottomLeft,
}

impl Direction {
    /// All nine directions.
    pub const ALL: [Direction; 9] = [
        Direction::Neutral,
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::TopRight,
        Direction::TopLeft,
        Direction::BottomRight,
        Direction::BottomLeft,
    ];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One sample of the two mini-stick axes.
///
/// Values are nominally in `0.0..=1.0` but device noise can push them
/// slightly outside that range.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisReading {
    pub axis0: f64,
    pub axis1: f64,
}

impl AxisReading {
    /// Creates a reading from the two axis values.
    #[must_use]
    pub fn new(axis0: f64, axis1: f64) -> Self {
        Self { axis0, axis1 }
    }

    /// Classifies this reading. See [`classify`].
    #[must_use]
    pub fn direction(&self) -> Direction {
        classify(self.axis0, self.axis1)
    }
}

/// Returns `true` if `value` is within [`TOLERANCE`] of `target`.
#[inline]
fn within_tolerance(value: f64, target: f64) -> bool {
    (value - target).abs() <= TOLERANCE
}

/// Classifies a pair of axis values into a [`Direction`].
///
/// Pure and total: every input, including NaN, maps to exactly one
/// direction. NaN never matches a band and therefore yields Neutral.
///
/// # Arguments
///
/// * `axis0` - First mini-stick axis (normalized)
/// * `axis1` - Second mini-stick axis (normalized)
///
/// # Examples
///
/// ```
/// use hotas_ministick::ministick::direction::{classify, Direction};
///
/// assert_eq!(classify(1.0, 0.0), Direction::Right);
/// assert_eq!(classify(0.5, 1.0), Direction::BottomLeft);
/// ```
#[must_use]
pub fn classify(axis0: f64, axis1: f64) -> Direction {
    ANCHORS
        .iter()
        .find(|(a0, a1, _)| within_tolerance(axis0, *a0) && within_tolerance(axis1, *a1))
        .map(|(_, _, direction)| *direction)
        .unwrap_or(Direction::Neutral)
}
