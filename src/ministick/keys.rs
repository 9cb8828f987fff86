//! # Movement Keys
//!
//! Abstract movement keys and the fixed direction-to-keys table.
//!
//! | Direction | Keys |
//! |-------------|---------------------------|
//! | Neutral | (none) |
//! | Up | Forward |
//! | Down | Back |
//! | Left | StrafeLeft |
//! | Right | StrafeRight |
//! | TopRight | Forward + StrafeRight |
//! | TopLeft | Forward + StrafeLeft |
//! | BottomRight | Back + StrafeRight |
//! | BottomLeft | Back + StrafeLeft |

use std::fmt;

use super::direction::Direction;

/// Abstract movement key. Bound to a physical key by the injector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveKey {
    Forward,
    Back,
    StrafeLeft,
    StrafeRight,
}

impl MoveKey {
    /// The full key universe, released unconditionally on shutdown.
    pub const ALL: [MoveKey; 4] = [
        MoveKey::Forward,
        MoveKey::Back,
        MoveKey::StrafeLeft,
        MoveKey::StrafeRight,
    ];

    #[inline]
    const fn bit(self) -> u8 {
        match self {
            MoveKey::Forward => 0b0001,
            MoveKey::Back => 0b0010,
            MoveKey::StrafeLeft => 0b0100,
            MoveKey::StrafeRight => 0b1000,
        }
    }
}

/// Small set of [`MoveKey`]s backed by a bitmask.
///
/// # Examples
///
/// ```
/// use hotas_ministick::ministick::keys::{KeySet, MoveKey};
///
/// let held = KeySet::EMPTY.with(MoveKey::Forward).with(MoveKey::StrafeRight);
/// assert!(held.contains(MoveKey::Forward));
/// assert_eq!(held.len(), 2);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeySet(u8);

impl KeySet {
    /// The empty set.
    pub const EMPTY: KeySet = KeySet(0);

    /// Returns a copy of this set with `key` added.
    #[must_use]
    pub const fn with(self, key: MoveKey) -> Self {
        KeySet(self.0 | key.bit())
    }

    #[must_use]
    pub fn contains(&self, key: MoveKey) -> bool {
        self.0 & key.bit() != 0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Keys in `self` that are not in `other`.
    #[must_use]
    pub fn difference(&self, other: KeySet) -> KeySet {
        KeySet(self.0 & !other.0)
    }

    /// Keys in exactly one of `self` and `other`.
    #[must_use]
    pub fn symmetric_difference(&self, other: KeySet) -> KeySet {
        KeySet(self.0 ^ other.0)
    }

    /// Iterates the keys in [`MoveKey::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = MoveKey> + '_ {
        MoveKey::ALL.into_iter().filter(move |key| self.contains(*key))
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<MoveKey> for KeySet {
    fn from_iter<T: IntoIterator<Item = MoveKey>>(iter: T) -> Self {
        iter.into_iter().fold(KeySet::EMPTY, KeySet::with)
    }
}

/// Returns the keys that must be held to represent `direction`.
///
/// # Examples
///
/// ```
/// use hotas_ministick::ministick::direction::Direction;
/// use hotas_ministick::ministick::keys::{keys_for, MoveKey};
///
/// let keys = keys_for(Direction::TopLeft);
/// assert!(keys.contains(MoveKey::Forward));
/// assert!(keys.contains(MoveKey::StrafeLeft));
/// assert!(keys_for(Direction::Neutral).is_empty());
/// ```
#[must_use]
pub fn keys_for(direction: Direction) -> KeySet {
    use MoveKey::*;

    match direction {
        Direction::Neutral => KeySet::EMPTY,
        Direction::Up => KeySet::EMPTY.with(Forward),
        Direction::Down => KeySet::EMPTY.with(Back),
        Direction::Left => KeySet::EMPTY.with(StrafeLeft),
        Direction::Right => KeySet::EMPTY.with(StrafeRight),
        Direction::TopRight => KeySet::EMPTY.with(Forward).with(StrafeRight),
        Direction::TopLeft => KeySet::EMPTY.with(Forward).with(StrafeLeft),
        Direction::BottomRight => KeySet::EMPTY.with(Back).with(StrafeRight),
        Direction::BottomLeft => KeySet::EMPTY.with(Back).with(StrafeLeft),
    }
}
