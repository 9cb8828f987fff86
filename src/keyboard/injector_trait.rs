//! Trait abstraction for key injection to enable testing

use crate::error::Result;
use crate::ministick::keys::MoveKey;

/// Trait for host key injection
pub trait KeyInjector: Send {
    /// Press and hold a key
    fn key_down(&mut self, key: MoveKey) -> Result<()>;

    /// Release a key
    fn key_up(&mut self, key: MoveKey) -> Result<()>;
}

impl<T: KeyInjector + ?Sized> KeyInjector for Box<T> {
    fn key_down(&mut self, key: MoveKey) -> Result<()> {
        (**self).key_down(key)
    }

    fn key_up(&mut self, key: MoveKey) -> Result<()> {
        (**self).key_up(key)
    }
}
