//! # Keyboard Module
//!
//! Turns direction changes into key-down/key-up events on the host.
//!
//! This module handles:
//! - Diffing the previous and next key sets into a minimal set of events
//! - Unconditional release of every movement key on shutdown
//! - The uinput virtual keyboard that performs the injection
//!
//! The [`KeyStateDriver`] is shared between a session's sampling loop and
//! the lifecycle coordinator. Every operation runs under one lock, so a
//! release forced by a detach can never land in the middle of a transition.

pub mod injector_trait;
pub mod uinput;

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::error::Result;
use crate::ministick::keys::{KeySet, MoveKey};
use injector_trait::KeyInjector;

struct DriverState<I> {
    injector: I,
    closed: bool,
}

/// Emits the key events needed to move from one key set to another.
///
/// Once [`close`](KeyStateDriver::close) has run, transitions become no-ops
/// so nothing can press a key after the session has been torn down.
pub struct KeyStateDriver<I> {
    state: Mutex<DriverState<I>>,
}

impl<I> std::fmt::Debug for KeyStateDriver<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStateDriver")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl<I: KeyInjector> KeyStateDriver<I> {
    /// Wraps an injector. No keys are assumed to be held.
    #[must_use]
    pub fn new(injector: I) -> Self {
        Self {
            state: Mutex::new(DriverState {
                injector,
                closed: false,
            }),
        }
    }

    /// Releases keys in `previous` but not `next`, then presses keys in
    /// `next` but not `previous`.
    ///
    /// # Errors
    ///
    /// Returns the first injection error. Keys emitted before the failure
    /// stay emitted.
    pub fn transition(&self, previous: KeySet, next: KeySet) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            debug!("Ignoring transition {:?} -> {:?} on closed driver", previous, next);
            return Ok(());
        }

        for key in previous.difference(next).iter() {
            state.injector.key_up(key)?;
        }
        for key in next.difference(previous).iter() {
            state.injector.key_down(key)?;
        }

        debug!("Keys {:?} -> {:?}", previous, next);
        Ok(())
    }

    /// Emits key-up for every movement key regardless of tracked state.
    ///
    /// Individual failures are logged and the remaining keys are still
    /// attempted.
    pub fn release_all(&self) {
        let mut state = self.lock();
        Self::release_locked(&mut state.injector);
    }

    /// Releases every key and refuses further transitions.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        Self::release_locked(&mut state.injector);
    }

    fn release_locked(injector: &mut I) {
        for key in MoveKey::ALL {
            if let Err(e) = injector.key_up(key) {
                warn!("Failed to release {:?}: {}", key, e);
            }
        }
    }
}

impl<I> KeyStateDriver<I> {
    /// Returns `true` once [`close`](KeyStateDriver::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    // A panic while holding the lock cannot leave the injector half-built,
    // so a poisoned lock is still usable for releasing keys.
    fn lock(&self) -> MutexGuard<'_, DriverState<I>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
