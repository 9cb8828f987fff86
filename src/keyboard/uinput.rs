//! # Virtual Keyboard
//!
//! Linux uinput keyboard used to inject movement keys into the host.
//!
//! ## Key Bindings
//!
//! | Move key | evdev key |
//! |-------------|-----------|
//! | Forward | KEY_W |
//! | Back | KEY_S |
//! | StrafeLeft | KEY_A |
//! | StrafeRight | KEY_D |
//!
//! Creating the device requires write access to `/dev/uinput`.

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key};
use tracing::{debug, info};

use super::injector_trait::KeyInjector;
use crate::error::{HotasError, Result};
use crate::ministick::keys::MoveKey;

/// Name advertised by the virtual keyboard
pub const VIRTUAL_KEYBOARD_NAME: &str = "HOTAS Mini-Stick Keyboard";

/// evdev key value for a press
const KEY_PRESSED: i32 = 1;

/// evdev key value for a release
const KEY_RELEASED: i32 = 0;

/// Maps an abstract movement key onto the host keyboard.
#[must_use]
pub fn key_code(key: MoveKey) -> Key {
    match key {
        MoveKey::Forward => Key::KEY_W,
        MoveKey::Back => Key::KEY_S,
        MoveKey::StrafeLeft => Key::KEY_A,
        MoveKey::StrafeRight => Key::KEY_D,
    }
}

/// uinput-backed [`KeyInjector`]
pub struct UinputKeyboard {
    device: VirtualDevice,
}

impl std::fmt::Debug for UinputKeyboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UinputKeyboard").finish_non_exhaustive()
    }
}

impl UinputKeyboard {
    /// Create the virtual keyboard
    ///
    /// # Errors
    ///
    /// Returns `Injector` error if `/dev/uinput` cannot be opened or the
    /// device cannot be registered.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hotas_ministick::keyboard::uinput::UinputKeyboard;
    ///
    /// let keyboard = UinputKeyboard::create()?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn create() -> Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        for key in MoveKey::ALL {
            keys.insert(key_code(key));
        }

        let device = VirtualDeviceBuilder::new()
            .and_then(|builder| builder.name(VIRTUAL_KEYBOARD_NAME).with_keys(&keys))
            .and_then(|builder| builder.build())
            .map_err(|e| HotasError::Injector(format!("Failed to create virtual keyboard: {}", e)))?;

        info!("Created virtual keyboard: {}", VIRTUAL_KEYBOARD_NAME);
        Ok(Self { device })
    }

    fn emit(&mut self, key: MoveKey, value: i32) -> Result<()> {
        let code = key_code(key);
        // VirtualDevice::emit appends the SYN_REPORT
        self.device
            .emit(&[InputEvent::new(EventType::KEY, code.code(), value)])
            .map_err(|e| HotasError::Injector(format!("Failed to emit {:?}: {}", code, e)))?;

        debug!("Injected {:?} = {}", code, value);
        Ok(())
    }
}

impl KeyInjector for UinputKeyboard {
    fn key_down(&mut self, key: MoveKey) -> Result<()> {
        self.emit(key, KEY_PRESSED)
    }

    fn key_up(&mut self, key: MoveKey) -> Result<()> {
        self.emit(key, KEY_RELEASED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wasd_bindings() {
        assert_eq!(key_code(MoveKey::Forward), Key::KEY_W);
        assert_eq!(key_code(MoveKey::StrafeLeft), Key::KEY_A);
        assert_eq!(key_code(MoveKey::Back), Key::KEY_S);
        assert_eq!(key_code(MoveKey::StrafeRight), Key::KEY_D);
    }

    #[test]
    fn test_bindings_are_unique() {
        for (i, a) in MoveKey::ALL.iter().enumerate() {
            for b in &MoveKey::ALL[i + 1..] {
                assert_ne!(key_code(*a), key_code(*b));
            }
        }
    }

    // Integration test - only runs with /dev/uinput access
    #[test]
    #[ignore]
    fn test_create_with_real_uinput() {
        let mut keyboard = UinputKeyboard::create().expect("uinput not available");
        for key in MoveKey::ALL {
            keyboard.key_up(key).unwrap();
        }
    }
}
