//! # Error Types
//!
//! Custom error types for the mini-stick bridge using `thiserror`.

use thiserror::Error;

/// Main error type for the mini-stick bridge
#[derive(Debug, Error)]
pub enum HotasError {
    /// Reading from the throttle failed (usually a disconnect mid-poll)
    #[error("Device error: {0}")]
    Device(String),

    /// No device with the requested identity is connected
    #[error("Device not found: vendor {vendor_id}, product {product_id}")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    /// Key injection errors
    #[error("Key injection error: {0}")]
    Injector(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the mini-stick bridge
pub type Result<T> = std::result::Result<T, HotasError>;
