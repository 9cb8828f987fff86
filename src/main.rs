//! # HOTAS Mini-Stick
//!
//! Drive WASD movement keys from the mini-stick on a HOTAS
//! throttle.
//!
//! Run with an optional config path (defaults to `config/default.toml`):
//! ```bash
//! cargo run --release -- config/default.toml
//! ```
//!
//! Expected output:
//! ```text
//! INFO hotas_ministick: HOTAS Mini-Stick v0.1.0 starting...
//! INFO hotas_ministick::monitor::lifecycle: Waiting for throttle device to connect...
//! INFO hotas_ministick::monitor::lifecycle: Throttle connected: Saitek Pro Flight X-56 Rhino Throttle
//! INFO hotas_ministick::monitor::observation: Warm-up period: ignoring initial readings
//! INFO hotas_ministick::monitor::observation: Mini stick axis 0: 0.502, axis 1: 0.498, direction: Neutral
//! ```

use std::io::BufRead;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hotas_ministick::config::{Config, DEFAULT_CONFIG_PATH};
use hotas_ministick::device::registry::DeviceRegistry;
use hotas_ministick::device::scanner::{EvdevEnumerator, HotplugScanner};
use hotas_ministick::device::DeviceIdentity;
use hotas_ministick::monitor::lifecycle::{DeviceLifecycleCoordinator, LinuxBackend};

/// Application name shown in the startup banner
const APP_NAME: &str = "HOTAS Mini-Stick";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("{} v{} starting...", APP_NAME, env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;
    debug!("Using {:?}", config);

    let registry = Arc::new(DeviceRegistry::new());
    let mut scanner = HotplugScanner::new(
        EvdevEnumerator::default(),
        registry.clone(),
        config.rescan_interval(),
    );
    // Populate the registry before the coordinator looks at it
    scanner.rescan();

    let scanner_cancel = CancellationToken::new();
    let scanner_task = tokio::spawn(scanner.run(scanner_cancel.clone()));

    info!("Press Enter to exit");

    let mut coordinator = DeviceLifecycleCoordinator::new(
        LinuxBackend,
        DeviceIdentity::THROTTLE,
        config.session_settings(),
    );
    coordinator.run(&registry, quit_requested()).await;

    scanner_cancel.cancel();
    scanner_task.await.context("Hot-plug scanner task failed")?;
    registry.close();

    info!("Done");
    Ok(())
}

/// Resolves on Ctrl+C or a line on stdin.
///
/// A closed stdin (e.g. running detached) leaves only Ctrl+C.
async fn quit_requested() {
    let enter = async {
        let line = spawn_line_listener(std::io::BufReader::new(std::io::stdin()));
        if line.await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = enter => info!("Enter pressed, shutting down..."),
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down..."),
    }
}

/// Read one line from `input` on a plain thread and fire once it arrives.
///
/// The receiver errors on EOF or a read failure. The thread is never joined,
/// so a read still blocked at exit does not keep the process alive.
fn spawn_line_listener<R>(mut input: R) -> oneshot::Receiver<()>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let spawned = std::thread::Builder::new()
        .name("stdin-quit".to_string())
        .spawn(move || {
            let mut line = String::new();
            if matches!(input.read_line(&mut line), Ok(n) if n > 0) {
                let _ = tx.send(());
            }
        });

    if let Err(e) = spawned {
        warn!("Cannot watch stdin, use Ctrl+C to exit: {}", e);
    }
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        assert!(DEFAULT_CONFIG_PATH.ends_with(".toml"));
    }

    #[test]
    fn test_target_identity() {
        assert_eq!(DeviceIdentity::THROTTLE.to_string(), "0738:a215");
    }

    #[tokio::test]
    async fn test_line_listener_fires_on_enter() {
        let line = spawn_line_listener(std::io::Cursor::new(b"\n".to_vec()));
        assert!(line.await.is_ok());
    }

    #[tokio::test]
    async fn test_line_listener_on_eof_does_not_fire() {
        let line = spawn_line_listener(std::io::Cursor::new(Vec::new()));
        assert!(line.await.is_err());
    }

    #[tokio::test]
    async fn test_blocked_listener_does_not_hold_up_runtime() {
        // A reader that never returns, like an idle terminal
        struct Blocked;
        impl std::io::Read for Blocked {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                loop {
                    std::thread::park();
                }
            }
        }

        let line = spawn_line_listener(std::io::BufReader::new(Blocked));
        let quit = async {
            if line.await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(50), quit).await;
        assert!(timed_out.is_err());
        // Returning here shuts the test runtime down with the thread still blocked
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_on_closed_registry() {
        let registry = DeviceRegistry::new();
        registry.close();

        let mut coordinator = DeviceLifecycleCoordinator::new(
            LinuxBackend,
            DeviceIdentity::THROTTLE,
            Config::default().session_settings(),
        );
        coordinator.run(&registry, std::future::pending()).await;
        assert!(!coordinator.is_active());
    }
}
