//! # Device Lifecycle Coordinator
//!
//! Starts a monitoring session when the throttle attaches and tears it down
//! when the throttle detaches or the process quits.
//!
//! ## States
//!
//! Absent -> Present -> Absent -> ...
//!
//! - **Attach** (matching identity, no live session): open the reader and a
//!   virtual keyboard, spawn the sampling loop and the display consumer.
//! - **Attach** while a session is live: ignored.
//! - **Detach** of the session's device: cancel the session and release every
//!   key right away, without waiting for the loop to notice cancellation.
//! - **Loop died** (read fault) while the device is still registered: reopen
//!   it on the next restart tick.
//!
//! The coordinator handles one event at a time through `&mut self`, which is
//! what keeps it to at most one session.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::observation::{self, DisplayConsumer};
use super::sampler::{SamplingLoop, SamplingSettings};
use crate::device::reader_trait::ThrottleReader;
use crate::device::registry::{DeviceRegistry, RegistryEvent};
use crate::device::throttle::EvdevThrottle;
use crate::device::{ControllerInfo, DeviceIdentity};
use crate::error::Result;
use crate::keyboard::injector_trait::KeyInjector;
use crate::keyboard::uinput::UinputKeyboard;
use crate::keyboard::KeyStateDriver;

/// How often a session that died on its own is checked for restart
pub const RESTART_INTERVAL: Duration = Duration::from_secs(1);

/// Opens the per-session collaborators
pub trait SessionBackend: Send + Sync {
    type Reader: ThrottleReader + 'static;
    type Injector: KeyInjector + 'static;

    /// Open the controller for reading
    fn open_reader(&self, info: &ControllerInfo) -> Result<Self::Reader>;

    /// Create the key injector for a new session
    fn open_injector(&self) -> Result<Self::Injector>;
}

/// evdev reader + uinput keyboard
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxBackend;

impl SessionBackend for LinuxBackend {
    type Reader = EvdevThrottle;
    type Injector = UinputKeyboard;

    fn open_reader(&self, info: &ControllerInfo) -> Result<Self::Reader> {
        EvdevThrottle::open(info)
    }

    fn open_injector(&self) -> Result<Self::Injector> {
        UinputKeyboard::create()
    }
}

/// Timing shared by every session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub sampling: SamplingSettings,
    /// Period at which the display consumer takes the newest record
    pub display_interval: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            sampling: SamplingSettings::default(),
            display_interval: Duration::from_millis(100),
        }
    }
}

/// One live monitoring run bound to one attached device
pub struct MonitorSession<I> {
    device: ControllerInfo,
    cancel: CancellationToken,
    driver: Arc<KeyStateDriver<I>>,
    sampler: JoinHandle<Result<()>>,
    display: JoinHandle<()>,
}

impl<I: KeyInjector + 'static> MonitorSession<I> {
    /// Device this session reads
    pub fn device(&self) -> &ControllerInfo {
        &self.device
    }

    /// Returns `true` once the sampling loop has exited on its own
    pub fn is_finished(&self) -> bool {
        self.sampler.is_finished()
    }

    /// Cancel and release every key now; reap the tasks in the background.
    fn abort(self) {
        self.cancel.cancel();
        self.driver.close();

        let name = self.device.name;
        let sampler = self.sampler;
        tokio::spawn(async move {
            log_sampler_exit(&name, sampler.await);
        });
    }

    /// Cancel, wait for both tasks, then release every key.
    async fn finish(self) {
        self.cancel.cancel();
        log_sampler_exit(&self.device.name, self.sampler.await);
        if let Err(e) = self.display.await {
            warn!("Display task failed: {}", e);
        }
        self.driver.close();
    }
}

fn log_sampler_exit(name: &str, result: std::result::Result<Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => debug!("Session for {} ended", name),
        Ok(Err(e)) => error!("Session for {} failed: {}", name, e),
        Err(e) => error!("Session task for {} panicked: {}", name, e),
    }
}

/// Owns at most one [`MonitorSession`] for the target identity
pub struct DeviceLifecycleCoordinator<B: SessionBackend> {
    backend: B,
    identity: DeviceIdentity,
    settings: SessionSettings,
    session: Option<MonitorSession<B::Injector>>,
}

impl<B: SessionBackend> DeviceLifecycleCoordinator<B> {
    pub fn new(backend: B, identity: DeviceIdentity, settings: SessionSettings) -> Self {
        Self {
            backend,
            identity,
            settings,
            session: None,
        }
    }

    /// Returns `true` while a session is running
    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_finished())
    }

    /// Device of the current session, if any
    pub fn active_device(&self) -> Option<&ControllerInfo> {
        self.session.as_ref().map(MonitorSession::device)
    }

    /// Dispatch one registry notification
    pub fn handle(&mut self, event: RegistryEvent) {
        match event {
            RegistryEvent::Added(info) => {
                self.on_added(info);
            }
            RegistryEvent::Removed(info) => self.on_removed(&info),
        }
    }

    /// Start a session for `info` unless one is already running.
    ///
    /// Returns `true` if a new session was started.
    pub fn on_added(&mut self, info: ControllerInfo) -> bool {
        if !info.matches(self.identity) {
            return false;
        }
        if self.is_active() {
            debug!("Session already active, ignoring attach of {}", info.path.display());
            return false;
        }
        if let Some(stale) = self.session.take() {
            // The loop died without a detach (read fault); start over
            stale.abort();
        }

        info!("Throttle connected: {}", info.name);
        match self.start_session(info) {
            Ok(session) => {
                self.session = Some(session);
                true
            }
            Err(e) => {
                error!("Failed to start monitoring: {}", e);
                false
            }
        }
    }

    /// Tear down the session if `info` is its device
    pub fn on_removed(&mut self, info: &ControllerInfo) {
        if !info.matches(self.identity) {
            return;
        }
        info!("Throttle disconnected: {}", info.name);

        match self.session.take() {
            Some(session) if session.device.path == info.path => session.abort(),
            Some(session) => {
                debug!("Detach of {} does not affect active session", info.path.display());
                self.session = Some(session);
            }
            None => {}
        }
    }

    /// Reopen the device if the session's loop exited on its own while a
    /// matching controller is still registered.
    ///
    /// Covers a replug that the registry did not see as a detach. Returns
    /// `true` if a new session was started.
    pub fn restart_if_dead(&mut self, registry: &DeviceRegistry) -> bool {
        if !self.session.as_ref().is_some_and(MonitorSession::is_finished) {
            return false;
        }
        match registry.find(self.identity) {
            Some(info) => {
                warn!("Session ended while {} is attached, reopening", info.path.display());
                self.on_added(info)
            }
            None => false,
        }
    }

    /// Stop the session (if any), wait for it and release every key.
    pub async fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            session.finish().await;
        }
    }

    /// Handle attach/detach until `quit` resolves or the registry closes,
    /// then shut down.
    ///
    /// A throttle already connected when this starts is picked up
    /// immediately.
    pub async fn run<Q>(&mut self, registry: &DeviceRegistry, quit: Q)
    where
        Q: Future<Output = ()>,
    {
        let mut events = registry.subscribe();
        if !registry.is_connected(self.identity) {
            info!("Waiting for throttle device to connect...");
        }

        let first_attach = registry.wait_for_attach(self.identity);
        tokio::pin!(first_attach);
        tokio::pin!(quit);
        let mut waiting = true;

        let mut restart = interval(RESTART_INTERVAL);
        restart.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = restart.tick() => {
                    self.restart_if_dead(registry);
                }
                _ = &mut quit => {
                    info!("Quit requested");
                    break;
                }
                found = &mut first_attach, if waiting => {
                    waiting = false;
                    if let Some(info) = found {
                        self.on_added(info);
                    }
                }
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
            }
        }

        registry.unsubscribe(events.id());
        self.shutdown().await;
    }

    fn start_session(&self, info: ControllerInfo) -> Result<MonitorSession<B::Injector>> {
        let reader = self.backend.open_reader(&info)?;
        let injector = self.backend.open_injector()?;

        let cancel = CancellationToken::new();
        let driver = Arc::new(KeyStateDriver::new(injector));
        let (tx, rx) = observation::channel();

        let sampler = SamplingLoop::new(
            reader,
            driver.clone(),
            tx,
            self.settings.sampling,
            Instant::now(),
        );
        let sampler = tokio::spawn(sampler.run(cancel.clone()));
        let display = tokio::spawn(
            DisplayConsumer::new(rx, self.settings.display_interval).run(cancel.clone()),
        );

        Ok(MonitorSession {
            device: info,
            cancel,
            driver,
            sampler,
            display,
        })
    }
}
