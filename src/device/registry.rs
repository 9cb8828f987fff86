//! # Device Registry
//!
//! Lock-guarded set of connected controllers with added/removed
//! notifications.
//!
//! All reads and writes of the membership set happen under one mutex.
//! Notifications are delivered after the lock is released, over one
//! unbounded channel per subscriber, so a slow subscriber never holds up a
//! membership change.
//!
//! ## Waiting for a Device
//!
//! [`DeviceRegistry::wait_for_attach`] subscribes and snapshots membership
//! inside the same critical section. A device added before that section is
//! found in the snapshot; one added after it is delivered on the
//! subscription. Either way it is reported exactly once.
//!
//! ```
//! use hotas_ministick::device::registry::DeviceRegistry;
//! use hotas_ministick::device::DeviceIdentity;
//!
//! # tokio_test::block_on(async {
//! let registry = DeviceRegistry::new();
//! assert!(!registry.is_connected(DeviceIdentity::THROTTLE));
//! registry.close();
//! assert!(registry.wait_for_attach(DeviceIdentity::THROTTLE).await.is_none());
//! # });
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::{ControllerInfo, DeviceIdentity};

/// Membership change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Added(ControllerInfo),
    Removed(ControllerInfo),
}

/// Identifies one subscription for unsubscribing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Receiving end of a registry subscription
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<RegistryEvent>,
}

impl Subscription {
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next event. Returns `None` once unsubscribed or the
    /// registry has been closed.
    pub async fn recv(&mut self) -> Option<RegistryEvent> {
        self.receiver.recv().await
    }
}

#[derive(Default)]
struct RegistryState {
    devices: HashMap<PathBuf, ControllerInfo>,
    subscribers: Vec<(SubscriptionId, mpsc::UnboundedSender<RegistryEvent>)>,
    next_id: u64,
    closed: bool,
}

impl RegistryState {
    fn subscribe(&mut self) -> Subscription {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let (sender, receiver) = mpsc::unbounded_channel();
        // Subscribing to a closed registry yields an already-ended stream
        if !self.closed {
            self.subscribers.push((id, sender));
        }
        Subscription { id, receiver }
    }

    fn first_match(&self, identity: DeviceIdentity) -> Option<ControllerInfo> {
        self.devices
            .values()
            .filter(|info| info.matches(identity))
            .min_by(|a, b| a.path.cmp(&b.path))
            .cloned()
    }

    fn senders(&self) -> Vec<mpsc::UnboundedSender<RegistryEvent>> {
        self.subscribers.iter().map(|(_, tx)| tx.clone()).collect()
    }
}

/// Shared registry of connected controllers
#[derive(Default)]
pub struct DeviceRegistry {
    state: Mutex<RegistryState>,
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("DeviceRegistry")
            .field("devices", &state.devices.len())
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(senders: Vec<mpsc::UnboundedSender<RegistryEvent>>, events: &[RegistryEvent]) {
        for event in events {
            for sender in &senders {
                // A closed receiver just means the subscriber went away
                let _ = sender.send(event.clone());
            }
        }
    }

    /// Subscribe to added/removed notifications
    pub fn subscribe(&self) -> Subscription {
        self.lock().subscribe()
    }

    /// Stop delivering notifications to a subscription
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.lock().subscribers.retain(|(sub, _)| *sub != id);
    }

    /// Drop every subscriber, ending their `recv` loops. Later
    /// subscriptions end immediately.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.subscribers.clear();
    }

    /// Record an attached controller. Re-adding a known node is a no-op.
    pub fn add(&self, info: ControllerInfo) {
        let senders = {
            let mut state = self.lock();
            if state.devices.contains_key(&info.path) {
                trace!("Ignoring duplicate add for {}", info.path.display());
                return;
            }
            state.devices.insert(info.path.clone(), info.clone());
            state.senders()
        };

        debug!("Controller added: {} ({})", info.name, info.identity);
        Self::dispatch(senders, &[RegistryEvent::Added(info)]);
    }

    /// Record a detached controller. Removing an unknown node is a no-op.
    pub fn remove(&self, path: &std::path::Path) {
        let (senders, info) = {
            let mut state = self.lock();
            let Some(info) = state.devices.remove(path) else {
                trace!("Ignoring remove for unknown {}", path.display());
                return;
            };
            (state.senders(), info)
        };

        debug!("Controller removed: {} ({})", info.name, info.identity);
        Self::dispatch(senders, &[RegistryEvent::Removed(info)]);
    }

    /// Replace membership with `present`, emitting removals then additions
    /// for the difference. Controllers already known are left untouched.
    ///
    /// A known path whose info changed (a replug that reused the node name)
    /// is reported as removed, then added.
    pub fn sync(&self, present: Vec<ControllerInfo>) {
        let (senders, events) = {
            let mut state = self.lock();
            let mut events = Vec::new();

            let gone: Vec<PathBuf> = state
                .devices
                .keys()
                .filter(|path| !present.iter().any(|info| &info.path == *path))
                .cloned()
                .collect();
            for path in gone {
                if let Some(info) = state.devices.remove(&path) {
                    events.push(RegistryEvent::Removed(info));
                }
            }

            for info in present {
                if state.devices.get(&info.path) == Some(&info) {
                    continue;
                }
                if let Some(previous) = state.devices.insert(info.path.clone(), info.clone()) {
                    events.push(RegistryEvent::Removed(previous));
                }
                events.push(RegistryEvent::Added(info));
            }

            if events.is_empty() {
                return;
            }
            (state.senders(), events)
        };

        debug!("Registry sync produced {} event(s)", events.len());
        Self::dispatch(senders, &events);
    }

    /// Copy of every connected controller
    pub fn snapshot(&self) -> Vec<ControllerInfo> {
        let mut devices: Vec<_> = self.lock().devices.values().cloned().collect();
        devices.sort_by(|a, b| a.path.cmp(&b.path));
        devices
    }

    /// Returns `true` if a controller of this model is connected
    pub fn is_connected(&self, identity: DeviceIdentity) -> bool {
        self.lock().devices.values().any(|info| info.matches(identity))
    }

    /// First connected controller of this model, by node path
    pub fn find(&self, identity: DeviceIdentity) -> Option<ControllerInfo> {
        self.lock().first_match(identity)
    }

    /// Wait until a controller of this model is present
    ///
    /// Resolves immediately if one is already connected. Returns `None` if
    /// the registry is closed first.
    pub async fn wait_for_attach(&self, identity: DeviceIdentity) -> Option<ControllerInfo> {
        let mut subscription = {
            let mut state = self.lock();
            if let Some(info) = state.first_match(identity) {
                return Some(info);
            }
            state.subscribe()
        };

        let found = loop {
            match subscription.recv().await {
                Some(RegistryEvent::Added(info)) if info.matches(identity) => break Some(info),
                Some(_) => continue,
                None => break None,
            }
        };

        self.unsubscribe(subscription.id());
        found
    }
}
