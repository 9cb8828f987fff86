//! # Hot-Plug Scanner
//!
//! Periodically enumerates `/dev/input/event*` and feeds the
//! [`DeviceRegistry`], which turns membership changes into added/removed
//! notifications.
//!
//! Nodes already seen are not reopened unless the node was recreated (a
//! replug that got the same `eventN` name back). A node that disappears
//! between scans is reported as removed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use evdev::Device;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::registry::DeviceRegistry;
use super::throttle::describe;
use super::{ControllerInfo, NodeStamp};

/// Directory holding evdev nodes
pub const INPUT_DIR: &str = "/dev/input";

/// Source of the current controller list
pub trait DeviceEnumerator: Send {
    /// Describe every controller currently present
    fn scan(&mut self) -> Vec<ControllerInfo>;
}

/// Enumerates evdev nodes, caching identities of nodes already opened
#[derive(Debug)]
pub struct EvdevEnumerator {
    input_dir: PathBuf,
    known: HashMap<PathBuf, ControllerInfo>,
    // Set after the first failed read of `input_dir`, cleared on success
    dir_unreadable: bool,
}

impl Default for EvdevEnumerator {
    fn default() -> Self {
        Self::new(INPUT_DIR)
    }
}

impl EvdevEnumerator {
    pub fn new<P: AsRef<Path>>(input_dir: P) -> Self {
        Self {
            input_dir: input_dir.as_ref().to_path_buf(),
            known: HashMap::new(),
            dir_unreadable: false,
        }
    }

    fn event_nodes(&mut self) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.input_dir) {
            Ok(entries) => entries,
            Err(e) => {
                if self.dir_unreadable {
                    debug!("Failed to read {}: {}", self.input_dir.display(), e);
                } else {
                    warn!("Failed to read {}: {}", self.input_dir.display(), e);
                    self.dir_unreadable = true;
                }
                return Vec::new();
            }
        };
        self.dir_unreadable = false;

        let mut nodes: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().starts_with("event"))
                    .unwrap_or(false)
            })
            .collect();
        nodes.sort();
        nodes
    }
}

impl DeviceEnumerator for EvdevEnumerator {
    fn scan(&mut self) -> Vec<ControllerInfo> {
        let nodes = self.event_nodes();
        self.known.retain(|path, _| nodes.contains(path));

        for path in nodes {
            let Some(node) = NodeStamp::of(&path) else {
                self.known.remove(&path);
                continue;
            };
            if self.known.get(&path).is_some_and(|info| info.node == node) {
                continue;
            }
            match Device::open(&path) {
                Ok(device) => {
                    let info = describe(&path, node, &device);
                    debug!(
                        "Found input device: {} ({}, {})",
                        path.display(),
                        info.name,
                        info.identity
                    );
                    self.known.insert(path, info);
                }
                Err(e) => {
                    // Permission denied or other errors - skip device
                    self.known.remove(&path);
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        let mut present: Vec<_> = self.known.values().cloned().collect();
        present.sort_by(|a, b| a.path.cmp(&b.path));
        present
    }
}

/// Keeps a [`DeviceRegistry`] in step with the enumerator
pub struct HotplugScanner<E> {
    enumerator: E,
    registry: Arc<DeviceRegistry>,
    period: Duration,
}

impl<E: DeviceEnumerator> HotplugScanner<E> {
    pub fn new(enumerator: E, registry: Arc<DeviceRegistry>, period: Duration) -> Self {
        Self {
            enumerator,
            registry,
            period,
        }
    }

    /// Scan once and publish the differences
    pub fn rescan(&mut self) {
        let present = self.enumerator.scan();
        self.registry.sync(present);
    }

    /// Rescan every period until cancelled
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Watching for controllers every {:?}", self.period);
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.rescan(),
            }
        }

        debug!("Hot-plug scanner stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::fixtures::{gamepad_info, replugged, throttle_info};
    use crate::device::registry::RegistryEvent;
    use crate::device::DeviceIdentity;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Enumerator that replays a fixed sequence of scans
    #[derive(Clone, Default)]
    struct ScriptedEnumerator {
        scans: Arc<Mutex<VecDeque<Vec<ControllerInfo>>>>,
    }

    impl ScriptedEnumerator {
        fn push(&self, scan: Vec<ControllerInfo>) {
            self.scans.lock().unwrap().push_back(scan);
        }
    }

    impl DeviceEnumerator for ScriptedEnumerator {
        fn scan(&mut self) -> Vec<ControllerInfo> {
            self.scans.lock().unwrap().pop_front().unwrap_or_default()
        }
    }

    #[tokio::test]
    async fn test_rescan_reports_attach_and_detach() {
        let registry = Arc::new(DeviceRegistry::new());
        let enumerator = ScriptedEnumerator::default();
        enumerator.push(vec![gamepad_info("/dev/input/event2")]);
        enumerator.push(vec![
            gamepad_info("/dev/input/event2"),
            throttle_info("/dev/input/event5"),
        ]);
        enumerator.push(vec![gamepad_info("/dev/input/event2")]);

        let mut scanner =
            HotplugScanner::new(enumerator, registry.clone(), Duration::from_millis(10));
        let mut sub = registry.subscribe();

        scanner.rescan();
        assert!(matches!(sub.recv().await, Some(RegistryEvent::Added(info)) if info.path == Path::new("/dev/input/event2")));

        scanner.rescan();
        assert_eq!(
            sub.recv().await,
            Some(RegistryEvent::Added(throttle_info("/dev/input/event5")))
        );
        assert!(registry.is_connected(DeviceIdentity::THROTTLE));

        scanner.rescan();
        assert_eq!(
            sub.recv().await,
            Some(RegistryEvent::Removed(throttle_info("/dev/input/event5")))
        );
        assert!(!registry.is_connected(DeviceIdentity::THROTTLE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_cancelled() {
        let registry = Arc::new(DeviceRegistry::new());
        let enumerator = ScriptedEnumerator::default();
        enumerator.push(vec![]);
        enumerator.push(vec![throttle_info("/dev/input/event5")]);
        for _ in 0..10 {
            enumerator.push(vec![throttle_info("/dev/input/event5")]);
        }

        let cancel = CancellationToken::new();
        let scanner =
            HotplugScanner::new(enumerator, registry.clone(), Duration::from_millis(100));
        let task = tokio::spawn(scanner.run(cancel.clone()));

        let found = registry.wait_for_attach(DeviceIdentity::THROTTLE).await;
        assert_eq!(found, Some(throttle_info("/dev/input/event5")));

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_rescan_reports_replug_on_same_node() {
        let registry = Arc::new(DeviceRegistry::new());
        let before = throttle_info("/dev/input/event5");
        let after = replugged(&before);
        let enumerator = ScriptedEnumerator::default();
        enumerator.push(vec![before.clone()]);
        enumerator.push(vec![after.clone()]);

        let mut scanner =
            HotplugScanner::new(enumerator, registry.clone(), Duration::from_millis(10));
        scanner.rescan();
        let mut sub = registry.subscribe();

        scanner.rescan();
        assert_eq!(sub.recv().await, Some(RegistryEvent::Removed(before)));
        assert_eq!(sub.recv().await, Some(RegistryEvent::Added(after)));
    }

    #[test]
    fn test_enumerator_on_missing_dir_is_empty() {
        let mut enumerator = EvdevEnumerator::new("/nonexistent/input/dir");
        assert!(enumerator.scan().is_empty());
        assert!(enumerator.dir_unreadable);

        // Later failures stay flagged (logged at debug only)
        assert!(enumerator.scan().is_empty());
        assert!(enumerator.dir_unreadable);
    }

    #[test]
    fn test_enumerator_clears_unreadable_flag_when_dir_appears() {
        let root = tempfile::tempdir().unwrap();
        let input_dir = root.path().join("input");
        let mut enumerator = EvdevEnumerator::new(&input_dir);

        enumerator.scan();
        assert!(enumerator.dir_unreadable);

        std::fs::create_dir(&input_dir).unwrap();
        enumerator.scan();
        assert!(!enumerator.dir_unreadable);
    }

    #[test]
    fn test_enumerator_skips_non_event_and_unopenable_nodes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("js0"), b"").unwrap();
        std::fs::write(dir.path().join("event0"), b"").unwrap();

        // Plain files are not evdev devices, so opening them fails
        let mut enumerator = EvdevEnumerator::new(dir.path());
        assert!(enumerator.scan().is_empty());
    }
}
