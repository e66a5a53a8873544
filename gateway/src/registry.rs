use crate::error::Result;
use crate::models::{DeviceRecord, SpeakerId};
use crate::transport::discovery::Discovery;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type DeviceMap = HashMap<SpeakerId, DeviceRecord>;

/// Discovered speakers keyed by stable id.
///
/// The map is never edited in place: `replace` swaps in a whole new map, so a
/// reader always sees one complete discovery pass. Clones share the same map.
#[derive(Clone, Default)]
pub struct DeviceRegistry {
    devices: Arc<RwLock<Arc<DeviceMap>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically swap in the result of a discovery pass.
    ///
    /// Entries are re-keyed by their own id so the key always matches the record.
    pub fn replace(&self, devices: DeviceMap) {
        let devices: DeviceMap = devices
            .into_values()
            .map(|record| (record.id.clone(), record))
            .collect();
        let devices = Arc::new(devices);

        match self.devices.write() {
            Ok(mut current) => *current = devices,
            Err(poisoned) => *poisoned.into_inner() = devices,
        }
    }

    /// Run a discovery pass and replace the registry with its result
    pub fn refresh(&self, discovery: &Discovery) -> Result<usize> {
        let devices = discovery.discover()?;
        let count = devices.len();
        self.replace(devices);
        Ok(count)
    }

    /// Consistent view of the current pass; holds no lock once returned
    pub fn snapshot(&self) -> Arc<DeviceMap> {
        match self.devices.read() {
            Ok(current) => Arc::clone(&*current),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// All speakers, ordered by display name then id
    pub fn list(&self) -> Vec<DeviceRecord> {
        let mut devices: Vec<DeviceRecord> = self.snapshot().values().cloned().collect();
        devices.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.id.cmp(&b.id))
        });
        devices
    }

    pub fn lookup(&self, id: &SpeakerId) -> Option<DeviceRecord> {
        self.snapshot().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}
