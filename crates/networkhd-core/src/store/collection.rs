// ── Merged device collection ──
//
// Insertion-ordered map of devices keyed by true name. Held inside an
// immutable snapshot; mutation happens on a private copy before the copy
// is published.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{DeviceRole, MergedDevice};

/// All devices of one snapshot, keyed by true name.
///
/// Devices keep the order in which the identity reply listed them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceCollection {
    devices: IndexMap<String, MergedDevice>,
}

impl DeviceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a device. Returns the previous entry, if any.
    pub fn insert(&mut self, device: MergedDevice) -> Option<MergedDevice> {
        self.devices.insert(device.true_name().to_owned(), device)
    }

    /// Look up by true name only.
    pub fn get(&self, true_name: &str) -> Option<&MergedDevice> {
        self.devices.get(true_name)
    }

    pub fn get_mut(&mut self, true_name: &str) -> Option<&mut MergedDevice> {
        self.devices.get_mut(true_name)
    }

    /// Look up by true name, falling back to a case-sensitive alias match.
    pub fn find(&self, name: &str) -> Option<&MergedDevice> {
        self.devices
            .get(name)
            .or_else(|| self.devices.values().find(|d| d.alias_name() == name))
    }

    /// Mutable variant of [`find`](Self::find).
    pub fn find_mut(&mut self, name: &str) -> Option<&mut MergedDevice> {
        let key = self.resolve(name)?.to_owned();
        self.devices.get_mut(&key)
    }

    /// True name for `name`, which may be a true name or an alias.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.find(name).map(MergedDevice::true_name)
    }

    pub fn contains(&self, true_name: &str) -> bool {
        self.devices.contains_key(true_name)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MergedDevice> {
        self.devices.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut MergedDevice> {
        self.devices.values_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn with_role(&self, role: DeviceRole) -> impl Iterator<Item = &MergedDevice> {
        self.iter().filter(move |d| d.role() == role)
    }

    pub fn transmitters(&self) -> impl Iterator<Item = &MergedDevice> {
        self.with_role(DeviceRole::Transmitter)
    }

    pub fn receivers(&self) -> impl Iterator<Item = &MergedDevice> {
        self.with_role(DeviceRole::Receiver)
    }

    /// True names of all devices with `role`, in collection order.
    pub fn names_with_role(&self, role: DeviceRole) -> Vec<String> {
        self.with_role(role)
            .map(|d| d.true_name().to_owned())
            .collect()
    }
}

impl FromIterator<MergedDevice> for DeviceCollection {
    fn from_iter<I: IntoIterator<Item = MergedDevice>>(iter: I) -> Self {
        let mut collection = Self::new();
        for device in iter {
            collection.insert(device);
        }
        collection
    }
}

impl<'a> IntoIterator for &'a DeviceCollection {
    type Item = &'a MergedDevice;
    type IntoIter = indexmap::map::Values<'a, String, MergedDevice>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.values()
    }
}
