//! Device records and the ordered device inventory

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents one configured device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Device file path (never opened)
    pub path: String,
    /// Device label, identifier prefix followed by the expanded suffix
    pub major: String,
    /// Sequential number assigned in discovery order
    pub device_number: u32,
}

impl fmt::Display for DeviceRecord {
    /// Formats as `path:major`, the token exported to job environments
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.major)
    }
}

/// Ordered device inventory.
///
/// Position `i` in the inventory is bit `i` in any allocation bitmap.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    devices: Vec<DeviceRecord>,
}

impl Inventory {
    /// Create an empty inventory
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an inventory from records received from another process.
    ///
    /// Device numbers are kept as sent.
    pub fn from_records(devices: Vec<DeviceRecord>) -> Self {
        Self { devices }
    }

    /// Append a device, assigning it the next device number
    pub fn push(&mut self, path: &str, major: String) -> &DeviceRecord {
        let device_number = self.next_device_number();
        self.devices.push(DeviceRecord {
            path: path.to_string(),
            major,
            device_number,
        });
        &self.devices[self.devices.len() - 1]
    }

    /// Append a device whose number was assigned by the caller
    pub fn push_record(&mut self, record: DeviceRecord) -> &DeviceRecord {
        self.devices.push(record);
        &self.devices[self.devices.len() - 1]
    }

    /// Number the next pushed device will receive
    pub fn next_device_number(&self) -> u32 {
        self.devices
            .last()
            .map(|d| d.device_number + 1)
            .unwrap_or(0)
    }

    /// Number of devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the inventory holds no devices
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Device at inventory position `index`
    pub fn get(&self, index: usize) -> Option<&DeviceRecord> {
        self.devices.get(index)
    }

    /// Devices in inventory order
    pub fn iter(&self) -> std::slice::Iter<'_, DeviceRecord> {
        self.devices.iter()
    }

    /// Borrow the records as a slice
    pub fn devices(&self) -> &[DeviceRecord] {
        &self.devices
    }
}

impl<'a> IntoIterator for &'a Inventory {
    type Item = &'a DeviceRecord;
    type IntoIter = std::slice::Iter<'a, DeviceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}
