use crate::{
    as_object, optional_string, optional_string_list, optional_string_or_list, require_string,
    InventoryError, InventoryResult, FIELD_CONFIGLETS, FIELD_FQDN, FIELD_IMAGE_BUNDLE,
    FIELD_PARENT_ID, FIELD_PARENT_NAME, FIELD_SERIAL, FIELD_SYSMAC,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A device entry from the user inventory. Container name and id are never
/// reconciled against each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Value")]
pub struct DeviceRecord {
    fqdn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    serial_number: Option<String>,
    #[serde(rename = "systemMacAddress", skip_serializing_if = "Option::is_none")]
    system_mac: Option<String>,
    configlets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_container_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_container_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_bundle: Option<Vec<String>>,
}

impl DeviceRecord {
    pub fn new(fqdn: impl Into<String>) -> InventoryResult<Self> {
        let fqdn = fqdn.into();
        if fqdn.trim().is_empty() {
            return Err(InventoryError::validation(format!("field {} is empty", FIELD_FQDN)));
        }
        Ok(Self {
            fqdn,
            serial_number: None,
            system_mac: None,
            configlets: Vec::new(),
            parent_container_name: None,
            parent_container_id: None,
            image_bundle: None,
        })
    }

    pub fn from_value(value: &Value) -> InventoryResult<Self> {
        let map = as_object(value, "device")?;
        let mut record = Self::new(require_string(map, FIELD_FQDN)?)?;
        record.serial_number = optional_string(map, FIELD_SERIAL)?;
        record.system_mac = optional_string(map, FIELD_SYSMAC)?;
        record.configlets = optional_string_list(map, FIELD_CONFIGLETS)?.unwrap_or_default();
        record.parent_container_name = optional_string(map, FIELD_PARENT_NAME)?;
        record.parent_container_id = optional_string(map, FIELD_PARENT_ID)?;
        record.image_bundle = optional_string_or_list(map, FIELD_IMAGE_BUNDLE)?;
        Ok(record)
    }

    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    /// Short hostname: `fqdn` up to the first `.`.
    pub fn hostname(&self) -> &str {
        self.fqdn.split('.').next().unwrap_or(&self.fqdn)
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }

    pub fn system_mac(&self) -> Option<&str> {
        self.system_mac.as_deref()
    }

    pub fn set_system_mac(&mut self, system_mac: impl Into<String>) {
        self.system_mac = Some(system_mac.into());
    }

    pub fn configlets(&self) -> &[String] {
        &self.configlets
    }

    pub fn image_bundle(&self) -> Option<&[String]> {
        self.image_bundle.as_deref()
    }

    pub fn container(&self) -> Option<&str> {
        self.parent_container_name()
    }

    pub fn parent_container_name(&self) -> Option<&str> {
        self.parent_container_name.as_deref()
    }

    pub fn set_parent_container_name(&mut self, name: impl Into<String>) {
        self.parent_container_name = Some(name.into());
    }

    pub fn parent_container_id(&self) -> Option<&str> {
        self.parent_container_id.as_deref()
    }

    pub fn set_parent_container_id(&mut self, id: impl Into<String>) {
        self.parent_container_id = Some(id.into());
    }

    /// Diagnostic view of the populated identity fields.
    pub fn info(&self) -> BTreeMap<&'static str, String> {
        let mut info = BTreeMap::new();
        info.insert(FIELD_FQDN, self.fqdn.clone());
        if let Some(serial) = &self.serial_number {
            info.insert(FIELD_SERIAL, serial.clone());
        }
        if let Some(mac) = &self.system_mac {
            info.insert(FIELD_SYSMAC, mac.clone());
        }
        if let Some(container) = &self.parent_container_name {
            info.insert(FIELD_PARENT_NAME, container.clone());
        }
        info
    }
}

impl TryFrom<Value> for DeviceRecord {
    type Error = InventoryError;

    fn try_from(value: Value) -> InventoryResult<Self> {
        Self::from_value(&value)
    }
}

/// Ordered batch of devices built from the user inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInventory {
    devices: Vec<DeviceRecord>,
}

impl DeviceInventory {
    pub fn new(devices: Vec<DeviceRecord>) -> Self {
        Self { devices }
    }

    /// One record per raw entry, in input order. The first entry that cannot
    /// be built fails the whole batch.
    pub fn from_values(values: &[Value]) -> InventoryResult<Self> {
        let devices = values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                DeviceRecord::from_value(value).map_err(|err| match err {
                    InventoryError::Validation(message) => {
                        InventoryError::validation(format!("device #{}: {}", index, message))
                    }
                    other => other,
                })
            })
            .collect::<InventoryResult<Vec<_>>>()?;
        Ok(Self { devices })
    }

    pub fn devices(&self) -> &[DeviceRecord] {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut [DeviceRecord] {
        &mut self.devices
    }

    pub fn get(&self, fqdn: &str) -> Option<&DeviceRecord> {
        self.devices.iter().find(|device| device.fqdn == fqdn)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeviceRecord> {
        self.devices.iter()
    }
}

impl<'a> IntoIterator for &'a DeviceInventory {
    type Item = &'a DeviceRecord;
    type IntoIter = std::slice::Iter<'a, DeviceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}
