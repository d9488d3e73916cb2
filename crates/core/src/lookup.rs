use crate::{DeviceRecord, InventoryError, FIELD_FQDN, FIELD_HOSTNAME, FIELD_SYSMAC};
use std::fmt;
use std::str::FromStr;

/// Device attribute used to resolve a user-supplied reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKey {
    Fqdn,
    Hostname,
    SystemMac,
}

impl LookupKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupKey::Fqdn => FIELD_FQDN,
            LookupKey::Hostname => FIELD_HOSTNAME,
            LookupKey::SystemMac => FIELD_SYSMAC,
        }
    }

    /// Value of this key on a user record, if populated.
    pub fn reference<'a>(&self, device: &'a DeviceRecord) -> Option<&'a str> {
        match self {
            LookupKey::Fqdn => Some(device.fqdn()),
            LookupKey::Hostname => Some(device.hostname()),
            LookupKey::SystemMac => device.system_mac(),
        }
    }
}

impl FromStr for LookupKey {
    type Err = InventoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            FIELD_FQDN => Ok(LookupKey::Fqdn),
            FIELD_HOSTNAME => Ok(LookupKey::Hostname),
            FIELD_SYSMAC => Ok(LookupKey::SystemMac),
            other => Err(InventoryError::configuration(format!(
                "unsupported lookup key '{}' (expected {}, {} or {})",
                other, FIELD_FQDN, FIELD_HOSTNAME, FIELD_SYSMAC
            ))),
        }
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
