use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;

mod device;
mod error;
mod lookup;
mod topology;

pub use device::{DeviceInventory, DeviceRecord};
pub use error::{InventoryError, InventoryResult};
pub use lookup::LookupKey;
pub use topology::{ConfigletRecord, ContainerRecord};

pub const FIELD_FQDN: &str = "fqdn";
pub const FIELD_HOSTNAME: &str = "hostname";
pub const FIELD_SYSMAC: &str = "systemMacAddress";
pub const FIELD_SERIAL: &str = "serialNumber";
pub const FIELD_CONFIGLETS: &str = "configlets";
pub const FIELD_ID: &str = "key";
pub const FIELD_CONTAINER_NAME: &str = "containerName";
pub const FIELD_PARENT_NAME: &str = "parentContainerName";
pub const FIELD_PARENT_ID: &str = "parentContainerId";
pub const FIELD_IMAGE_BUNDLE: &str = "imageBundle";
pub const FIELD_NAME: &str = "name";
pub const FIELD_CONFIG: &str = "config";

/// Container holding devices that are registered but not provisioned yet.
pub const UNDEFINED_CONTAINER: &str = "Undefined";

pub fn now_utc_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

pub(crate) fn as_object<'a>(value: &'a Value, what: &str) -> InventoryResult<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| InventoryError::validation(format!("{} entry must be a mapping", what)))
}

pub(crate) fn require_string(map: &Map<String, Value>, key: &str) -> InventoryResult<String> {
    match map.get(key) {
        Some(Value::String(value)) if !value.trim().is_empty() => Ok(value.clone()),
        Some(Value::String(_)) => Err(InventoryError::validation(format!("field {} is empty", key))),
        Some(_) => Err(InventoryError::validation(format!("field {} must be a string", key))),
        None => Err(InventoryError::validation(format!("missing field {}", key))),
    }
}

pub(crate) fn optional_string(map: &Map<String, Value>, key: &str) -> InventoryResult<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(InventoryError::validation(format!("field {} must be a string", key))),
    }
}

pub(crate) fn optional_string_list(map: &Map<String, Value>, key: &str) -> InventoryResult<Option<Vec<String>>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    InventoryError::validation(format!("field {} must only contain strings", key))
                })
            })
            .collect::<InventoryResult<Vec<_>>>()
            .map(Some),
        Some(_) => Err(InventoryError::validation(format!("field {} must be a list", key))),
    }
}

/// Accepts either a single name or a list of names.
pub(crate) fn optional_string_or_list(
    map: &Map<String, Value>,
    key: &str,
) -> InventoryResult<Option<Vec<String>>> {
    match map.get(key) {
        Some(Value::String(value)) => Ok(Some(vec![value.clone()])),
        _ => optional_string_list(map, key),
    }
}
