use crate::{
    as_object, optional_string, optional_string_list, optional_string_or_list, require_string,
    InventoryError, InventoryResult, FIELD_CONFIG, FIELD_CONFIGLETS, FIELD_IMAGE_BUNDLE, FIELD_NAME,
    FIELD_PARENT_NAME,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Value")]
pub struct ContainerRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_container_name: Option<String>,
    pub configlets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_bundle: Option<Vec<String>>,
}

impl ContainerRecord {
    pub fn from_value(value: &Value) -> InventoryResult<Self> {
        let map = as_object(value, "container")?;
        Ok(Self {
            name: require_string(map, FIELD_NAME)?,
            parent_container_name: optional_string(map, FIELD_PARENT_NAME)?,
            configlets: optional_string_list(map, FIELD_CONFIGLETS)?.unwrap_or_default(),
            image_bundle: optional_string_or_list(map, FIELD_IMAGE_BUNDLE)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct ConfigletRecord {
    pub name: String,
    pub config: String,
}

impl ConfigletRecord {
    pub fn from_value(value: &Value) -> InventoryResult<Self> {
        let map = as_object(value, "configlet")?;
        Ok(Self {
            name: require_string(map, FIELD_NAME)?,
            config: require_string(map, FIELD_CONFIG)?,
        })
    }
}

impl TryFrom<Value> for ContainerRecord {
    type Error = InventoryError;

    fn try_from(value: Value) -> InventoryResult<Self> {
        Self::from_value(&value)
    }
}

impl TryFrom<Value> for ConfigletRecord {
    type Error = InventoryError;

    fn try_from(value: Value) -> InventoryResult<Self> {
        Self::from_value(&value)
    }
}
