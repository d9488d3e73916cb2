use anyhow::{anyhow, Context, Result};
use cv_inventory_core::DeviceInventory;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(DocumentFormat::Json),
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            other => Err(anyhow!(
                "unsupported document type '{}' for {}",
                other,
                path.display()
            )),
        }
    }
}

pub fn parse_document<T: DeserializeOwned>(data: &str, format: DocumentFormat) -> Result<T> {
    match format {
        DocumentFormat::Json => Ok(serde_json::from_str(data)?),
        DocumentFormat::Yaml => Ok(serde_yaml::from_str(data)?),
    }
}

pub fn load_document<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path)?;
    let data = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    debug!(path = %path.display(), ?format, "loading document");
    parse_document(&data, format).with_context(|| format!("parse {}", path.display()))
}

/// Raw user document, kept as-is so keyed topologies survive for validation.
pub fn load_value(path: impl AsRef<Path>) -> Result<Value> {
    load_document(path)
}

/// Device entries from a document holding either a list or `{devices: [...]}`.
pub fn device_entries(document: &Value) -> Result<Vec<Value>> {
    match document {
        Value::Array(entries) => Ok(entries.clone()),
        Value::Object(map) => match map.get("devices") {
            Some(Value::Array(entries)) => Ok(entries.clone()),
            _ => Err(anyhow!("device document must be a list or contain a devices list")),
        },
        _ => Err(anyhow!("device document must be a list or contain a devices list")),
    }
}

pub fn load_device_inventory(path: impl AsRef<Path>) -> Result<DeviceInventory> {
    let path = path.as_ref();
    let document = load_value(path)?;
    let entries = device_entries(&document)?;
    let inventory = DeviceInventory::from_values(&entries)
        .with_context(|| format!("build device inventory from {}", path.display()))?;
    Ok(inventory)
}
