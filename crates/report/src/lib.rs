use anyhow::{Context, Result};
use cv_inventory_core::{now_utc_rfc3339, DeviceInventory};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct ReportPaths {
    pub run_id: String,
    pub root: PathBuf,
    pub inventory_json: PathBuf,
    pub run_json: PathBuf,
    pub logs_path: PathBuf,
}

#[derive(Debug, Serialize)]
struct RunMetadata {
    run_id: String,
    created_at_utc: String,
    device_count: usize,
    meta: Option<Value>,
}

/// Writes `reports/<run id>/` under `base` with the inventory views, run
/// metadata and the captured log text.
pub fn create_report_bundle(
    base: impl AsRef<Path>,
    inventory: &DeviceInventory,
    meta: Option<Value>,
    logs: Option<&str>,
) -> Result<ReportPaths> {
    let run_id = Uuid::new_v4().to_string();
    let root = base.as_ref().join("reports").join(&run_id);
    std::fs::create_dir_all(&root).with_context(|| format!("create {}", root.display()))?;

    let paths = ReportPaths {
        inventory_json: root.join("inventory.json"),
        run_json: root.join("run.json"),
        logs_path: root.join("logs.txt"),
        run_id,
        root,
    };

    let views: Vec<_> = inventory.iter().map(|device| device.info()).collect();
    write_json(&paths.inventory_json, &views)?;
    write_json(
        &paths.run_json,
        &RunMetadata {
            run_id: paths.run_id.clone(),
            created_at_utc: now_utc_rfc3339(),
            device_count: inventory.len(),
            meta,
        },
    )?;
    std::fs::write(&paths.logs_path, logs.unwrap_or_default())
        .with_context(|| format!("write {}", paths.logs_path.display()))?;

    info!(run_id = %paths.run_id, root = %paths.root.display(), devices = inventory.len(), "report bundle written");
    Ok(paths)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_string_pretty(value)?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))
}
