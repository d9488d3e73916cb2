use crate::error::PlaneError;
use crate::plane::{CvConfiglet, CvContainer, CvDevice, ManagementPlane, TaskResponse};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Management plane state as loaded from a snapshot document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaneSnapshot {
    #[serde(default)]
    pub devices: Vec<CvDevice>,
    #[serde(default)]
    pub containers: Vec<CvContainer>,
    #[serde(default)]
    pub configlets: Vec<CvConfiglet>,
    /// Configlet names applied to each device, keyed by device key.
    #[serde(default)]
    pub device_configlets: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneTask {
    pub id: String,
    pub description: String,
}

/// Snapshot-backed [`ManagementPlane`]; every mutation creates one task.
#[derive(Debug, Clone)]
pub struct InMemoryPlane {
    snapshot: PlaneSnapshot,
    tasks: Vec<PlaneTask>,
    next_task_id: u64,
}

impl InMemoryPlane {
    pub fn new(mut snapshot: PlaneSnapshot) -> Self {
        let container_keys: BTreeMap<String, String> = snapshot
            .containers
            .iter()
            .map(|container| (container.name.clone(), container.key.clone()))
            .collect();
        for device in &mut snapshot.devices {
            if device.hostname.is_empty() {
                device.hostname = device.short_name().to_string();
            }
            if device.key.is_empty() {
                device.key = device.system_mac_address.clone();
            }
            if device.parent_container_id.is_empty() {
                if let Some(key) = container_keys.get(&device.container_name) {
                    device.parent_container_id = key.clone();
                }
            }
        }
        Self {
            snapshot,
            tasks: Vec::new(),
            next_task_id: 1,
        }
    }

    pub fn snapshot(&self) -> &PlaneSnapshot {
        &self.snapshot
    }

    pub fn tasks(&self) -> &[PlaneTask] {
        &self.tasks
    }

    fn create_task(&mut self, description: String) -> TaskResponse {
        let id = self.next_task_id.to_string();
        self.next_task_id += 1;
        debug!(task_id = %id, %description, "task created");
        self.tasks.push(PlaneTask {
            id: id.clone(),
            description,
        });
        TaskResponse { task_ids: vec![id] }
    }

    fn device_mut(&mut self, operation: &'static str, key: &str) -> Result<&mut CvDevice, PlaneError> {
        self.snapshot
            .devices
            .iter_mut()
            .find(|device| device.key == key)
            .ok_or_else(|| PlaneError::new(operation, format!("unknown device {}", key)))
    }

    fn ensure_container(&self, operation: &'static str, container: &CvContainer) -> Result<(), PlaneError> {
        if self.snapshot.containers.iter().any(|c| c.key == container.key) {
            Ok(())
        } else {
            Err(PlaneError::new(operation, format!("unknown container {}", container.name)))
        }
    }

    fn attach(&mut self, device_key: &str, configlets: &[CvConfiglet]) {
        let applied = self
            .snapshot
            .device_configlets
            .entry(device_key.to_string())
            .or_default();
        for configlet in configlets {
            if !applied.contains(&configlet.name) {
                applied.push(configlet.name.clone());
            }
        }
    }
}

impl ManagementPlane for InMemoryPlane {
    fn devices(&self) -> Result<Vec<CvDevice>, PlaneError> {
        Ok(self.snapshot.devices.clone())
    }

    fn container_by_name(&self, name: &str) -> Result<Option<CvContainer>, PlaneError> {
        Ok(self
            .snapshot
            .containers
            .iter()
            .find(|container| container.name == name)
            .cloned())
    }

    fn configlet_by_name(&self, name: &str) -> Result<Option<CvConfiglet>, PlaneError> {
        Ok(self
            .snapshot
            .configlets
            .iter()
            .find(|configlet| configlet.name == name)
            .cloned())
    }

    fn configlets_by_device(&self, device_key: &str) -> Result<Vec<CvConfiglet>, PlaneError> {
        let names = self
            .snapshot
            .device_configlets
            .get(device_key)
            .cloned()
            .unwrap_or_default();
        Ok(names
            .iter()
            .filter_map(|name| self.snapshot.configlets.iter().find(|c| &c.name == name))
            .cloned()
            .collect())
    }

    fn move_device_to_container(
        &mut self,
        app_name: &str,
        device: &CvDevice,
        container: &CvContainer,
    ) -> Result<TaskResponse, PlaneError> {
        const OP: &str = "move_device_to_container";
        self.ensure_container(OP, container)?;
        let target = self.device_mut(OP, &device.key)?;
        target.container_name = container.name.clone();
        target.parent_container_id = container.key.clone();
        Ok(self.create_task(format!(
            "{}: move {} to {}",
            app_name, device.fqdn, container.name
        )))
    }

    fn apply_configlets_to_device(
        &mut self,
        app_name: &str,
        device: &CvDevice,
        configlets: &[CvConfiglet],
    ) -> Result<TaskResponse, PlaneError> {
        const OP: &str = "apply_configlets_to_device";
        self.device_mut(OP, &device.key)?;
        self.attach(&device.key, configlets);
        let names: Vec<&str> = configlets.iter().map(|c| c.name.as_str()).collect();
        Ok(self.create_task(format!(
            "{}: apply {} to {}",
            app_name,
            names.join(","),
            device.fqdn
        )))
    }

    fn remove_configlets_from_device(
        &mut self,
        app_name: &str,
        device: &CvDevice,
        configlets: &[CvConfiglet],
    ) -> Result<TaskResponse, PlaneError> {
        const OP: &str = "remove_configlets_from_device";
        self.device_mut(OP, &device.key)?;
        if let Some(applied) = self.snapshot.device_configlets.get_mut(&device.key) {
            applied.retain(|name| !configlets.iter().any(|c| &c.name == name));
        }
        let names: Vec<&str> = configlets.iter().map(|c| c.name.as_str()).collect();
        Ok(self.create_task(format!(
            "{}: remove {} from {}",
            app_name,
            names.join(","),
            device.fqdn
        )))
    }

    fn deploy_device(
        &mut self,
        device: &CvDevice,
        container: &CvContainer,
        configlets: &[CvConfiglet],
        image_bundle: Option<&str>,
    ) -> Result<TaskResponse, PlaneError> {
        const OP: &str = "deploy_device";
        self.ensure_container(OP, container)?;
        let target = self.device_mut(OP, &device.key)?;
        target.container_name = container.name.clone();
        target.parent_container_id = container.key.clone();
        self.attach(&device.key, configlets);
        Ok(self.create_task(format!(
            "deploy {} to {} (image bundle: {})",
            device.fqdn,
            container.name,
            image_bundle.unwrap_or("none")
        )))
    }
}
