use crate::error::{DeviceToolsError, DeviceToolsResult};
use crate::plane::{CvConfiglet, CvContainer, CvDevice, ManagementPlane};
use crate::response::{CvApiResult, CvManagerResult};
use cv_inventory_core::{
    DeviceInventory, DeviceRecord, InventoryError, LookupKey, FIELD_HOSTNAME, FIELD_PARENT_ID,
    FIELD_PARENT_NAME, FIELD_SYSMAC, UNDEFINED_CONTAINER,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Application name attached to tasks created on the plane.
pub const APP_NAME: &str = "cv-inventory";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyMode {
    /// Only attach configlets missing on the device.
    #[default]
    Loose,
    /// Also detach configlets the inventory does not list.
    Strict,
}

impl FromStr for ApplyMode {
    type Err = InventoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "loose" => Ok(ApplyMode::Loose),
            "strict" => Ok(ApplyMode::Strict),
            other => Err(InventoryError::configuration(format!(
                "unsupported apply mode '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyMode::Loose => f.write_str("loose"),
            ApplyMode::Strict => f.write_str("strict"),
        }
    }
}

/// Container placement of a device on the plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceContainer {
    #[serde(rename = "parentContainerName")]
    pub parent_container_name: String,
    #[serde(rename = "parentContainerId")]
    pub parent_container_id: String,
}

impl DeviceContainer {
    pub fn get(&self, field: &str) -> Option<&str> {
        match field {
            FIELD_PARENT_NAME => Some(&self.parent_container_name),
            FIELD_PARENT_ID => Some(&self.parent_container_id),
            _ => None,
        }
    }
}

/// Aggregated result of [`CvDeviceTools::manager`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CvManagerOutput {
    pub deployed: CvManagerResult,
    pub moved: CvManagerResult,
    pub attached: CvManagerResult,
}

impl CvManagerOutput {
    pub fn success(&self) -> bool {
        self.deployed.success() && self.moved.success() && self.attached.success()
    }

    pub fn changed(&self) -> bool {
        self.deployed.changed() || self.moved.changed() || self.attached.changed()
    }

    pub fn task_ids(&self) -> Vec<String> {
        [&self.deployed, &self.moved, &self.attached]
            .iter()
            .flat_map(|result| result.task_ids().iter().cloned())
            .collect()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "success": self.success(),
            "changed": self.changed(),
            "taskIds": self.task_ids(),
            "devices_deployed": self.deployed.changes(),
            "devices_moved": self.moved.changes(),
            "configlets_attached": self.attached.changes(),
        })
    }
}

/// Device operations against a management plane for one session.
pub struct CvDeviceTools<P> {
    plane: P,
    search_by: String,
    check_mode: bool,
    apply_mode: ApplyMode,
}

impl<P: ManagementPlane> CvDeviceTools<P> {
    pub fn new(plane: P) -> Self {
        Self {
            plane,
            search_by: FIELD_HOSTNAME.to_string(),
            check_mode: false,
            apply_mode: ApplyMode::default(),
        }
    }

    pub fn plane(&self) -> &P {
        &self.plane
    }

    pub fn into_plane(self) -> P {
        self.plane
    }

    pub fn search_by(&self) -> &str {
        &self.search_by
    }

    pub fn set_search_by(&mut self, search_by: impl Into<String>) {
        self.search_by = search_by.into();
    }

    pub fn check_mode(&self) -> bool {
        self.check_mode
    }

    pub fn set_check_mode(&mut self, check_mode: bool) {
        self.check_mode = check_mode;
    }

    pub fn apply_mode(&self) -> ApplyMode {
        self.apply_mode
    }

    pub fn set_apply_mode(&mut self, apply_mode: ApplyMode) {
        self.apply_mode = apply_mode;
    }

    pub fn lookup_key(&self) -> DeviceToolsResult<LookupKey> {
        Ok(self.search_by.parse::<LookupKey>()?)
    }

    pub fn get_device_facts(&self, device_lookup: &str) -> DeviceToolsResult<Option<CvDevice>> {
        let key = self.lookup_key()?;
        self.find_device(key, device_lookup)
    }

    pub fn is_device_exist(&self, device_lookup: &str) -> DeviceToolsResult<bool> {
        Ok(self.get_device_facts(device_lookup)?.is_some())
    }

    pub fn is_in_container(&self, device_lookup: &str, container_name: &str) -> DeviceToolsResult<bool> {
        Ok(self
            .get_device_facts(device_lookup)?
            .map(|device| device.container_name == container_name)
            .unwrap_or(false))
    }

    pub fn get_device_id(&self, device_lookup: &str) -> DeviceToolsResult<Option<String>> {
        Ok(self.get_device_facts(device_lookup)?.map(|device| device.key))
    }

    pub fn get_device_configlets(&self, device_lookup: &str) -> DeviceToolsResult<Vec<CvConfiglet>> {
        match self.get_device_facts(device_lookup)? {
            Some(device) => Ok(self.plane.configlets_by_device(&device.key)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_device_container(&self, device_lookup: &str) -> DeviceToolsResult<Option<DeviceContainer>> {
        Ok(self
            .get_device_facts(device_lookup)?
            .map(|device| DeviceContainer {
                parent_container_name: device.container_name,
                parent_container_id: device.parent_container_id,
            }))
    }

    pub fn get_container_info(&self, container_name: &str) -> DeviceToolsResult<Option<CvContainer>> {
        Ok(self.plane.container_by_name(container_name)?)
    }

    pub fn get_configlet_info(&self, configlet_name: &str) -> DeviceToolsResult<Option<CvConfiglet>> {
        Ok(self.plane.configlet_by_name(configlet_name)?)
    }

    /// Fills missing system MACs and parent container ids from the plane.
    pub fn refresh_system_mac(&self, inventory: &mut DeviceInventory) -> DeviceToolsResult<()> {
        let key = match self.lookup_key()? {
            LookupKey::SystemMac => LookupKey::Hostname,
            other => other,
        };
        for device in inventory.devices_mut() {
            if device.system_mac().is_none() {
                let facts = self
                    .find_device(key, reference(key, device)?)?
                    .ok_or_else(|| DeviceToolsError::not_found("device", device.fqdn()))?;
                debug!(fqdn = %device.fqdn(), mac = %facts.system_mac_address, "system mac refreshed");
                device.set_system_mac(facts.system_mac_address);
            }
            if device.parent_container_id().is_none() {
                if let Some(name) = device.parent_container_name().map(str::to_string) {
                    if let Some(container) = self.plane.container_by_name(&name)? {
                        device.set_parent_container_id(container.key);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn move_device(&mut self, user_inventory: &DeviceInventory) -> DeviceToolsResult<Vec<CvApiResult>> {
        let key = self.lookup_key()?;
        let mut results = Vec::with_capacity(user_inventory.len());
        for device in user_inventory {
            let facts = self.resolve(key, device)?;
            let mut result = CvApiResult::new(format!("{}_move", device.fqdn()));
            result.set_success(true);

            let Some(target) = device.parent_container_name() else {
                debug!(fqdn = %device.fqdn(), "no target container, move skipped");
                results.push(result);
                continue;
            };
            if facts.container_name == target {
                debug!(fqdn = %device.fqdn(), container = %target, "device already in container");
                results.push(result);
                continue;
            }

            let container = self
                .plane
                .container_by_name(target)?
                .ok_or_else(|| DeviceToolsError::not_found("container", target))?;
            if !self.check_mode {
                let response = self.plane.move_device_to_container(APP_NAME, &facts, &container)?;
                result.add_tasks(response.task_ids);
            }
            info!(
                fqdn = %device.fqdn(),
                from = %facts.container_name,
                to = %container.name,
                check_mode = self.check_mode,
                "device moved"
            );
            result.set_changed(true);
            result.add_entry(format!("{} to {}", device.fqdn(), container.name));
            results.push(result);
        }
        Ok(results)
    }

    pub fn apply_configlets(&mut self, user_inventory: &DeviceInventory) -> DeviceToolsResult<Vec<CvApiResult>> {
        let key = self.lookup_key()?;
        let mut results = Vec::with_capacity(user_inventory.len());
        for device in user_inventory {
            let facts = self.resolve(key, device)?;
            let current = self.plane.configlets_by_device(&facts.key)?;
            let mut result = CvApiResult::new(format!("{}_configlet_attached", device.fqdn()));
            result.set_success(true);

            let mut to_attach = Vec::new();
            for name in device.configlets() {
                if current.iter().any(|configlet| &configlet.name == name) {
                    continue;
                }
                let configlet = self
                    .plane
                    .configlet_by_name(name)?
                    .ok_or_else(|| DeviceToolsError::not_found("configlet", name.as_str()))?;
                to_attach.push(configlet);
            }
            let to_detach: Vec<CvConfiglet> = match self.apply_mode {
                ApplyMode::Loose => Vec::new(),
                ApplyMode::Strict => current
                    .into_iter()
                    .filter(|configlet| !device.configlets().contains(&configlet.name))
                    .collect(),
            };

            if !to_attach.is_empty() {
                if !self.check_mode {
                    let response = self.plane.apply_configlets_to_device(APP_NAME, &facts, &to_attach)?;
                    result.add_tasks(response.task_ids);
                }
                for configlet in &to_attach {
                    result.add_entry(configlet.name.clone());
                }
                info!(fqdn = %device.fqdn(), count = to_attach.len(), check_mode = self.check_mode, "configlets attached");
            }
            if !to_detach.is_empty() {
                if !self.check_mode {
                    let response = self.plane.remove_configlets_from_device(APP_NAME, &facts, &to_detach)?;
                    result.add_tasks(response.task_ids);
                }
                for configlet in &to_detach {
                    result.add_entry(format!("-{}", configlet.name));
                }
                info!(fqdn = %device.fqdn(), count = to_detach.len(), check_mode = self.check_mode, "configlets detached");
            }
            result.set_changed(result.count() > 0);
            results.push(result);
        }
        Ok(results)
    }

    /// Provisions devices currently in the undefined container.
    pub fn deploy_device(&mut self, user_inventory: &DeviceInventory) -> DeviceToolsResult<Vec<CvApiResult>> {
        let key = self.lookup_key()?;
        let mut results = Vec::with_capacity(user_inventory.len());
        for device in user_inventory {
            let facts = self.resolve(key, device)?;
            let mut result = CvApiResult::new(format!("{}_deploy", device.fqdn()));
            result.set_success(true);
            if facts.container_name != UNDEFINED_CONTAINER {
                debug!(fqdn = %device.fqdn(), container = %facts.container_name, "device already provisioned");
                results.push(result);
                continue;
            }

            let target = device.parent_container_name().ok_or_else(|| {
                InventoryError::validation(format!(
                    "device {} needs {} to be deployed",
                    device.fqdn(),
                    FIELD_PARENT_NAME
                ))
            })?;
            let container = self
                .plane
                .container_by_name(target)?
                .ok_or_else(|| DeviceToolsError::not_found("container", target))?;
            let configlets = device
                .configlets()
                .iter()
                .map(|name| {
                    self.plane
                        .configlet_by_name(name)?
                        .ok_or_else(|| DeviceToolsError::not_found("configlet", name.as_str()))
                })
                .collect::<DeviceToolsResult<Vec<_>>>()?;
            let image_bundle = device
                .image_bundle()
                .and_then(|bundles| bundles.first())
                .map(String::as_str);

            if !self.check_mode {
                let response = self.plane.deploy_device(&facts, &container, &configlets, image_bundle)?;
                result.add_tasks(response.task_ids);
            }
            info!(fqdn = %device.fqdn(), container = %container.name, check_mode = self.check_mode, "device deployed");
            result.set_changed(true);
            result.add_entry(format!("{} to {}", device.fqdn(), container.name));
            results.push(result);
        }
        Ok(results)
    }

    /// Full reconciliation: deploys new devices, then moves existing devices
    /// and attaches their configlets.
    pub fn manager(&mut self, user_inventory: &DeviceInventory) -> DeviceToolsResult<CvManagerOutput> {
        let key = self.lookup_key()?;
        let mut inventory = user_inventory.clone();
        self.refresh_system_mac(&mut inventory)?;

        let mut to_deploy = Vec::new();
        let mut existing = Vec::new();
        for device in &inventory {
            let facts = self.resolve(key, device)?;
            if facts.container_name == UNDEFINED_CONTAINER {
                to_deploy.push(device.clone());
            } else {
                existing.push(device.clone());
            }
        }
        let to_deploy = DeviceInventory::new(to_deploy);
        let existing = DeviceInventory::new(existing);
        debug!(deploy = to_deploy.len(), existing = existing.len(), "inventory split");

        let mut deployed = CvManagerResult::new("devices_deployed", true);
        for result in self.deploy_device(&to_deploy)? {
            deployed.add_change(&result);
        }
        let mut moved = CvManagerResult::new("devices_moved", true);
        for result in self.move_device(&existing)? {
            moved.add_change(&result);
        }
        let mut attached = CvManagerResult::new("configlets_attached", true);
        for result in self.apply_configlets(&existing)? {
            attached.add_change(&result);
        }

        Ok(CvManagerOutput {
            deployed,
            moved,
            attached,
        })
    }

    fn resolve(&self, key: LookupKey, device: &DeviceRecord) -> DeviceToolsResult<CvDevice> {
        self.find_device(key, reference(key, device)?)?
            .ok_or_else(|| DeviceToolsError::not_found("device", device.fqdn()))
    }

    fn find_device(&self, key: LookupKey, device_lookup: &str) -> DeviceToolsResult<Option<CvDevice>> {
        let found = self
            .plane
            .devices()?
            .into_iter()
            .find(|device| matches_lookup(key, device, device_lookup));
        debug!(lookup = %device_lookup, search_by = %key, found = found.is_some(), "device lookup");
        Ok(found)
    }
}

fn reference(key: LookupKey, device: &DeviceRecord) -> DeviceToolsResult<&str> {
    key.reference(device).ok_or_else(|| {
        InventoryError::validation(format!(
            "device {} has no {} to search by",
            device.fqdn(),
            FIELD_SYSMAC
        ))
        .into()
    })
}

fn matches_lookup(key: LookupKey, device: &CvDevice, device_lookup: &str) -> bool {
    match key {
        LookupKey::Fqdn => device.fqdn == device_lookup,
        LookupKey::Hostname => {
            device.short_name() == device_lookup.split('.').next().unwrap_or(device_lookup)
        }
        LookupKey::SystemMac => device.system_mac_address.eq_ignore_ascii_case(device_lookup),
    }
}
