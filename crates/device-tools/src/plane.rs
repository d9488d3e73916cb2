use crate::error::PlaneError;
use serde::{Deserialize, Serialize};

/// Device facts as reported by the management plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvDevice {
    pub fqdn: String,
    #[serde(default)]
    pub hostname: String,
    pub system_mac_address: String,
    #[serde(default)]
    pub serial_number: String,
    /// Plane identifier; the system MAC on CloudVision.
    #[serde(default)]
    pub key: String,
    pub container_name: String,
    #[serde(default)]
    pub parent_container_id: String,
}

impl CvDevice {
    /// `fqdn` up to the first `.`.
    pub fn short_name(&self) -> &str {
        self.fqdn.split('.').next().unwrap_or(&self.fqdn)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvContainer {
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_container_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvConfiglet {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub config: String,
}

/// Tasks created on the plane by a mutating call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub task_ids: Vec<String>,
}

pub trait ManagementPlane {
    fn devices(&self) -> Result<Vec<CvDevice>, PlaneError>;

    fn container_by_name(&self, name: &str) -> Result<Option<CvContainer>, PlaneError>;

    fn configlet_by_name(&self, name: &str) -> Result<Option<CvConfiglet>, PlaneError>;

    fn configlets_by_device(&self, device_key: &str) -> Result<Vec<CvConfiglet>, PlaneError>;

    fn move_device_to_container(
        &mut self,
        app_name: &str,
        device: &CvDevice,
        container: &CvContainer,
    ) -> Result<TaskResponse, PlaneError>;

    fn apply_configlets_to_device(
        &mut self,
        app_name: &str,
        device: &CvDevice,
        configlets: &[CvConfiglet],
    ) -> Result<TaskResponse, PlaneError>;

    fn remove_configlets_from_device(
        &mut self,
        app_name: &str,
        device: &CvDevice,
        configlets: &[CvConfiglet],
    ) -> Result<TaskResponse, PlaneError>;

    /// Provisions a device sitting in the undefined container.
    fn deploy_device(
        &mut self,
        device: &CvDevice,
        container: &CvContainer,
        configlets: &[CvConfiglet],
        image_bundle: Option<&str>,
    ) -> Result<TaskResponse, PlaneError>;
}
