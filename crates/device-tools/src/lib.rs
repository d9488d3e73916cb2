mod error;
mod memory;
mod plane;
mod response;
mod tools;

pub use error::{BoxedError, DeviceToolsError, DeviceToolsResult, PlaneError};
pub use memory::{InMemoryPlane, PlaneSnapshot, PlaneTask};
pub use plane::{CvConfiglet, CvContainer, CvDevice, ManagementPlane, TaskResponse};
pub use response::{CvApiResult, CvManagerResult};
pub use tools::{ApplyMode, CvDeviceTools, CvManagerOutput, DeviceContainer, APP_NAME};
