use cv_inventory_core::InventoryError;
use std::error::Error as StdError;
use thiserror::Error;

/// Boxed error for wrapping client-specific failures
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Failure reported by a management plane client
#[derive(Debug, Error)]
#[error("management plane call {operation} failed: {message}")]
pub struct PlaneError {
    pub operation: &'static str,
    pub message: String,
    #[source]
    pub source: Option<BoxedError>,
}

impl PlaneError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        operation: &'static str,
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            operation,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeviceToolsError {
    /// Bad user record or unsupported session setting
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Plane(#[from] PlaneError),

    /// Entity referenced by the inventory is unknown to the management plane
    #[error("not found: {entity_type} {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
}

impl DeviceToolsError {
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }
}

pub type DeviceToolsResult<T> = Result<T, DeviceToolsError>;
