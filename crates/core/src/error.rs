use thiserror::Error;

/// Errors raised while building records or resolving session settings
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// Required field missing, empty or of the wrong type
    #[error("validation error: {0}")]
    Validation(String),

    /// Unrecognized session setting (e.g. lookup key)
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl InventoryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

pub type InventoryResult<T> = Result<T, InventoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InventoryError::validation("missing field fqdn");
        assert!(err.to_string().contains("missing field fqdn"));
        assert!(err.is_validation());

        let err = InventoryError::configuration("unsupported lookup key ''");
        assert!(err.to_string().starts_with("configuration error"));
        assert!(err.is_configuration());
    }
}
