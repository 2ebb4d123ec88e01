//! Unified Error Model
use thiserror::Error;

use crate::adapter::AdapterError;

#[derive(Error, Debug)]
pub enum ComplianceError {
    #[error("CHECKLIST/{0}")]
    ChecklistError(String),

    #[error("CONFIG/{0}")]
    ConfigError(String),

    #[error("INDEX/invalid control index {index}, valid range: {range}")]
    InvalidControlIndex { index: usize, range: String },

    #[error("ADAPTER/{0}")]
    AdapterError(#[from] AdapterError),

    #[error("RENDER/{0}")]
    RenderError(String),

    #[error("SERIALIZE/{0}")]
    SerializeError(String),
}

impl ComplianceError {
    /// Build an index error for a checklist of `len` controls
    pub fn invalid_index(index: usize, len: usize) -> Self {
        let range = if len == 0 {
            "empty checklist".to_string()
        } else {
            format!("0-{}", len - 1)
        };
        ComplianceError::InvalidControlIndex { index, range }
    }
}

impl From<serde_json::Error> for ComplianceError {
    fn from(err: serde_json::Error) -> Self {
        ComplianceError::SerializeError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_index_message() {
        let err = ComplianceError::invalid_index(7, 3);
        assert_eq!(
            err.to_string(),
            "INDEX/invalid control index 7, valid range: 0-2"
        );

        let err = ComplianceError::invalid_index(0, 0);
        assert!(err.to_string().contains("empty checklist"));
    }

    #[test]
    fn test_adapter_error_prefix() {
        let err: ComplianceError = AdapterError::Timeout {
            resource_type: "Microsoft.Storage/storageAccounts".into(),
            secs: 30,
        }
        .into();
        assert!(err.to_string().starts_with("ADAPTER/"));
    }
}
