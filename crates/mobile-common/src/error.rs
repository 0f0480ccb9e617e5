//! Error types and error codes for the mobile services workspace
//!
//! This module defines:
//! - `MobileError`: Application-specific error enum
//! - `ErrorCode`: Structured error codes for API responses

use serde::{Deserialize, Serialize};

/// Application-specific error types
///
/// Errors coming back from the cluster are carried as-is in `Kube`, so a
/// caller sees exactly what the API server returned.
#[derive(thiserror::Error, Debug)]
pub enum MobileError {
    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("invalid external metadata on service class '{class}': {reason}")]
    InvalidMetadata { class: String, reason: String },

    #[error("invalid resource: {0}")]
    InvalidResource(String),

    #[error("service binding '{0}' has no parametersFrom secret reference")]
    MissingParametersSource(String),

    #[error("caused: {0}")]
    IllegalArgument(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl MobileError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        MobileError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn already_exists(kind: &'static str, name: impl Into<String>) -> Self {
        MobileError::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    /// HTTP status reported by the API server, if this error came from one
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            MobileError::Kube(kube::Error::Api(response)) => Some(response.code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MobileError::NotFound { .. }) || self.upstream_status() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, MobileError::AlreadyExists { .. }) || self.upstream_status() == Some(409)
    }
}

pub type Result<T> = std::result::Result<T, MobileError>;

/// Error code structure for API responses
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

pub const SUCCESS: ErrorCode<'static> = ErrorCode {
    code: 0,
    message: "success",
};

pub const ACCESS_DENIED: ErrorCode<'static> = ErrorCode {
    code: 10001,
    message: "access denied",
};

pub const PARAMETER_VALIDATE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 20002,
    message: "parameter validate error",
};

pub const RESOURCE_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 20004,
    message: "resource not found",
};

pub const RESOURCE_CONFLICT: ErrorCode<'static> = ErrorCode {
    code: 20005,
    message: "resource conflict",
};

pub const DATA_VALIDATION_FAILED: ErrorCode<'static> = ErrorCode {
    code: 20006,
    message: "data validation failed",
};

pub const SERVER_ERROR: ErrorCode<'static> = ErrorCode {
    code: 30000,
    message: "server error",
};

pub const SERVICE_UNAVAILABLE: ErrorCode<'static> = ErrorCode {
    code: 30001,
    message: "service unavailable",
};
