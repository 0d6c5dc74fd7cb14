//! Command layer error types and status handling.
//!
//! The command layer reports failures as errno-style status codes. This
//! module turns those codes into Rust's `Result` type.

use std::fmt;
use thiserror::Error;

/// Status codes returned by the hardware command layer.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DevxStatus {
    Success = 0,
    PermissionDenied = 1,
    NotFound = 2,
    IoError = 5,
    Busy = 16,
    NoMemory = 12,
    InvalidParameter = 22,
    NoSpace = 28,
    NotSupported = 95,
}

impl DevxStatus {
    /// Creates a status from a raw errno value.
    pub fn from_raw(status: i32) -> Self {
        match status.abs() {
            0 => DevxStatus::Success,
            1 => DevxStatus::PermissionDenied,
            2 => DevxStatus::NotFound,
            12 => DevxStatus::NoMemory,
            16 => DevxStatus::Busy,
            22 => DevxStatus::InvalidParameter,
            28 => DevxStatus::NoSpace,
            95 => DevxStatus::NotSupported,
            _ => DevxStatus::IoError,
        }
    }

    /// Returns true if the status indicates success.
    pub fn is_success(&self) -> bool {
        *self == DevxStatus::Success
    }

    /// Converts to a Result, returning Ok(()) for success.
    pub fn into_result(self) -> DevxResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(DevxError::from_status(self))
        }
    }
}

impl fmt::Display for DevxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DevxStatus::Success => "SUCCESS",
            DevxStatus::PermissionDenied => "EPERM",
            DevxStatus::NotFound => "ENOENT",
            DevxStatus::IoError => "EIO",
            DevxStatus::Busy => "EBUSY",
            DevxStatus::NoMemory => "ENOMEM",
            DevxStatus::InvalidParameter => "EINVAL",
            DevxStatus::NoSpace => "ENOSPC",
            DevxStatus::NotSupported => "EOPNOTSUPP",
        };
        write!(f, "{}", s)
    }
}

/// Error type for command layer operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DevxError {
    /// The command failed with a status code.
    #[error("command failed: {status}")]
    Status { status: DevxStatus },

    /// The device does not support the command or attribute.
    #[error("not supported by device: {feature}")]
    NotSupported { feature: String },

    /// The command was rejected because an argument was invalid.
    #[error("invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// The device ran out of resources.
    #[error("out of resources: {resource}")]
    NoResources { resource: String },

    /// The referenced object does not exist.
    #[error("object not found: {object}")]
    NotFound { object: String },

    /// The object is still referenced by another object.
    #[error("object busy: {object}")]
    Busy { object: String },
}

impl DevxError {
    /// Creates an error from a status code.
    pub fn from_status(status: DevxStatus) -> Self {
        match status {
            DevxStatus::NotSupported => DevxError::NotSupported {
                feature: "unknown".to_string(),
            },
            DevxStatus::InvalidParameter => DevxError::InvalidParameter {
                message: format!("device returned {}", status),
            },
            DevxStatus::NoMemory | DevxStatus::NoSpace => DevxError::NoResources {
                resource: "unknown".to_string(),
            },
            DevxStatus::NotFound => DevxError::NotFound {
                object: "unknown".to_string(),
            },
            DevxStatus::Busy => DevxError::Busy {
                object: "unknown".to_string(),
            },
            _ => DevxError::Status { status },
        }
    }

    /// Creates a not supported error.
    pub fn not_supported(feature: impl Into<String>) -> Self {
        DevxError::NotSupported {
            feature: feature.into(),
        }
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        DevxError::InvalidParameter {
            message: message.into(),
        }
    }

    /// Creates an out of resources error.
    pub fn no_resources(resource: impl Into<String>) -> Self {
        DevxError::NoResources {
            resource: resource.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(object: impl Into<String>) -> Self {
        DevxError::NotFound {
            object: object.into(),
        }
    }

    /// Returns the errno-style status this error maps back to.
    pub fn status(&self) -> DevxStatus {
        match self {
            DevxError::Status { status } => *status,
            DevxError::NotSupported { .. } => DevxStatus::NotSupported,
            DevxError::InvalidParameter { .. } => DevxStatus::InvalidParameter,
            DevxError::NoResources { .. } => DevxStatus::NoMemory,
            DevxError::NotFound { .. } => DevxStatus::NotFound,
            DevxError::Busy { .. } => DevxStatus::Busy,
        }
    }

    /// Returns true if retrying the same command may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DevxError::Busy { .. }
                | DevxError::Status {
                    status: DevxStatus::Busy
                }
        )
    }
}

/// Result type for command layer operations.
pub type DevxResult<T> = Result<T, DevxError>;

/// Extension trait for converting raw status codes.
pub trait DevxStatusExt {
    /// Converts a raw status code to a Result.
    fn to_result(self) -> DevxResult<()>;
}

impl DevxStatusExt for i32 {
    fn to_result(self) -> DevxResult<()> {
        DevxStatus::from_raw(self).into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_raw() {
        assert_eq!(DevxStatus::from_raw(0), DevxStatus::Success);
        assert_eq!(DevxStatus::from_raw(-12), DevxStatus::NoMemory);
        assert_eq!(DevxStatus::from_raw(95), DevxStatus::NotSupported);
        assert_eq!(DevxStatus::from_raw(-999), DevxStatus::IoError);
    }

    #[test]
    fn test_error_from_status() {
        let err = DevxError::from_status(DevxStatus::NoSpace);
        assert!(matches!(err, DevxError::NoResources { .. }));

        let err = DevxError::from_status(DevxStatus::IoError);
        assert_eq!(err.status(), DevxStatus::IoError);
    }

    #[test]
    fn test_raw_status_to_result() {
        assert!(0_i32.to_result().is_ok());
        assert!((-22_i32).to_result().is_err());
    }

    #[test]
    fn test_error_retryable() {
        assert!(DevxError::from_status(DevxStatus::Busy).is_retryable());
        assert!(!DevxError::no_resources("rtc").is_retryable());
    }
}
