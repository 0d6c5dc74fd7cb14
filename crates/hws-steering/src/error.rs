//! Error types for steering operations.
//!
//! Every failure carries an [`ErrorKind`] so callers can tell validation
//! problems, resource exhaustion and broken chains apart without matching on
//! messages.

use hws_devx::{DevxError, DevxStatus};
use thiserror::Error;

/// Result type alias for steering operations.
pub type HwsResult<T> = Result<T, HwsError>;

/// Reason code of an [`HwsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotSupported,
    InvalidArgument,
    Allocation,
    NoMemory,
    Splice,
    FatalSplice,
    ResizePrecondition,
    NotFound,
    Device,
    Internal,
}

/// Errors that can occur during steering operations.
#[derive(Debug, Error)]
pub enum HwsError {
    /// Attributes or templates not supported by the device or the mode.
    #[error("Not supported: {reason}")]
    NotSupported {
        /// What was rejected.
        reason: String,
    },

    /// Invalid request.
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong.
        reason: String,
    },

    /// A hardware object could not be created.
    #[error("Failed to allocate {what}: {source}")]
    Allocation {
        /// The object being allocated.
        what: String,
        /// The underlying device error.
        #[source]
        source: DevxError,
    },

    /// An attached action template needs more entries than provisioned.
    #[error("Action template needs {required} action STEs, matcher provides {provisioned}")]
    NoMemory {
        /// Entries the template needs.
        required: u32,
        /// Entries allocated when the matcher was created.
        provisioned: u32,
    },

    /// Writing a chain reference failed while inserting.
    #[error("Failed to connect {what}: {source}")]
    Splice {
        /// The matcher or table being connected.
        what: String,
        /// The underlying device error.
        #[source]
        source: DevxError,
    },

    /// Writing a chain reference failed while removing. The table's
    /// chain is no longer guaranteed to be consistent.
    #[error("Fatal: failed to disconnect {what}: {source}")]
    FatalSplice {
        /// The matcher being disconnected.
        what: String,
        /// The underlying device error.
        #[source]
        source: DevxError,
    },

    /// Source and destination matchers cannot be paired for resize.
    #[error("Resize precondition failed: {reason}")]
    ResizePrecondition {
        /// The failed precondition.
        reason: String,
    },

    /// Referenced table or matcher does not exist.
    #[error("{what} not found")]
    NotFound {
        /// The missing object.
        what: String,
    },

    /// A device command outside allocation or chain writes failed.
    #[error("Device command failed during {operation}: {source}")]
    Device {
        /// The operation in progress.
        operation: String,
        /// The underlying device error.
        #[source]
        source: DevxError,
    },

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl HwsError {
    /// Creates a not supported error.
    pub fn not_supported(reason: impl Into<String>) -> Self {
        Self::NotSupported {
            reason: reason.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Creates an allocation error.
    pub fn allocation(what: impl Into<String>, source: DevxError) -> Self {
        Self::Allocation {
            what: what.into(),
            source,
        }
    }

    /// Creates a resize precondition error.
    pub fn resize_precondition(reason: impl Into<String>) -> Self {
        Self::ResizePrecondition {
            reason: reason.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the reason code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HwsError::NotSupported { .. } => ErrorKind::NotSupported,
            HwsError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            HwsError::Allocation { .. } => ErrorKind::Allocation,
            HwsError::NoMemory { .. } => ErrorKind::NoMemory,
            HwsError::Splice { .. } => ErrorKind::Splice,
            HwsError::FatalSplice { .. } => ErrorKind::FatalSplice,
            HwsError::ResizePrecondition { .. } => ErrorKind::ResizePrecondition,
            HwsError::NotFound { .. } => ErrorKind::NotFound,
            HwsError::Device { .. } => ErrorKind::Device,
            HwsError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Returns the errno-style status of this error.
    pub fn status(&self) -> DevxStatus {
        match self {
            HwsError::NotSupported { .. } => DevxStatus::NotSupported,
            HwsError::InvalidArgument { .. } | HwsError::ResizePrecondition { .. } => {
                DevxStatus::InvalidParameter
            }
            HwsError::NoMemory { .. } => DevxStatus::NoMemory,
            HwsError::NotFound { .. } => DevxStatus::NotFound,
            HwsError::Allocation { source, .. }
            | HwsError::Splice { source, .. }
            | HwsError::FatalSplice { source, .. }
            | HwsError::Device { source, .. } => source.status(),
            HwsError::Internal { .. } => DevxStatus::IoError,
        }
    }

    /// Returns true if the table's chain may be left inconsistent.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HwsError::FatalSplice { .. })
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            HwsError::Allocation { source, .. } | HwsError::Splice { source, .. } => {
                source.is_retryable()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HwsError::not_supported("matcher depth exceeds limit 4");
        assert_eq!(err.to_string(), "Not supported: matcher depth exceeds limit 4");
        assert_eq!(err.kind(), ErrorKind::NotSupported);
    }

    #[test]
    fn test_no_memory_display() {
        let err = HwsError::NoMemory {
            required: 3,
            provisioned: 1,
        };
        assert!(err.to_string().contains("needs 3"));
        assert_eq!(err.status(), DevxStatus::NoMemory);
    }

    #[test]
    fn test_fatal_splice() {
        let err = HwsError::FatalSplice {
            what: "matcher#3".to_string(),
            source: DevxError::from_status(DevxStatus::IoError),
        };
        assert!(err.is_fatal());
        assert_eq!(err.kind(), ErrorKind::FatalSplice);
        assert!(!HwsError::internal("bug").is_fatal());
    }

    #[test]
    fn test_is_retryable() {
        let busy = HwsError::allocation("rtc", DevxError::from_status(DevxStatus::Busy));
        assert!(busy.is_retryable());
        assert!(!HwsError::resize_precondition("type mismatch").is_retryable());
    }
}
