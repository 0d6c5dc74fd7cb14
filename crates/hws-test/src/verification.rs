//! Verification helpers for steering tests
//!
//! Provides assertion helpers to verify the references written into the
//! mock device and the balance of its live objects

use hws_devx::RawObjectId;
use thiserror::Error;

use crate::mock::{LiveSnapshot, MockDevice};

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Chain from 0x{entry:x} mismatch: expected {expected:x?}, walked {actual:x?}")]
    ChainMismatch {
        entry: RawObjectId,
        expected: Vec<RawObjectId>,
        actual: Vec<RawObjectId>,
    },

    #[error("Flow table 0x{ft:x} not found")]
    FlowTableNotFound { ft: RawObjectId },

    #[error("Flow table 0x{ft:x} points at {actual:x?}, expected {expected:x?}")]
    TargetMismatch {
        ft: RawObjectId,
        expected: Option<RawObjectId>,
        actual: Option<RawObjectId>,
    },

    #[error("Flow table 0x{ft:x} miss path: expected next ft {expected:x?}, got {actual:x?}")]
    MissMismatch {
        ft: RawObjectId,
        expected: Option<RawObjectId>,
        actual: Option<RawObjectId>,
    },

    #[error("Live objects changed: before {before:?}, after {after:?}")]
    Leak {
        before: LiveSnapshot,
        after: LiveSnapshot,
    },

    #[error("{count} invalid destroy calls")]
    InvalidDestroy { count: usize },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Flow table chain verification helper
pub struct ChainVerifier<'a> {
    dev: &'a MockDevice,
}

impl<'a> ChainVerifier<'a> {
    /// Create a new chain verifier
    pub fn new(dev: &'a MockDevice) -> Self {
        Self { dev }
    }

    /// Verify the lookup resources reached from `entry`, in order
    pub fn assert_chain(&self, entry: RawObjectId, expected: &[RawObjectId]) -> VerifyResult<()> {
        let actual = self.dev.walk_from(entry);
        if actual != expected {
            return Err(VerificationError::ChainMismatch {
                entry,
                expected: expected.to_vec(),
                actual,
            });
        }
        Ok(())
    }

    /// Verify the primary lookup reference of a flow table
    pub fn assert_points_to(
        &self,
        ft: RawObjectId,
        expected: Option<RawObjectId>,
    ) -> VerifyResult<()> {
        let edges = self
            .dev
            .edges(ft)
            .ok_or(VerificationError::FlowTableNotFound { ft })?;
        if edges.rtc_0 != expected {
            return Err(VerificationError::TargetMismatch {
                ft,
                expected,
                actual: edges.rtc_0,
            });
        }
        Ok(())
    }

    /// Verify the miss path of a flow table
    pub fn assert_misses_to(
        &self,
        ft: RawObjectId,
        expected: Option<RawObjectId>,
    ) -> VerifyResult<()> {
        let edges = self
            .dev
            .edges(ft)
            .ok_or(VerificationError::FlowTableNotFound { ft })?;
        if edges.next_ft != expected {
            return Err(VerificationError::MissMismatch {
                ft,
                expected,
                actual: edges.next_ft,
            });
        }
        Ok(())
    }

    /// Verify that live objects match an earlier snapshot and that no
    /// object was destroyed twice or while still referenced
    pub fn assert_balanced(&self, before: &LiveSnapshot) -> VerifyResult<()> {
        let after = self.dev.snapshot();
        if after != *before {
            return Err(VerificationError::Leak {
                before: *before,
                after,
            });
        }
        let count = self.dev.invalid_destroys();
        if count != 0 {
            return Err(VerificationError::InvalidDestroy { count });
        }
        Ok(())
    }
}
