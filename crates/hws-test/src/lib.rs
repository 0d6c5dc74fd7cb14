//! Test infrastructure for the hardware steering core
//!
//! Provides:
//! - Mock device implementing every steering collaborator
//! - Failure injection for any device command
//! - Template and capability fixtures
//! - Chain and object-balance verification helpers

pub mod fixtures;
mod mock;
mod verification;

pub use fixtures::*;
pub use mock::{FailPoint, FtEdges, LiveSnapshot, MockDevice, MockObjKind, MockObject};
pub use verification::*;

/// Initialises test logging once per process.
///
/// Honours `RUST_LOG`; repeated calls are ignored.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
