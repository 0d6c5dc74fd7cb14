//! Hardware steering matcher pipeline.
//!
//! Tables hold matchers in priority order. Each matcher owns its lookup
//! resources and an end anchor; the anchors are wired so a packet that
//! misses one matcher continues to the next and, after the last, to the
//! table's miss target.
//!
//! # Architecture
//!
//! - [`context`]: Public entry point and control lock
//! - [`table`]: Tables and the miss relation between them
//! - [`matcher`]: Validation, resource binding, chain splicing, resize
//! - [`config`]: Tunables loaded from JSON
//! - [`error`]: Error types with reason codes
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hws_steering::{Backend, Context, MatcherAttr, SteeringConfig, TableAttr};
//! use hws_devx::{DeviceCaps, TableType};
//!
//! let ctx = Context::new(Backend::from_device(device), DeviceCaps::default(), SteeringConfig::default());
//! let tbl = ctx.create_table(&TableAttr::new(TableType::NicRx, 1))?;
//! let m = ctx.create_matcher(tbl, &mts, &ats, &MatcherAttr::rule(10, 8))?;
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod matcher;
mod registry;
pub mod table;

pub use config::SteeringConfig;
pub use context::{Backend, Context};
pub use error::{ErrorKind, HwsError, HwsResult};
pub use matcher::{
    DistributeMode, FlowSource, InsertMode, MatchMode, MatcherAttr, MatcherInfo, MatcherSize,
    MatcherState, ResizeRecordInfo, ResourceMode, SteeringStats,
};
pub use table::{TableAttr, TableInfo};
