//! Typed interfaces to the hardware steering command layer.
//!
//! This crate describes everything the steering core needs from the outside
//! world: hardware object commands, flow table anchors, the template
//! compiler and the rule engine. Object numbers are wrapped in typed IDs so
//! a flow table can never be written where a lookup resource is expected.
//!
//! # Architecture
//!
//! - [`types`]: Typed object IDs, table domains and steering handles
//! - [`error`]: Error types and status handling
//! - [`api`]: Collaborator traits and their attribute structs
//!
//! # Example
//!
//! ```ignore
//! use hws_devx::{DevxCmd, DevxResult, RtcCreateAttr, RtcOid};
//!
//! fn create_lookup(cmd: &dyn DevxCmd, log_size: u8) -> DevxResult<RtcOid> {
//!     cmd.create_rtc(RtcCreateAttr {
//!         log_size,
//!         ..Default::default()
//!     })
//! }
//! ```

pub mod api;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use types::{
    AliasKind, AliasOid, DevxObjType, DevxObjectId, DevxObjectKind, FlowTableKind, FlowTableOid,
    FwFtType, MatcherId, RawObjectId, RtcKind, RtcOid, SteRangeKind, SteRangeOid, StcKind, StcOid,
    TableId, TableType,
};

pub use error::{DevxError, DevxResult, DevxStatus, DevxStatusExt};

pub use api::{
    ActionTemplate, ActionType, AliasCreateAttr, AllowAccessAttr, Definer, DefinerField,
    DefinerKind, DeviceCaps, DevxCmd, FlowTableOps, GenWqeFormats, LookupRef, MatchTemplate,
    MatcherDefiners, ObjCreateAttr, RtcAccessIndexMode, RtcCreateAttr, RtcUpdateIndexMode,
    RuleAttr, RuleHandle, RuleMover, SteRangeCreateAttr, StcCreateAttr, TableObjects,
    TemplateCompiler,
};
