//! Interfaces to the hardware and to the steering core's collaborators.
//!
//! # Available API Modules
//!
//! - [`cmd`]: Object creation, destruction and cross-instance access
//! - [`flow_table`]: Flow table anchors and their next-hop references
//! - [`template`]: Compiled match/action templates and their definers
//! - [`caps`]: Device capability snapshot
//! - [`rule`]: Rule migration during resize

pub mod caps;
pub mod cmd;
pub mod flow_table;
pub mod rule;
pub mod template;

// Re-export commonly used items
pub use caps::{DeviceCaps, GenWqeFormats};
pub use cmd::{
    AliasCreateAttr, AllowAccessAttr, DevxCmd, ObjCreateAttr, RtcAccessIndexMode, RtcCreateAttr,
    RtcUpdateIndexMode, SteRangeCreateAttr, StcCreateAttr,
};
pub use flow_table::{FlowTableOps, LookupRef, TableObjects};
pub use rule::{RuleAttr, RuleHandle, RuleMover};
pub use template::{
    ActionTemplate, ActionType, Definer, DefinerField, DefinerKind, MatchTemplate,
    MatcherDefiners, TemplateCompiler,
};
