//! Flow table object operations.
//!
//! Flow tables are the anchors of the steering pipeline: each table has an
//! entry anchor, every matcher has an end anchor, and each anchor is pointed
//! at the next lookup resource (or another anchor) to form the chain.

use crate::error::DevxResult;
use crate::types::{AliasOid, FlowTableOid, FwFtType, RtcOid, TableType};

/// Anchors created for a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableObjects {
    /// Entry anchor of the table.
    pub ft: FlowTableOid,
    /// Anchor on the local instance, present for shared domains.
    pub local_ft: Option<FlowTableOid>,
}

/// Reference written into an anchor's primary lookup slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupRef {
    /// Lookup resource owned by this instance.
    Rtc(RtcOid),
    /// Alias to a lookup resource owned by another instance.
    Alias(AliasOid),
}

impl LookupRef {
    /// Returns the raw object number written to hardware.
    pub fn as_raw(&self) -> u32 {
        match self {
            LookupRef::Rtc(rtc) => rtc.as_raw(),
            LookupRef::Alias(alias) => alias.as_raw(),
        }
    }
}

impl From<RtcOid> for LookupRef {
    fn from(rtc: RtcOid) -> Self {
        LookupRef::Rtc(rtc)
    }
}

/// Flow table object operations.
pub trait FlowTableOps: Send + Sync {
    /// Creates the anchors of a new table.
    fn create_table(&self, table_type: TableType, shared: bool) -> DevxResult<TableObjects>;

    /// Destroys the anchors of a table.
    fn destroy_table(&self, objs: &TableObjects) -> DevxResult<()>;

    /// Creates a default (pass-through) anchor for a matcher.
    fn create_default_ft(&self, table_type: TableType) -> DevxResult<FlowTableOid>;

    /// Destroys a matcher anchor.
    fn destroy_default_ft(&self, ft: FlowTableOid) -> DevxResult<()>;

    /// Points an anchor at a lookup resource pair. `None` for both clears
    /// the reference.
    fn ft_set_next_rtc(
        &self,
        ft: FlowTableOid,
        fw_ft_type: FwFtType,
        rtc_0: Option<LookupRef>,
        rtc_1: Option<RtcOid>,
    ) -> DevxResult<()>;

    /// Points an anchor's miss path at another anchor.
    fn ft_set_next_ft(
        &self,
        ft: FlowTableOid,
        fw_ft_type: FwFtType,
        next_ft: FlowTableOid,
    ) -> DevxResult<()>;

    /// Restores the default miss path of an anchor.
    fn ft_set_default_next_ft(&self, table_type: TableType, ft: FlowTableOid) -> DevxResult<()>;

    /// Connects an anchor to the domain default miss.
    fn ft_connect_default_miss(&self, table_type: TableType, ft: FlowTableOid)
        -> DevxResult<()>;
}
