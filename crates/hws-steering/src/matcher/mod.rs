//! Matchers: priority-ordered lookup stages of a table.

mod binder;
pub(crate) mod chain;
pub(crate) mod lifecycle;
mod pool;
pub(crate) mod resize;
pub(crate) mod shared;
pub mod types;
pub(crate) mod validate;

use hws_devx::{
    ActionTemplate, AliasOid, FlowTableOid, LookupRef, MatchTemplate, MatcherDefiners, MatcherId,
    RtcOid, TableId,
};

pub(crate) use binder::{ActionSte, RtcPair};
use pool::StePool;
pub use types::{
    DistributeMode, FlowSource, InsertMode, MatchMode, MatcherAttr, MatcherInfo, MatcherSize,
    MatcherState, ResizeRecordInfo, ResourceMode, SteeringStats,
};
use types::MatcherFlags;

/// Action resources handed from a resize source to its destination.
#[derive(Debug)]
pub(crate) struct ResizeRecord {
    pub source: MatcherId,
    pub max_stes: u32,
    pub action: Option<ActionSte>,
}

/// A matcher and every hardware object it owns.
#[derive(Debug)]
pub(crate) struct Matcher {
    pub id: MatcherId,
    pub table: TableId,
    pub attr: MatcherAttr,
    pub size: MatcherSize,
    pub flags: MatcherFlags,
    pub state: MatcherState,
    pub mt: Vec<MatchTemplate>,
    pub at: Vec<ActionTemplate>,
    pub definers: Option<MatcherDefiners>,
    pub match_pool: Option<StePool>,
    pub match_rtc: Option<RtcPair>,
    pub end_ft: Option<FlowTableOid>,
    pub max_stes: u32,
    pub action_ste: Option<ActionSte>,
    pub alias: Option<AliasOid>,
    pub col_matcher: Option<MatcherId>,
    pub parent: Option<MatcherId>,
    pub resize_dst: Option<MatcherId>,
    pub resize_data: Vec<ResizeRecord>,
}

impl Matcher {
    pub fn new(
        id: MatcherId,
        table: TableId,
        attr: MatcherAttr,
        size: MatcherSize,
        flags: MatcherFlags,
        mt: Vec<MatchTemplate>,
        at: Vec<ActionTemplate>,
    ) -> Self {
        Self {
            id,
            table,
            attr,
            size,
            flags,
            state: MatcherState::Uninitialized,
            mt,
            at,
            definers: None,
            match_pool: None,
            match_rtc: None,
            end_ft: None,
            max_stes: 0,
            action_ste: None,
            alias: None,
            col_matcher: None,
            parent: None,
            resize_dst: None,
            resize_data: Vec::new(),
        }
    }

    pub fn is_isolated(&self) -> bool {
        self.attr.isolated
    }

    pub fn is_in_resize(&self) -> bool {
        self.resize_dst.is_some()
    }

    pub fn is_jumbo(&self) -> bool {
        self.definers.as_ref().is_some_and(MatcherDefiners::is_jumbo)
    }

    /// Origin lookup pair, as referenced by anchors of this instance.
    pub fn lookup(&self) -> Option<(LookupRef, Option<RtcOid>)> {
        self.match_rtc
            .map(|rtc| (LookupRef::Rtc(rtc.rtc_0), rtc.mirror()))
    }

    /// Primary lookup as seen from the local instance: the alias when one
    /// exists.
    pub fn local_lookup(&self) -> Option<LookupRef> {
        match self.alias {
            Some(alias) => Some(LookupRef::Alias(alias)),
            None => self.match_rtc.map(|rtc| LookupRef::Rtc(rtc.rtc_0)),
        }
    }

    pub fn info(&self) -> MatcherInfo {
        MatcherInfo {
            id: self.id,
            table: self.table,
            priority: self.attr.priority,
            isolated: self.attr.isolated,
            col_matcher: self.col_matcher,
            parent: self.parent,
            size: self.size,
            state: self.state,
            max_stes: self.max_stes,
            num_of_mt: self.mt.len(),
            num_of_at: self.at.len(),
            at_attach_budget: self.attr.max_num_of_at_attach,
            end_ft: self.end_ft,
            rtc_0: self.match_rtc.map(|rtc| rtc.rtc_0),
            rtc_1: self.match_rtc.and_then(|rtc| rtc.mirror()),
            alias: self.alias,
            action_rtc_0: self.action_ste.as_ref().map(|a| a.rtc.rtc_0),
            action_rtc_1: self.action_ste.as_ref().and_then(|a| a.rtc.mirror()),
            resize_dst: self.resize_dst,
        }
    }

    pub fn resize_records(&self) -> Vec<ResizeRecordInfo> {
        self.resize_data
            .iter()
            .map(|rec| ResizeRecordInfo {
                source: rec.source,
                max_stes: rec.max_stes,
                has_resources: rec.action.is_some(),
            })
            .collect()
    }
}
