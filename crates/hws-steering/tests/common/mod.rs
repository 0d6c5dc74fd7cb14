//! Shared setup for steering integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use hws_devx::{
    ActionTemplate, DeviceCaps, MatchTemplate, MatcherId, RawObjectId, TableId, TableType,
};
use hws_steering::{
    Backend, Context, HwsResult, InsertMode, MatchMode, MatcherAttr, SteeringConfig, TableAttr,
};
use hws_test::{action_fixtures, caps_fixtures, init_logging, match_fixtures, MockDevice};

pub struct Harness {
    pub dev: Arc<MockDevice>,
    pub ctx: Context,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(caps_fixtures::full(), SteeringConfig::default())
    }

    pub fn shared() -> Self {
        Self::with(caps_fixtures::shared(7), SteeringConfig::shared())
    }

    pub fn with(caps: DeviceCaps, config: SteeringConfig) -> Self {
        init_logging();
        let dev = Arc::new(MockDevice::new());
        let ctx = Context::new(Backend::from_device(dev.clone()), caps, config);
        Self { dev, ctx }
    }

    pub fn table(&self, table_type: TableType) -> TableId {
        self.ctx
            .create_table(&TableAttr::new(table_type, 1))
            .expect("create table")
    }

    /// Matcher with a single five-tuple template and an inline action.
    pub fn matcher(&self, tbl: TableId, attr: &MatcherAttr) -> HwsResult<MatcherId> {
        self.matcher_with(
            tbl,
            &[match_fixtures::five_tuple(1)],
            &[action_fixtures::count_drop(1)],
            attr,
        )
    }

    pub fn matcher_with(
        &self,
        tbl: TableId,
        mt: &[MatchTemplate],
        at: &[ActionTemplate],
        attr: &MatcherAttr,
    ) -> HwsResult<MatcherId> {
        self.ctx.create_matcher(tbl, mt, at, attr)
    }

    /// Small hash matcher at `priority`.
    pub fn small(&self, tbl: TableId, priority: u32) -> MatcherId {
        self.matcher(tbl, &MatcherAttr::htable(priority, 4, 1))
            .expect("create matcher")
    }

    pub fn entry_ft(&self, tbl: TableId) -> RawObjectId {
        self.ctx.table_info(tbl).unwrap().ft.as_raw()
    }

    pub fn local_ft(&self, tbl: TableId) -> RawObjectId {
        self.ctx
            .table_info(tbl)
            .unwrap()
            .local_ft
            .expect("shared table has a local anchor")
            .as_raw()
    }

    pub fn end_ft(&self, m: MatcherId) -> RawObjectId {
        self.ctx.matcher_info(m).unwrap().end_ft.unwrap().as_raw()
    }

    pub fn rtc0(&self, m: MatcherId) -> RawObjectId {
        self.ctx.matcher_info(m).unwrap().rtc_0.unwrap().as_raw()
    }

    pub fn rtcs(&self, ms: &[MatcherId]) -> Vec<RawObjectId> {
        ms.iter().map(|m| self.rtc0(*m)).collect()
    }

    pub fn priorities(&self, tbl: TableId) -> Vec<u32> {
        self.ctx
            .table_chain(tbl)
            .unwrap()
            .iter()
            .map(|m| self.ctx.matcher_info(*m).unwrap().priority)
            .collect()
    }
}

/// Index-addressed matcher usable as an isolated fallback.
pub fn ste_array_attr(priority: u32) -> MatcherAttr {
    MatcherAttr::htable(priority, 4, 0)
        .with_insert_mode(InsertMode::ByIndex)
        .with_isolated(true)
}

/// Index-addressed matcher where every lookup hits.
pub fn always_hit_attr(priority: u32) -> MatcherAttr {
    MatcherAttr::htable(priority, 6, 0)
        .with_insert_mode(InsertMode::ByIndex)
        .with_match_mode(MatchMode::AlwaysHit)
}
