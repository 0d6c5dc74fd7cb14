//! Hardware resource binding for matchers.
//!
//! A matcher owns two kinds of entry resources: the match lookup (pool +
//! RTC pair sized by the matcher geometry) and, when its action templates
//! need more than the inline entry, an action entry array (pool + RTC pair
//! + jump action).

use std::fmt;

use log::{debug, error};

use hws_devx::{
    ActionTemplate, RtcAccessIndexMode, RtcCreateAttr, RtcOid, RtcUpdateIndexMode,
    StcCreateAttr, StcOid, TableType,
};

use super::pool::{PoolOpt, StePool};
use super::types::{DistributeMode, FlowSource, InsertMode, MatchMode};
use super::validate;
use super::Matcher;
use crate::context::Env;
use crate::error::{HwsError, HwsResult};

/// Mirror side of a lookup pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MirrorRtc {
    /// No mirror direction.
    None,
    /// Separate mirror resource owned by the pair.
    Owned(RtcOid),
    /// Unified domain: the primary serves both directions.
    SameAsPrimary,
}

/// Primary and mirror lookup resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RtcPair {
    pub rtc_0: RtcOid,
    pub rtc_1: MirrorRtc,
}

impl RtcPair {
    /// Mirror reference to write into anchors.
    pub fn mirror(&self) -> Option<RtcOid> {
        match self.rtc_1 {
            MirrorRtc::None => None,
            MirrorRtc::Owned(rtc) => Some(rtc),
            MirrorRtc::SameAsPrimary => Some(self.rtc_0),
        }
    }

    pub fn destroy(self, env: &Env) {
        let cmd = env.cmd();
        if let MirrorRtc::Owned(rtc_1) = self.rtc_1 {
            if let Err(e) = cmd.destroy_rtc(rtc_1) {
                error!("HwsMatcher: Failed to destroy mirror {}: {}", rtc_1, e);
            }
        }
        if let Err(e) = cmd.destroy_rtc(self.rtc_0) {
            error!("HwsMatcher: Failed to destroy {}: {}", self.rtc_0, e);
        }
    }
}

/// Supplemental action entries of a matcher.
#[derive(Debug)]
pub(crate) struct ActionSte {
    pub pool: StePool,
    pub rtc: RtcPair,
    pub stc: StcOid,
}

impl ActionSte {
    pub fn release(self, env: &Env) {
        if let Err(e) = env.cmd().destroy_stc(self.stc) {
            error!("HwsMatcher: Failed to destroy action {}: {}", self.stc, e);
        }
        self.rtc.destroy(env);
        self.pool.destroy(env);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RtcType {
    Match,
    SteArray,
}

impl fmt::Display for RtcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtcType::Match => write!(f, "match RTC"),
            RtcType::SteArray => write!(f, "action RTC"),
        }
    }
}

/// Smallest `n` with `1 << n >= v`.
pub(crate) fn log2ceil(v: u32) -> u8 {
    if v <= 1 {
        return 0;
    }
    (u32::BITS - (v - 1).leading_zeros()) as u8
}

fn set_rtc_attr_sz(
    m: &Matcher,
    table_type: TableType,
    attr: &mut RtcCreateAttr,
    rtc_type: RtcType,
    ste_order: u8,
    is_mirror: bool,
) {
    let unused = (!is_mirror && m.attr.flow_src == FlowSource::Vport)
        || (is_mirror && m.attr.flow_src == FlowSource::Wire)
        || (!is_mirror && table_type == TableType::FdbTx)
        || (is_mirror && table_type == TableType::FdbRx);

    if unused {
        attr.log_size = 0;
        attr.log_depth = 0;
        return;
    }

    match rtc_type {
        RtcType::Match => {
            attr.log_size = m.size.row_log;
            attr.log_depth = m.size.col_log;
        }
        RtcType::SteArray => {
            attr.log_size = ste_order;
            attr.log_depth = 0;
        }
    }
}

/// Creates the lookup pair of `rtc_type` on `pool`.
pub(crate) fn create_rtc(
    env: &Env,
    table_type: TableType,
    m: &Matcher,
    rtc_type: RtcType,
    pool: &StePool,
) -> HwsResult<RtcPair> {
    let caps = &env.caps;
    let cfg = &env.config;
    let mut attr = RtcCreateAttr::default();
    let ste_order;

    match rtc_type {
        RtcType::Match => {
            let defs = m
                .definers
                .as_ref()
                .ok_or_else(|| HwsError::internal(format!("{} has no definers", m.id)))?;
            let miss_ft = m
                .end_ft
                .ok_or_else(|| HwsError::internal(format!("{} has no end anchor", m.id)))?;
            ste_order = m.size.total_log() + u8::from(defs.is_range());
            let first = defs.match_definers.first().map_or(0, |d| d.id);

            attr.is_frst_jumbo = defs.is_jumbo();
            attr.is_scnd_range = defs.is_range();
            attr.is_compare = m.flags.compare;
            attr.miss_ft_id = Some(miss_ft);

            match m.attr.insert_mode {
                InsertMode::ByHash => {
                    attr.update_index_mode = RtcUpdateIndexMode::ByHash;
                    if let Some(hash) = &defs.hash_definer {
                        attr.match_definer_0 = hash.id;
                        attr.num_hash_definer = 1;
                        attr.fw_gen_wqe = true;
                    } else if m.flags.compare {
                        attr.match_definer_0 = caps.trivial_match_definer;
                        attr.num_hash_definer = 1;
                        attr.fw_gen_wqe = true;
                    } else {
                        attr.match_definer_0 = first;
                        if m.flags.range_definer {
                            attr.num_hash_definer = 1;
                            attr.fw_gen_wqe = true;
                        }
                    }
                }
                InsertMode::ByIndex => {
                    attr.update_index_mode = RtcUpdateIndexMode::ByOffset;
                    match m.attr.distribute_mode {
                        DistributeMode::ByHash => {
                            if m.attr.match_mode == MatchMode::AlwaysHit {
                                attr.num_hash_definer = 1;
                            }
                            attr.access_index_mode = RtcAccessIndexMode::ByHash;
                            attr.match_definer_0 = first;
                        }
                        DistributeMode::ByLinear => {
                            attr.num_hash_definer = 1;
                            attr.access_index_mode = RtcAccessIndexMode::Linear;
                            attr.match_definer_0 = caps.linear_match_definer;
                        }
                    }
                }
            }
        }
        RtcType::SteArray => {
            ste_order = log2ceil(m.max_stes) + m.size.row_log;
            attr.update_index_mode = RtcUpdateIndexMode::ByOffset;
            attr.match_definer_0 = caps.trivial_match_definer;
        }
    }

    attr.pd = cfg.pd;
    attr.ste_base = pool.base(false);
    attr.ste_offset = 0;
    attr.reparse_mode = cfg.reparse_mode;
    attr.table_type = Some(table_type.fw_ft_type(false));
    attr.stc_base = cfg.stc_base;
    set_rtc_attr_sz(m, table_type, &mut attr, rtc_type, ste_order, false);

    let cmd = env.cmd();
    let rtc_0 = cmd.create_rtc(attr.clone()).map_err(|e| {
        error!("HwsMatcher: Failed to create {} for {}: {}", rtc_type, m.id, e);
        HwsError::allocation(rtc_type.to_string(), e)
    })?;

    let rtc_1 = match table_type {
        TableType::FdbUnified => MirrorRtc::SameAsPrimary,
        tt if tt.fdb_no_unified() => {
            attr.ste_base = pool.base(true);
            attr.table_type = Some(table_type.fw_ft_type(true));
            attr.stc_base = cfg.stc_base_mirror;
            set_rtc_attr_sz(m, table_type, &mut attr, rtc_type, ste_order, true);
            match cmd.create_rtc(attr) {
                Ok(rtc_1) => MirrorRtc::Owned(rtc_1),
                Err(e) => {
                    error!("HwsMatcher: Failed to create mirror {} for {}: {}", rtc_type, m.id, e);
                    if let Err(e) = cmd.destroy_rtc(rtc_0) {
                        error!("HwsMatcher: Failed to destroy {}: {}", rtc_0, e);
                    }
                    return Err(HwsError::allocation(format!("mirror {}", rtc_type), e));
                }
            }
        }
        _ => MirrorRtc::None,
    };

    debug!("HwsMatcher: Created {} {} for {}", rtc_type, rtc_0, m.id);
    Ok(RtcPair { rtc_0, rtc_1 })
}

/// Creates the match definers and match entry pool.
pub(crate) fn bind_mt(env: &Env, table_type: TableType, m: &mut Matcher) -> HwsResult<()> {
    // Collision matchers come with the parent's definers.
    if m.definers.is_none() {
        let defs = env
            .templates()
            .matcher_init(table_type, &m.mt)
            .map_err(|e| {
                error!("HwsMatcher: Failed to set matcher templates with match definers: {}", e);
                HwsError::allocation("match definers", e)
            })?;
        m.definers = Some(defs);
    }

    if let Err(e) = bind_match_pool(env, table_type, m) {
        release_definers(env, m);
        return Err(e);
    }
    Ok(())
}

fn bind_match_pool(env: &Env, table_type: TableType, m: &mut Matcher) -> HwsResult<()> {
    let defs = m
        .definers
        .as_ref()
        .ok_or_else(|| HwsError::internal(format!("{} has no definers", m.id)))?;

    m.flags.hash_definer = defs.hash_definer.is_some();
    m.flags.range_definer = defs.is_range();
    m.flags.compare = defs.compare;

    if m.flags.req_fw_wqe() {
        validate::supp_fw_wqe(&env.caps, &m.attr, &m.flags, defs)?;
    }

    if m.flags.compare {
        validate::validate_compare_attr(
            &env.caps,
            false,
            &m.attr,
            &m.size,
            m.mt.len(),
            m.at.len(),
        )?;
    }

    let log_sz = m.size.total_log() + u8::from(m.flags.range_definer);
    let opt = PoolOpt::for_matcher(m.attr.flow_src, table_type);
    let pool = StePool::create(env, table_type, log_sz, opt)?;
    m.match_pool = Some(pool);
    Ok(())
}

fn release_definers(env: &Env, m: &mut Matcher) {
    let defs = m.definers.take();
    if m.flags.collision {
        return;
    }
    if let Some(defs) = defs {
        env.templates().matcher_uninit(&defs);
    }
}

/// Releases the match entry pool and definers.
pub(crate) fn unbind_mt(env: &Env, m: &mut Matcher) {
    if let Some(pool) = m.match_pool.take() {
        pool.destroy(env);
    }
    release_definers(env, m);
}

/// Checks and prepares one action template.
pub(crate) fn check_and_process_at(
    env: &Env,
    table_type: TableType,
    at: &ActionTemplate,
) -> HwsResult<()> {
    let templates = env.templates();
    if !at.relaxed_order && !templates.check_action_combo(at, table_type) {
        error!("HwsMatcher: Invalid combination in action template {}", at.id);
        return Err(HwsError::invalid_argument(format!(
            "invalid action combination in template {}",
            at.id
        )));
    }

    templates.process_action_template(at).map_err(|e| {
        error!("HwsMatcher: Failed to process action template {}: {}", at.id, e);
        HwsError::allocation(format!("action template {} setters", at.id), e)
    })
}

/// Sizes and allocates the action entry resources.
pub(crate) fn bind_at(env: &Env, table_type: TableType, m: &mut Matcher) -> HwsResult<()> {
    if m.flags.collision {
        return Ok(());
    }

    if m.attr.max_num_of_at_attach > 0 && m.flags.req_fw_wqe() {
        return Err(HwsError::not_supported(
            "FW extended matcher doesn't support additional action templates",
        ));
    }

    let is_jumbo = m.is_jumbo();
    let mut max_stes = 0;
    for at in &m.at {
        check_and_process_at(env, table_type, at)?;
        max_stes = max_stes.max(at.required_stes(is_jumbo));
    }
    m.max_stes = max_stes;

    if max_stes == 0 {
        return Ok(());
    }

    if m.flags.req_fw_wqe() {
        return Err(HwsError::not_supported(
            "FW extended matcher doesn't support complex action templates",
        ));
    }

    let log_sz = log2ceil(max_stes) + m.size.row_log;
    let opt = PoolOpt::for_matcher(m.attr.flow_src, table_type);
    let pool = StePool::create(env, table_type, log_sz, opt)?;

    let rtc = match create_rtc(env, table_type, m, RtcType::SteArray, &pool) {
        Ok(rtc) => rtc,
        Err(e) => {
            pool.destroy(env);
            return Err(e);
        }
    };

    let stc = env.cmd().create_stc(StcCreateAttr {
        table_type: table_type.fw_ft_type(false),
        ste_base: pool.base(false),
        ste_offset: 0,
        log_size: pool.log_sz(),
        match_definer_id: env.caps.trivial_match_definer,
    });
    let stc = match stc {
        Ok(stc) => stc,
        Err(e) => {
            error!("HwsMatcher: Failed to allocate STE jump action for {}: {}", m.id, e);
            rtc.destroy(env);
            pool.destroy(env);
            return Err(HwsError::allocation("STE jump action", e));
        }
    };

    debug!(
        "HwsMatcher: Bound {} action STEs for {} (log size {})",
        max_stes, m.id, log_sz
    );
    m.action_ste = Some(ActionSte { pool, rtc, stc });
    Ok(())
}

/// Releases the action entry resources.
///
/// A matcher in resize no longer holds them; they travelled with its resize
/// record.
pub(crate) fn unbind_at(env: &Env, m: &mut Matcher) {
    if m.flags.collision || m.is_in_resize() {
        return;
    }
    if let Some(action) = m.action_ste.take() {
        action.release(env);
    }
}
