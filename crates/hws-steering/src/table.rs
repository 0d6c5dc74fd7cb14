//! Tables and the miss relation between them.

use std::collections::BTreeSet;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use hws_devx::{
    DevxError, DevxResult, FlowTableOid, FwFtType, LookupRef, MatcherId, RtcOid, TableId,
    TableObjects, TableType,
};

use crate::context::Env;
use crate::error::{HwsError, HwsResult};
use crate::registry::Registry;

/// Attributes of a new table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableAttr {
    pub table_type: TableType,
    /// Level 0 is the root table.
    #[serde(default)]
    pub level: u32,
}

impl TableAttr {
    pub fn new(table_type: TableType, level: u32) -> Self {
        Self { table_type, level }
    }
}

/// Snapshot of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub id: TableId,
    pub table_type: TableType,
    pub level: u32,
    pub ft: FlowTableOid,
    pub local_ft: Option<FlowTableOid>,
    pub chain: Vec<MatcherId>,
    pub isolated: Vec<MatcherId>,
    pub miss_tbl: Option<TableId>,
}

#[derive(Debug)]
pub(crate) struct Table {
    pub id: TableId,
    pub table_type: TableType,
    pub level: u32,
    pub objs: TableObjects,
    /// Non-isolated matchers in lookup order.
    pub chain: Vec<MatcherId>,
    pub isolated: Vec<MatcherId>,
    pub miss_tbl: Option<TableId>,
    /// Tables whose miss target is this table.
    pub miss_sources: BTreeSet<TableId>,
}

impl Table {
    pub fn is_root(&self) -> bool {
        self.level == 0
    }

    pub fn fw_ft_type(&self) -> FwFtType {
        self.table_type.fw_ft_type(false)
    }

    pub fn info(&self) -> TableInfo {
        TableInfo {
            id: self.id,
            table_type: self.table_type,
            level: self.level,
            ft: self.objs.ft,
            local_ft: self.objs.local_ft,
            chain: self.chain.clone(),
            isolated: self.isolated.clone(),
            miss_tbl: self.miss_tbl,
        }
    }
}

fn lookup_table(reg: &Registry, id: TableId) -> DevxResult<&Table> {
    reg.get_table(id)
        .ok_or_else(|| DevxError::not_found(id.to_string()))
}

/// Origin lookup pair of a table's first chain member.
fn head_lookup(reg: &Registry, id: TableId) -> DevxResult<Option<(LookupRef, Option<RtcOid>)>> {
    let tbl = lookup_table(reg, id)?;
    let Some(head) = tbl.chain.first() else {
        return Ok(None);
    };
    reg.get_matcher(*head)
        .and_then(|m| m.lookup())
        .map(Some)
        .ok_or_else(|| DevxError::not_found(head.to_string()))
}

/// Anchor the table's traffic leaves through when nothing matched.
fn last_ft(reg: &Registry, id: TableId) -> DevxResult<FlowTableOid> {
    let tbl = lookup_table(reg, id)?;
    match tbl.chain.last() {
        Some(tail) => reg
            .get_matcher(*tail)
            .and_then(|m| m.end_ft)
            .ok_or_else(|| DevxError::not_found(tail.to_string())),
        None => Ok(tbl.objs.ft),
    }
}

/// Points `ft` of table `src` at the lookup of `dst`, or at its entry anchor
/// when `dst` has no matchers. With no `dst` the default miss is restored.
pub(crate) fn connect_src_ft_to_miss_table(
    env: &Env,
    reg: &Registry,
    src: TableId,
    ft: FlowTableOid,
    dst: Option<TableId>,
) -> DevxResult<()> {
    let src_tbl = lookup_table(reg, src)?;
    let fw_ft_type = src_tbl.fw_ft_type();
    let table_type = src_tbl.table_type;
    let ops = env.ft();

    let Some(dst) = dst else {
        ops.ft_set_default_next_ft(table_type, ft)?;
        return ops.ft_set_next_rtc(ft, fw_ft_type, None, None);
    };

    match head_lookup(reg, dst)? {
        Some((rtc_0, rtc_1)) => {
            ops.ft_set_next_rtc(ft, fw_ft_type, Some(rtc_0), rtc_1)?;
            ops.ft_set_default_next_ft(table_type, ft)
        }
        None => {
            let dst_ft = lookup_table(reg, dst)?.objs.ft;
            ops.ft_set_next_ft(ft, fw_ft_type, dst_ft)?;
            ops.ft_set_next_rtc(ft, fw_ft_type, None, None)
        }
    }
}

/// Connects the tail of `src` to `dst`. Unless `only_update_last_ft` is set
/// the isolated matchers of `src` follow as well.
pub(crate) fn connect_to_miss_table(
    env: &Env,
    reg: &Registry,
    src: TableId,
    dst: Option<TableId>,
    only_update_last_ft: bool,
) -> DevxResult<()> {
    let tail = last_ft(reg, src)?;
    connect_src_ft_to_miss_table(env, reg, src, tail, dst)?;

    if only_update_last_ft {
        return Ok(());
    }

    for id in &lookup_table(reg, src)?.isolated {
        let anchor = reg
            .get_matcher(*id)
            .and_then(|m| m.end_ft)
            .ok_or_else(|| DevxError::not_found(id.to_string()))?;
        connect_src_ft_to_miss_table(env, reg, src, anchor, dst)?;
    }
    Ok(())
}

/// Re-points every table missing into `tbl` at its current head.
pub(crate) fn update_connected_miss_tables(
    env: &Env,
    reg: &Registry,
    tbl: TableId,
) -> DevxResult<()> {
    for src in &lookup_table(reg, tbl)?.miss_sources {
        connect_to_miss_table(env, reg, *src, Some(tbl), false).map_err(|e| {
            error!("HwsTable: Failed to update {} missing into {}: {}", src, tbl, e);
            e
        })?;
    }
    Ok(())
}

pub(crate) fn create_table(env: &Env, reg: &mut Registry, attr: &TableAttr) -> HwsResult<TableId> {
    let objs = env
        .ft()
        .create_table(attr.table_type, env.config.shared)
        .map_err(|e| {
            error!("HwsTable: Failed to create {} table: {}", attr.table_type, e);
            HwsError::allocation("table anchors", e)
        })?;

    let id = reg.next_table_id();
    reg.insert_table(Table {
        id,
        table_type: attr.table_type,
        level: attr.level,
        objs,
        chain: Vec::new(),
        isolated: Vec::new(),
        miss_tbl: None,
        miss_sources: BTreeSet::new(),
    });
    reg.stats.tables_created += 1;

    info!(
        "HwsTable: Created {} type {} level {} anchor {}",
        id, attr.table_type, attr.level, objs.ft
    );
    Ok(id)
}

pub(crate) fn destroy_table(env: &Env, reg: &mut Registry, id: TableId) -> HwsResult<()> {
    let tbl = reg.table(id)?;
    if !tbl.chain.is_empty() || !tbl.isolated.is_empty() {
        return Err(HwsError::invalid_argument(format!(
            "{} still has {} matchers",
            id,
            tbl.chain.len() + tbl.isolated.len()
        )));
    }
    if let Some(src) = tbl.miss_sources.iter().next() {
        return Err(HwsError::invalid_argument(format!(
            "{} is the miss table of {}",
            id, src
        )));
    }
    let objs = tbl.objs;
    let miss_tbl = tbl.miss_tbl;

    if let Some(miss) = miss_tbl {
        if let Ok(dst) = reg.table_mut(miss) {
            dst.miss_sources.remove(&id);
        }
    }
    reg.remove_table(id);
    reg.stats.tables_destroyed += 1;

    env.ft().destroy_table(&objs).map_err(|e| {
        error!("HwsTable: Failed to destroy anchors of {}: {}", id, e);
        HwsError::Device {
            operation: format!("destroy {}", id),
            source: e,
        }
    })?;

    info!("HwsTable: Destroyed {}", id);
    Ok(())
}

/// Sets the table `src` misses into.
pub(crate) fn set_table_miss(
    env: &Env,
    reg: &mut Registry,
    src: TableId,
    dst: Option<TableId>,
) -> HwsResult<()> {
    let src_tbl = reg.table(src)?;
    if src_tbl.is_root() {
        return Err(HwsError::not_supported("root table miss is not supported"));
    }
    if let Some(dst) = dst {
        let dst_tbl = reg.table(dst)?;
        if dst == src {
            return Err(HwsError::invalid_argument(format!(
                "{} cannot miss into itself",
                src
            )));
        }
        if dst_tbl.is_root() {
            return Err(HwsError::not_supported("miss into a root table is not supported"));
        }
        if dst_tbl.table_type != src_tbl.table_type {
            return Err(HwsError::invalid_argument(format!(
                "{} ({}) cannot miss into {} ({})",
                src, src_tbl.table_type, dst, dst_tbl.table_type
            )));
        }
    }
    let old = src_tbl.miss_tbl;

    connect_to_miss_table(env, reg, src, dst, false).map_err(|e| {
        error!("HwsTable: Failed to connect {} to miss table: {}", src, e);
        HwsError::Splice {
            what: src.to_string(),
            source: e,
        }
    })?;

    if let Some(old) = old {
        reg.table_mut(old)?.miss_sources.remove(&src);
    }
    if let Some(dst) = dst {
        reg.table_mut(dst)?.miss_sources.insert(src);
    }
    reg.table_mut(src)?.miss_tbl = dst;

    debug!("HwsTable: {} now misses into {:?}", src, dst);
    Ok(())
}
