//! Splicing matchers into and out of a table's priority chain.
//!
//! Each chain member's end anchor points at the next member's lookup pair;
//! the table's entry anchor points at the head and the tail's anchor misses
//! into the table's miss target.

use log::{debug, error};

use hws_devx::{DevxError, FlowTableOid, MatcherId, TableId};

use super::shared;
use crate::context::Env;
use crate::error::{HwsError, HwsResult};
use crate::registry::Registry;
use crate::table;

fn splice_err(id: MatcherId, step: &str, source: DevxError) -> HwsError {
    error!("HwsMatcher: Failed to {} for {}: {}", step, id, source);
    HwsError::Splice {
        what: id.to_string(),
        source,
    }
}

fn fatal_err(id: MatcherId, step: &str, source: DevxError) -> HwsError {
    error!("HwsMatcher: Fatal, failed to {} while removing {}: {}", step, id, source);
    HwsError::FatalSplice {
        what: id.to_string(),
        source,
    }
}

fn end_ft(reg: &Registry, id: MatcherId) -> HwsResult<FlowTableOid> {
    reg.matcher(id)?
        .end_ft
        .ok_or_else(|| HwsError::internal(format!("{} has no end anchor", id)))
}

/// Inserts a matcher into its table and writes the hardware references.
///
/// On failure the matcher is no longer listed in the table. Edges written
/// before the failure are not rolled back.
pub(crate) fn connect(env: &Env, reg: &mut Registry, id: MatcherId) -> HwsResult<()> {
    let m = reg.matcher(id)?;
    let tbl_id = m.table;
    let priority = m.attr.priority;

    if m.is_isolated() {
        let anchor = end_ft(reg, id)?;
        let miss = reg.table(tbl_id)?.miss_tbl;
        reg.table_mut(tbl_id)?.isolated.push(id);
        if let Err(e) = table::connect_src_ft_to_miss_table(env, reg, tbl_id, anchor, miss) {
            reg.table_mut(tbl_id)?.isolated.retain(|m| *m != id);
            return Err(splice_err(id, "connect isolated matcher to miss table", e));
        }
        debug!("HwsMatcher: Connected isolated {} in {}", id, tbl_id);
        return Ok(());
    }

    let tbl = reg.table(tbl_id)?;
    let mut pos = tbl.chain.len();
    for (idx, member) in tbl.chain.iter().enumerate() {
        if reg.matcher(*member)?.attr.priority > priority {
            pos = idx;
            break;
        }
    }
    let prev = pos.checked_sub(1).map(|idx| tbl.chain[idx]);
    let next = tbl.chain.get(pos).copied();

    reg.table_mut(tbl_id)?.chain.insert(pos, id);

    if let Err(e) = write_insert_edges(env, reg, tbl_id, id, prev, next) {
        reg.table_mut(tbl_id)?.chain.retain(|m| *m != id);
        return Err(e);
    }

    debug!(
        "HwsMatcher: Connected {} at position {} of {} (priority {})",
        id, pos, tbl_id, priority
    );
    Ok(())
}

fn write_insert_edges(
    env: &Env,
    reg: &Registry,
    tbl_id: TableId,
    id: MatcherId,
    prev: Option<MatcherId>,
    next: Option<MatcherId>,
) -> HwsResult<()> {
    let tbl = reg.table(tbl_id)?;
    let fw_ft_type = tbl.fw_ft_type();
    let ft = env.ft();
    let m = reg.matcher(id)?;
    let anchor = end_ft(reg, id)?;
    let (rtc_0, rtc_1) = m
        .lookup()
        .ok_or_else(|| HwsError::internal(format!("{} has no lookup", id)))?;

    match next {
        Some(next) => {
            let (next_0, next_1) = reg
                .matcher(next)?
                .lookup()
                .ok_or_else(|| HwsError::internal(format!("{} has no lookup", next)))?;
            ft.ft_set_next_rtc(anchor, fw_ft_type, Some(next_0), next_1)
                .map_err(|e| splice_err(id, "connect new matcher to next RTC", e))?;
        }
        None => {
            table::connect_to_miss_table(env, reg, tbl_id, tbl.miss_tbl, true)
                .map_err(|e| splice_err(id, "connect new matcher to miss table", e))?;
        }
    }

    let prev_ft = match prev {
        Some(prev) => end_ft(reg, prev)?,
        None => tbl.objs.ft,
    };
    ft.ft_set_next_rtc(prev_ft, fw_ft_type, Some(rtc_0), rtc_1)
        .map_err(|e| splice_err(id, "connect previous anchor to new matcher", e))?;

    shared::update_local_ft(env, reg, tbl_id)
        .map_err(|e| splice_err(id, "update local anchor", e))?;

    ft.ft_set_default_next_ft(tbl.table_type, prev_ft)
        .map_err(|e| splice_err(id, "reset previous anchor default miss", e))?;

    if prev.is_none() {
        table::update_connected_miss_tables(env, reg, tbl_id)
            .map_err(|e| splice_err(id, "update tables missing into this table", e))?;
    }

    Ok(())
}

/// Removes a matcher from its table and restores the hardware references.
///
/// The matcher leaves the in-memory chain even when the first write fails;
/// any write failure is fatal and stops the remaining updates.
pub(crate) fn disconnect(env: &Env, reg: &mut Registry, id: MatcherId) -> HwsResult<()> {
    let m = reg.matcher(id)?;
    let tbl_id = m.table;

    if m.is_isolated() {
        reg.table_mut(tbl_id)?.isolated.retain(|m| *m != id);
        debug!("HwsMatcher: Disconnected isolated {} from {}", id, tbl_id);
        return Ok(());
    }

    let tbl = reg.table(tbl_id)?;
    let pos = tbl
        .chain
        .iter()
        .position(|m| *m == id)
        .ok_or_else(|| HwsError::internal(format!("{} is not chained in {}", id, tbl_id)))?;
    let prev_ft = match pos.checked_sub(1) {
        Some(idx) => end_ft(reg, tbl.chain[idx])?,
        None => tbl.objs.ft,
    };
    let next = tbl.chain.get(pos + 1).copied();
    let fw_ft_type = tbl.fw_ft_type();
    let table_type = tbl.table_type;
    let miss_tbl = tbl.miss_tbl;
    let ft = env.ft();

    let bridged = match next {
        Some(next) => {
            let (next_0, next_1) = reg
                .matcher(next)?
                .lookup()
                .ok_or_else(|| HwsError::internal(format!("{} has no lookup", next)))?;
            ft.ft_set_next_rtc(prev_ft, fw_ft_type, Some(next_0), next_1)
                .map_err(|e| fatal_err(id, "connect previous anchor to next RTC", e))
        }
        None => table::connect_src_ft_to_miss_table(env, reg, tbl_id, prev_ft, miss_tbl)
            .map_err(|e| fatal_err(id, "connect previous anchor to miss table", e)),
    };

    reg.table_mut(tbl_id)?.chain.remove(pos);
    bridged?;

    shared::update_local_ft(env, reg, tbl_id)
        .map_err(|e| fatal_err(id, "update local anchor", e))?;

    if pos == 0 {
        table::update_connected_miss_tables(env, reg, tbl_id)
            .map_err(|e| fatal_err(id, "update tables missing into this table", e))?;
    }

    ft.ft_set_default_next_ft(table_type, prev_ft)
        .map_err(|e| fatal_err(id, "reset previous anchor default miss", e))?;

    debug!("HwsMatcher: Disconnected {} from {}", id, tbl_id);
    Ok(())
}
