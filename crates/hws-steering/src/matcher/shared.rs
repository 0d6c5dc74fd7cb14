//! Shared multi-instance domains.
//!
//! Lookup resources are created by the owning instance. The local instance
//! reaches them through alias objects, and each table keeps a local anchor
//! aimed at its first matcher's alias.

use log::{debug, error};
use rand::Rng;

use hws_devx::{
    AliasCreateAttr, AliasOid, AllowAccessAttr, DevxError, DevxObjType, DevxResult, FlowTableOid,
    MatcherId, RtcOid, TableId, TableType,
};

use crate::context::Env;
use crate::error::{HwsError, HwsResult};
use crate::registry::Registry;

/// Drops the lookup reference held by an anchor.
///
/// Only switch domains and shared contexts keep such references.
pub(crate) fn free_rtc_pointing(env: &Env, table_type: TableType, ft: FlowTableOid) -> DevxResult<()> {
    if !table_type.is_fdb_any() && !env.config.shared {
        return Ok(());
    }
    env.ft()
        .ft_set_next_rtc(ft, table_type.fw_ft_type(false), None, None)
        .map_err(|e| {
            error!("HwsShared: Failed to release RTC pointing of {}: {}", ft, e);
            e
        })
}

/// Aims the table's local anchor at its current head.
pub(crate) fn update_local_ft(env: &Env, reg: &Registry, tbl_id: TableId) -> DevxResult<()> {
    if !env.config.shared {
        return Ok(());
    }
    let Some(tbl) = reg.get_table(tbl_id) else {
        return Err(DevxError::not_found(tbl_id.to_string()));
    };
    let Some(local_ft) = tbl.objs.local_ft else {
        return Ok(());
    };

    let Some(head) = tbl.chain.first() else {
        return free_rtc_pointing(env, tbl.table_type, local_ft);
    };
    let target = reg
        .get_matcher(*head)
        .and_then(|m| m.local_lookup())
        .ok_or_else(|| DevxError::not_found(head.to_string()))?;

    env.ft()
        .ft_set_next_rtc(local_ft, tbl.fw_ft_type(), Some(target), None)
        .map_err(|e| {
            error!("HwsShared: Failed to point local anchor of {} at {}: {}", tbl_id, head, e);
            e
        })
}

fn create_alias(env: &Env, rtc: RtcOid) -> DevxResult<AliasOid> {
    let mut access_key = vec![0u8; env.config.access_key_len];
    rand::thread_rng().fill(&mut access_key[..]);

    let cmd = env.cmd();
    cmd.allow_other_vhca_access(&AllowAccessAttr {
        obj_type: DevxObjType::Rtc,
        obj_id: rtc.as_raw(),
        access_key: access_key.clone(),
    })?;
    cmd.create_alias(AliasCreateAttr {
        obj_type: DevxObjType::Rtc,
        obj_id: rtc.as_raw(),
        vhca_id: env.caps.shared_vhca_id,
        access_key,
    })
}

/// Prepares a matcher for a shared domain.
///
/// The end anchor goes to the default miss with no lookup reference, then
/// the primary lookup is aliased for the local instance.
pub(crate) fn init_shared(env: &Env, reg: &mut Registry, id: MatcherId) -> HwsResult<()> {
    if !env.config.shared {
        return Ok(());
    }

    let m = reg.matcher(id)?;
    let table_type = reg.table(m.table)?.table_type;
    let end_ft = m
        .end_ft
        .ok_or_else(|| HwsError::internal(format!("{} has no end anchor", id)))?;
    let rtc_0 = m
        .match_rtc
        .map(|rtc| rtc.rtc_0)
        .ok_or_else(|| HwsError::internal(format!("{} has no lookup", id)))?;

    env.ft()
        .ft_connect_default_miss(table_type, end_ft)
        .map_err(|e| {
            error!("HwsShared: Failed to connect {} end anchor to default miss: {}", id, e);
            HwsError::Device {
                operation: format!("shared init of {}", id),
                source: e,
            }
        })?;

    free_rtc_pointing(env, table_type, end_ft).map_err(|e| HwsError::Device {
        operation: format!("shared init of {}", id),
        source: e,
    })?;

    let alias = create_alias(env, rtc_0).map_err(|e| {
        error!("HwsShared: Failed to create alias of {} for {}: {}", rtc_0, id, e);
        HwsError::allocation("RTC alias", e)
    })?;

    debug!("HwsShared: {} aliased {} as {}", id, rtc_0, alias);
    reg.matcher_mut(id)?.alias = Some(alias);
    Ok(())
}

pub(crate) fn uninit_shared(env: &Env, reg: &mut Registry, id: MatcherId) -> HwsResult<()> {
    let m = reg.matcher_mut(id)?;
    if let Some(alias) = m.alias.take() {
        if let Err(e) = env.cmd().destroy_alias(alias) {
            error!("HwsShared: Failed to destroy {} of {}: {}", alias, id, e);
        }
    }
    Ok(())
}
