//! Pairing matchers for resize and migrating their rules.

use log::{debug, error, info};

use hws_devx::{MatcherId, RuleHandle};

use super::{Matcher, ResizeRecord};
use crate::context::Env;
use crate::error::{HwsError, HwsResult};
use crate::registry::Registry;

fn precondition(reason: String) -> HwsError {
    error!("HwsResize: {}", reason);
    HwsError::resize_precondition(reason)
}

fn validate_pair(reg: &Registry, src_id: MatcherId, dst_id: MatcherId) -> HwsResult<()> {
    if src_id == dst_id {
        return Err(precondition(format!("{} cannot be resized into itself", src_id)));
    }

    let src = reg.matcher(src_id)?;
    let dst = reg.matcher(dst_id)?;
    let src_tbl = reg.table(src.table)?;
    let dst_tbl = reg.table(dst.table)?;

    if src.flags.collision || dst.flags.collision {
        return Err(precondition("collision matchers cannot be resized".to_string()));
    }
    if src_tbl.is_root() || dst_tbl.is_root() {
        return Err(precondition("src/dst matcher belongs to root table".to_string()));
    }
    if src_tbl.table_type != dst_tbl.table_type {
        return Err(precondition(format!(
            "table type mismatch for src/dst matchers ({} vs {})",
            src_tbl.table_type, dst_tbl.table_type
        )));
    }
    if src.flags.req_fw_wqe() || dst.flags.req_fw_wqe() {
        return Err(precondition(
            "matchers that require FW WQE are not supported".to_string(),
        ));
    }
    if !src.flags.resizable || !dst.flags.resizable {
        return Err(precondition("src/dst matcher is not resizable".to_string()));
    }
    if src.attr.insert_mode != dst.attr.insert_mode {
        return Err(precondition("src/dst matchers insert mode mismatch".to_string()));
    }
    if src.is_in_resize() || dst.is_in_resize() {
        return Err(precondition("src/dst matcher is already in resize".to_string()));
    }
    if src.mt.len() != dst.mt.len() {
        return Err(precondition(format!(
            "src/dst matcher match templates mismatch ({} vs {})",
            src.mt.len(),
            dst.mt.len()
        )));
    }
    if src.max_stes > dst.max_stes {
        return Err(precondition(format!(
            "src/dst matcher max STEs mismatch ({} vs {})",
            src.max_stes, dst.max_stes
        )));
    }

    let equivalent = match (&src.definers, &dst.definers) {
        (Some(src_defs), Some(dst_defs)) => {
            src_defs.match_definers.len() == dst_defs.match_definers.len()
                && src_defs
                    .match_definers
                    .iter()
                    .zip(&dst_defs.match_definers)
                    .all(|(a, b)| a.is_equivalent(b))
        }
        _ => false,
    };
    if !equivalent {
        return Err(precondition("src/dst matcher definers mismatch".to_string()));
    }

    Ok(())
}

/// Pairs `src` with `dst` and hands `src`'s action resources to `dst`.
pub(crate) fn pair_for_resize(
    reg: &mut Registry,
    src_id: MatcherId,
    dst_id: MatcherId,
) -> HwsResult<()> {
    validate_pair(reg, src_id, dst_id)?;

    let src = reg.matcher_mut(src_id)?;
    src.resize_dst = Some(dst_id);
    let record = ResizeRecord {
        source: src_id,
        max_stes: src.max_stes,
        action: src.action_ste.take(),
    };
    let inherited = std::mem::take(&mut src.resize_data);

    let dst = reg.matcher_mut(dst_id)?;
    dst.resize_data.push(record);
    dst.resize_data.extend(inherited);

    reg.stats.resize_pairings += 1;
    info!("HwsResize: Paired {} -> {}", src_id, dst_id);
    Ok(())
}

/// Releases the action resources held in a matcher's resize records.
pub(crate) fn resize_uninit(env: &Env, m: &mut Matcher) {
    if !m.flags.resizable {
        return;
    }
    for record in m.resize_data.drain(..) {
        if let Some(action) = record.action {
            debug!(
                "HwsResize: {} releases {} action STEs of {}",
                m.id, record.max_stes, record.source
            );
            action.release(env);
        }
    }
}

/// Resolves the resize destination a rule of `src` moves to.
pub(crate) fn rule_move_target(
    reg: &Registry,
    src_id: MatcherId,
    rule: &RuleHandle,
) -> HwsResult<MatcherId> {
    let src = reg
        .get_matcher(src_id)
        .ok_or_else(|| HwsError::invalid_argument(format!("{} does not exist", src_id)))?;
    let dst = src.resize_dst.ok_or_else(|| {
        HwsError::invalid_argument(format!("{} is not in resize", src_id))
    })?;
    if rule.matcher != src_id {
        return Err(HwsError::invalid_argument(format!(
            "rule {} belongs to {}, not {}",
            rule.id, rule.matcher, src_id
        )));
    }
    if !reg.contains_matcher(dst) {
        return Err(HwsError::invalid_argument(format!(
            "resize destination {} of {} no longer exists",
            dst, src_id
        )));
    }
    Ok(dst)
}
