//! Matcher creation and destruction.
//!
//! Creation walks the [`MatcherState`] ladder one step at a time and records
//! each step on the matcher. On failure, or on destroy, [`unwind`] tears
//! down everything below the reached state in reverse order.

use log::{debug, error, info, warn};

use hws_devx::{ActionTemplate, MatchTemplate, MatcherId, TableId};

use super::binder::{self, RtcType};
use super::types::{InsertMode, MatcherAttr, MatcherFlags, MatcherState, ResourceMode};
use super::{chain, resize, shared, validate, Matcher};
use crate::context::Env;
use crate::error::{HwsError, HwsResult};
use crate::registry::Registry;

/// Validates, builds and connects a new matcher.
pub(crate) fn create_matcher(
    env: &Env,
    reg: &mut Registry,
    tbl_id: TableId,
    mt: &[MatchTemplate],
    at: &[ActionTemplate],
    attr: &MatcherAttr,
) -> HwsResult<MatcherId> {
    let tbl = reg.table(tbl_id)?;
    let table_type = tbl.table_type;
    let is_root = tbl.is_root();

    let mut flags = MatcherFlags::default();
    let size =
        validate::process_attr(&env.caps, &env.config, table_type, is_root, attr, &mut flags)?;
    validate::validate_templates(&env.config, is_root, mt.len(), at.len())?;

    if is_root {
        return Err(HwsError::not_supported(
            "root table matchers are not handled by hardware steering",
        ));
    }

    let id = reg.next_matcher_id();
    reg.insert_matcher(Matcher::new(
        id,
        tbl_id,
        attr.clone(),
        size,
        flags,
        mt.to_vec(),
        at.to_vec(),
    ));

    if let Err(e) = init(env, reg, id) {
        reg.remove_matcher(id);
        reg.stats.create_failures += 1;
        error!("HwsMatcher: Failed to create matcher in {}: {}", tbl_id, e);
        return Err(e);
    }

    reg.stats.matchers_created += 1;
    info!(
        "HwsMatcher: Created {} in {} priority {} size {}x{}",
        id, tbl_id, attr.priority, size.row_log, size.col_log
    );
    Ok(id)
}

fn init(env: &Env, reg: &mut Registry, id: MatcherId) -> HwsResult<()> {
    create_and_connect(env, reg, id)?;

    if let Err(e) = create_col_matcher(env, reg, id) {
        if let Err(undo) = destroy_and_disconnect(env, reg, id) {
            warn!("HwsMatcher: Failed to undo {} after collision failure: {}", id, undo);
        }
        return Err(e);
    }
    Ok(())
}

/// Builds every resource of a registered matcher and splices it in.
pub(crate) fn create_and_connect(env: &Env, reg: &mut Registry, id: MatcherId) -> HwsResult<()> {
    if let Err(e) = advance(env, reg, id) {
        let reached = reg.matcher(id)?.state;
        if let Err(undo) = unwind(env, reg, id, reached) {
            warn!("HwsMatcher: Failed to unwind {} from {:?}: {}", id, reached, undo);
        }
        return Err(e);
    }
    Ok(())
}

fn advance(env: &Env, reg: &mut Registry, id: MatcherId) -> HwsResult<()> {
    let table_type = reg.table(reg.matcher(id)?.table)?.table_type;

    {
        let m = reg.matcher_mut(id)?;

        binder::bind_mt(env, table_type, m)?;
        m.state = MatcherState::TemplatesBound;

        binder::bind_at(env, table_type, m)?;
        m.state = MatcherState::ResourcesBound;

        let end_ft = env.ft().create_default_ft(table_type).map_err(|e| {
            error!("HwsMatcher: Failed to create end anchor for {}: {}", id, e);
            HwsError::allocation("matcher end anchor", e)
        })?;
        m.end_ft = Some(end_ft);
        m.state = MatcherState::AnchorCreated;

        let pool = m
            .match_pool
            .as_ref()
            .ok_or_else(|| HwsError::internal(format!("{} has no match pool", id)))?;
        let rtc = binder::create_rtc(env, table_type, m, RtcType::Match, pool)?;
        m.match_rtc = Some(rtc);
        m.state = MatcherState::LookupCreated;
    }

    shared::init_shared(env, reg, id)?;
    reg.matcher_mut(id)?.state = MatcherState::SharedInit;

    chain::connect(env, reg, id)?;
    reg.matcher_mut(id)?.state = MatcherState::Connected;
    Ok(())
}

/// Tears a matcher down from `from` to [`MatcherState::Uninitialized`].
///
/// Every step runs even when an earlier one failed. The first error is
/// returned.
pub(crate) fn unwind(
    env: &Env,
    reg: &mut Registry,
    id: MatcherId,
    from: MatcherState,
) -> HwsResult<()> {
    let mut first_err = None;

    if from >= MatcherState::Connected {
        if let Err(e) = chain::disconnect(env, reg, id) {
            first_err = Some(e);
        }
    }

    if from >= MatcherState::SharedInit {
        if let Err(e) = shared::uninit_shared(env, reg, id) {
            first_err.get_or_insert(e);
        }
    }

    let m = reg.matcher_mut(id)?;

    if from >= MatcherState::LookupCreated {
        if let Some(rtc) = m.match_rtc.take() {
            rtc.destroy(env);
        }
    }

    if from >= MatcherState::AnchorCreated {
        if let Some(end_ft) = m.end_ft.take() {
            if let Err(e) = env.ft().destroy_default_ft(end_ft) {
                error!("HwsMatcher: Failed to destroy end anchor {} of {}: {}", end_ft, id, e);
            }
        }
    }

    if from >= MatcherState::ResourcesBound {
        binder::unbind_at(env, m);
    }

    if from >= MatcherState::TemplatesBound {
        binder::unbind_mt(env, m);
    }

    m.state = MatcherState::Uninitialized;
    debug!("HwsMatcher: Unwound {} from {:?}", id, from);

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Releases resize records and every resource of a matcher.
pub(crate) fn destroy_and_disconnect(env: &Env, reg: &mut Registry, id: MatcherId) -> HwsResult<()> {
    resize::resize_uninit(env, reg.matcher_mut(id)?);
    let state = reg.matcher(id)?.state;
    unwind(env, reg, id, state)
}

fn create_col_matcher(env: &Env, reg: &mut Registry, parent_id: MatcherId) -> HwsResult<()> {
    let parent = reg.matcher(parent_id)?;
    let num_log = match parent.attr.mode {
        ResourceMode::Rule { num_log }
            if parent.attr.insert_mode == InsertMode::ByHash
                && validate::requires_col_tbl(&env.config, num_log) =>
        {
            num_log
        }
        _ => return Ok(()),
    };

    let cfg = &env.config;
    let row_log = if num_log > cfg.assured_row_ratio {
        num_log - cfg.assured_row_ratio
    } else {
        num_log
    };
    let attr = MatcherAttr {
        priority: parent.attr.priority,
        mode: ResourceMode::Htable {
            row_log,
            col_log: cfg.assured_col_tbl_depth,
        },
        flow_src: parent.attr.flow_src,
        max_num_of_at_attach: parent.attr.max_num_of_at_attach,
        ..MatcherAttr::default()
    };
    let mut flags = parent.flags;
    flags.collision = true;

    let tbl_id = parent.table;
    let table_type = reg.table(tbl_id)?.table_type;
    let size = validate::process_attr(&env.caps, cfg, table_type, false, &attr, &mut flags)?;

    let mt = parent.mt.clone();
    let at = parent.at.clone();
    let definers = parent.definers.clone();

    let col_id = reg.next_matcher_id();
    let mut col = Matcher::new(col_id, tbl_id, attr, size, flags, mt, at);
    col.definers = definers;
    col.parent = Some(parent_id);
    reg.insert_matcher(col);

    if let Err(e) = create_and_connect(env, reg, col_id) {
        error!("HwsMatcher: Failed to create collision matcher for {}: {}", parent_id, e);
        reg.remove_matcher(col_id);
        return Err(e);
    }

    reg.matcher_mut(parent_id)?.col_matcher = Some(col_id);
    reg.stats.collision_matchers_created += 1;
    debug!(
        "HwsMatcher: Created collision {} for {} size {}x{}",
        col_id, parent_id, size.row_log, size.col_log
    );
    Ok(())
}

/// Destroys a caller-visible matcher and its collision matcher.
///
/// Teardown continues past a fatal disconnect; the first error is returned.
pub(crate) fn destroy_matcher(env: &Env, reg: &mut Registry, id: MatcherId) -> HwsResult<()> {
    let m = reg.matcher(id)?;
    if m.flags.collision {
        return Err(HwsError::invalid_argument(format!(
            "{} is a collision matcher owned by {}",
            id,
            m.parent.map_or_else(|| "?".to_string(), |p| p.to_string())
        )));
    }
    let col = m.col_matcher;

    let mut result = Ok(());
    if let Some(col) = col {
        result = destroy_and_disconnect(env, reg, col);
        reg.remove_matcher(col);
    }

    let own = destroy_and_disconnect(env, reg, id);
    if result.is_ok() {
        result = own;
    }
    reg.remove_matcher(id);
    reg.stats.matchers_destroyed += 1;

    match &result {
        Ok(()) => info!("HwsMatcher: Destroyed {}", id),
        Err(e) => {
            if e.is_fatal() {
                reg.stats.fatal_disconnects += 1;
            }
            error!("HwsMatcher: Destroyed {} with error: {}", id, e);
        }
    }
    result
}

/// Attaches another action template within the provisioned budget.
pub(crate) fn attach_action_template(
    env: &Env,
    reg: &mut Registry,
    id: MatcherId,
    at: &ActionTemplate,
) -> HwsResult<()> {
    let m = reg.matcher(id)?;
    let table_type = reg.table(m.table)?.table_type;

    if m.flags.collision {
        return Err(HwsError::invalid_argument(format!(
            "{} is a collision matcher",
            id
        )));
    }
    if m.is_in_resize() {
        return Err(HwsError::invalid_argument(format!(
            "{} is in resize",
            id
        )));
    }
    if m.attr.max_num_of_at_attach == 0 {
        error!("HwsMatcher: Max num of action templates to attach reached for {}", id);
        return Err(HwsError::not_supported(
            "action template attach budget exhausted",
        ));
    }

    binder::check_and_process_at(env, table_type, at)?;

    let required = at.required_stes(m.is_jumbo());
    if required > m.max_stes {
        error!(
            "HwsMatcher: Action template {} needs {} STEs, {} has {}",
            at.id, required, id, m.max_stes
        );
        return Err(HwsError::NoMemory {
            required,
            provisioned: m.max_stes,
        });
    }
    let col = m.col_matcher;

    let m = reg.matcher_mut(id)?;
    m.at.push(at.clone());
    m.attr.max_num_of_at_attach -= 1;
    let templates = m.at.clone();
    let budget = m.attr.max_num_of_at_attach;

    if let Some(col) = col {
        let col = reg.matcher_mut(col)?;
        col.at = templates;
        col.attr.max_num_of_at_attach = budget;
    }

    debug!("HwsMatcher: Attached action template {} to {}", at.id, id);
    Ok(())
}

/// Rules of the matcher can be updated in place.
pub(crate) fn is_updatable(reg: &Registry, id: MatcherId) -> HwsResult<bool> {
    let m = reg.matcher(id)?;
    let is_root = reg.table(m.table)?.is_root();

    if is_root || m.flags.req_fw_wqe() || m.flags.resizable {
        return Ok(false);
    }
    Ok(m.attr.optimize_using_rule_idx || m.attr.insert_mode == InsertMode::ByIndex)
}

/// Rule writes of the matcher depend on other entries.
pub(crate) fn is_dependent(reg: &Registry, id: MatcherId) -> HwsResult<bool> {
    let m = reg.matcher(id)?;
    Ok(m.max_stes > 0 || m.flags.req_fw_wqe() || m.at.iter().any(|at| at.need_dep_write))
}
