//! Matcher attribute validation and sizing.

use log::error;

use hws_devx::{DefinerKind, DeviceCaps, MatcherDefiners, TableType};

use super::types::{
    DistributeMode, FlowSource, InsertMode, MatchMode, MatcherAttr, MatcherFlags, MatcherSize,
    ResourceMode,
};
use crate::config::SteeringConfig;
use crate::error::{HwsError, HwsResult};

/// Depth (log2) for a rule-sized by-hash matcher.
pub(crate) fn rules_to_depth(cfg: &SteeringConfig, num_log: u8) -> u8 {
    if num_log > cfg.assured_rules_threshold {
        cfg.assured_main_tbl_depth
    } else {
        num_log.min(cfg.assured_col_tbl_depth)
    }
}

/// Returns true when a rule-sized matcher gets a collision matcher.
pub(crate) fn requires_col_tbl(cfg: &SteeringConfig, num_log: u8) -> bool {
    num_log > cfg.assured_rules_threshold
}

fn unsupported(reason: impl Into<String>) -> HwsError {
    let reason = reason.into();
    error!("HwsMatcher: {}", reason);
    HwsError::not_supported(reason)
}

fn presize(attr: &MatcherAttr) -> MatcherSize {
    match attr.mode {
        ResourceMode::Htable { row_log, col_log } => MatcherSize { row_log, col_log },
        ResourceMode::Rule { num_log } => MatcherSize {
            row_log: num_log,
            col_log: 0,
        },
    }
}

fn validate_insert_mode(
    caps: &DeviceCaps,
    cfg: &SteeringConfig,
    attr: &MatcherAttr,
    size: &MatcherSize,
    is_root: bool,
) -> HwsResult<()> {
    if is_root {
        if !matches!(attr.mode, ResourceMode::Rule { .. }) {
            return Err(unsupported("root matcher supports only rule resource mode"));
        }
        if attr.insert_mode != InsertMode::ByHash {
            return Err(unsupported("root matcher supports only insert by hash mode"));
        }
        if attr.distribute_mode != DistributeMode::ByHash {
            return Err(unsupported(
                "root matcher supports only distribute by hash mode",
            ));
        }
        if attr.flow_src != FlowSource::Any {
            return Err(unsupported(
                "root matcher can't specify FDB direction",
            ));
        }
        if attr.max_num_of_at_attach > 0 {
            return Err(unsupported(
                "root matcher does not support at attaching",
            ));
        }
        if attr.resizable {
            return Err(unsupported("root matcher does not support resizing"));
        }
        if attr.isolated {
            return Err(unsupported("root matcher can not be isolated"));
        }
        return Ok(());
    }

    match attr.insert_mode {
        InsertMode::ByHash => {
            if attr.distribute_mode != DistributeMode::ByHash {
                return Err(unsupported(
                    "invalid matcher distribute mode for insert by hash",
                ));
            }
        }
        InsertMode::ByIndex => {
            if size.col_log != 0 {
                return Err(unsupported(
                    "matcher with insert by index supports only Nx1 table size",
                ));
            }
            match attr.distribute_mode {
                DistributeMode::ByHash => {
                    if attr.match_mode == MatchMode::AlwaysHit && !caps.rtc_hash_split_table {
                        return Err(unsupported(
                            "FW doesn't support insert by index and hash distribute",
                        ));
                    }
                    if attr.match_mode == MatchMode::Default && !attr.isolated {
                        return Err(unsupported(
                            "STE array matcher supported only as an isolated matcher",
                        ));
                    }
                }
                DistributeMode::ByLinear => {
                    if !caps.rtc_linear_lookup_table || !caps.access_index_linear {
                        return Err(unsupported(
                            "FW doesn't support insert by index and linear distribute",
                        ));
                    }
                    if size.row_log > cfg.linear_lookup_tbl_log_max {
                        return Err(unsupported(format!(
                            "matcher with linear distribute: rows exceed limit {}",
                            cfg.linear_lookup_tbl_log_max
                        )));
                    }
                    if attr.match_mode != MatchMode::AlwaysHit {
                        return Err(unsupported(
                            "linear distribute matcher supports only always-hit match mode",
                        ));
                    }
                }
            }
        }
    }

    Ok(())
}

fn check_attr_sz(caps: &DeviceCaps, size: &MatcherSize) -> HwsResult<()> {
    if size.col_log > caps.rtc_log_depth_max {
        return Err(unsupported(format!(
            "matcher depth exceeds limit {}",
            caps.rtc_log_depth_max
        )));
    }
    if size.total_log() > caps.ste_alloc_log_max {
        return Err(unsupported(format!(
            "total matcher size exceeds limit {}",
            caps.ste_alloc_log_max
        )));
    }
    if size.total_log() < caps.ste_alloc_log_gran {
        return Err(unsupported(format!(
            "total matcher size below limit {}",
            caps.ste_alloc_log_gran
        )));
    }
    Ok(())
}

/// Validates matcher attributes and resolves the matcher geometry.
///
/// Sets the STE-array and resizable flags. Nothing else is touched on
/// failure.
pub(crate) fn process_attr(
    caps: &DeviceCaps,
    cfg: &SteeringConfig,
    table_type: TableType,
    is_root: bool,
    attr: &MatcherAttr,
    flags: &mut MatcherFlags,
) -> HwsResult<MatcherSize> {
    let mut size = presize(attr);

    validate_insert_mode(caps, cfg, attr, &size, is_root)?;
    if is_root {
        return Ok(size);
    }

    if !table_type.is_fdb_any() && attr.flow_src != FlowSource::Any {
        return Err(unsupported("NIC domain doesn't support flow_src"));
    }

    if let ResourceMode::Rule { num_log } = attr.mode {
        if attr.insert_mode == InsertMode::ByHash {
            size.col_log = rules_to_depth(cfg, num_log);
        }
    }

    if attr.isolated {
        let ste_array = attr.insert_mode == InsertMode::ByIndex
            && attr.distribute_mode == DistributeMode::ByHash
            && attr.match_mode == MatchMode::Default;
        if !ste_array {
            return Err(unsupported("isolated matchers are supported only for STE array matchers"));
        }
        flags.ste_array = true;
    }

    flags.resizable |= attr.resizable;

    check_attr_sz(caps, &size)?;
    Ok(size)
}

/// Checks template counts for a new matcher.
pub(crate) fn validate_templates(
    cfg: &SteeringConfig,
    is_root: bool,
    num_of_mt: usize,
    num_of_at: usize,
) -> HwsResult<()> {
    if num_of_mt == 0 || num_of_at == 0 {
        return Err(unsupported("number of match/action templates cannot be zero"));
    }
    if is_root && num_of_mt > cfg.max_mt_root {
        return Err(unsupported(format!(
            "number of match templates exceeds limit {} for root table",
            cfg.max_mt_root
        )));
    }
    Ok(())
}

/// Validates a compare matcher.
pub(crate) fn validate_compare_attr(
    caps: &DeviceCaps,
    is_root: bool,
    attr: &MatcherAttr,
    size: &MatcherSize,
    num_of_mt: usize,
    num_of_at: usize,
) -> HwsResult<()> {
    if is_root {
        return Err(unsupported("compare matcher is not supported for root tables"));
    }
    if !matches!(attr.mode, ResourceMode::Htable { .. }) {
        return Err(unsupported("compare matcher supports only htable resource mode"));
    }
    if attr.insert_mode != InsertMode::ByHash || attr.distribute_mode != DistributeMode::ByHash {
        return Err(unsupported(
            "compare matcher supports only insert and distribute by hash",
        ));
    }
    if num_of_mt != 1 || num_of_at != 1 {
        return Err(unsupported(
            "compare matcher supports only one match and one action template",
        ));
    }
    if size.row_log != 0 || size.col_log != 0 {
        return Err(unsupported("compare matcher supports only 1x1 table size"));
    }
    if attr.resizable {
        return Err(unsupported("compare matcher does not support resizing"));
    }
    if !caps.supp_ste_format_gen_wqe.format_4dw_range {
        return Err(unsupported("gen WQE for 4DW range format is not supported"));
    }
    Ok(())
}

/// Checks that the device can generate the work requests a matcher needs.
pub(crate) fn supp_fw_wqe(
    caps: &DeviceCaps,
    attr: &MatcherAttr,
    flags: &MatcherFlags,
    definers: &MatcherDefiners,
) -> HwsResult<()> {
    if let Some(hash) = &definers.hash_definer {
        match hash.kind {
            DefinerKind::Match if !caps.supp_ste_format_gen_wqe.format_8dw => {
                return Err(unsupported("gen WQE MATCH format not supported"));
            }
            DefinerKind::Jumbo => {
                return Err(unsupported("gen WQE JUMBO format not supported"));
            }
            _ => {}
        }
    }

    if attr.insert_mode != InsertMode::ByHash || attr.distribute_mode != DistributeMode::ByHash {
        return Err(unsupported(
            "gen WQE must be inserted and distributed by hash",
        ));
    }

    if flags.range_definer && !caps.supp_ste_format_gen_wqe.format_range {
        return Err(unsupported("gen WQE range format not supported"));
    }

    if !caps.supp_type_gen_wqe_flow_update {
        return Err(unsupported("gen WQE command not supporting GTA"));
    }

    if caps.rtc_max_hash_def_gen_wqe == 0 {
        return Err(unsupported("hash definer not supported"));
    }

    Ok(())
}
