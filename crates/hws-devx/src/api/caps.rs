//! Device capability snapshot.

use serde::{Deserialize, Serialize};

/// Entry formats supported for firmware-generated work requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenWqeFormats {
    /// 8DW match entry format.
    pub format_8dw: bool,
    /// Range entry format.
    pub format_range: bool,
    /// 4DW range format used by compare matchers.
    pub format_4dw_range: bool,
}

/// Read-only hardware limits and feature bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceCaps {
    /// Largest lookup resource depth (log2).
    pub rtc_log_depth_max: u8,
    /// Largest entry allocation (log2).
    pub ste_alloc_log_max: u8,
    /// Allocation granularity (log2).
    pub ste_alloc_log_gran: u8,
    /// Insert-by-index with hash distribution supported.
    pub rtc_hash_split_table: bool,
    /// Insert-by-index with linear distribution supported.
    pub rtc_linear_lookup_table: bool,
    /// Linear access index mode supported.
    pub access_index_linear: bool,
    /// Gen-WQE formats.
    pub supp_ste_format_gen_wqe: GenWqeFormats,
    /// Gen-WQE flow update (GTA) supported.
    pub supp_type_gen_wqe_flow_update: bool,
    /// Number of hash definers usable with gen-WQE.
    pub rtc_max_hash_def_gen_wqe: u8,
    /// Always-hit definer object number.
    pub trivial_match_definer: u32,
    /// Definer object number used by linear lookup tables.
    pub linear_match_definer: u32,
    /// Instance id the local instance uses to reach shared objects.
    pub shared_vhca_id: u16,
}

impl Default for DeviceCaps {
    fn default() -> Self {
        Self {
            rtc_log_depth_max: 7,
            ste_alloc_log_max: 32,
            ste_alloc_log_gran: 0,
            rtc_hash_split_table: true,
            rtc_linear_lookup_table: true,
            access_index_linear: true,
            supp_ste_format_gen_wqe: GenWqeFormats {
                format_8dw: true,
                format_range: true,
                format_4dw_range: true,
            },
            supp_type_gen_wqe_flow_update: true,
            rtc_max_hash_def_gen_wqe: 1,
            trivial_match_definer: 0xff,
            linear_match_definer: 0xfe,
            shared_vhca_id: 0,
        }
    }
}
