//! Test fixtures for templates and device capabilities
//!
//! Provides reusable template and capability sets for steering tests

use hws_devx::{ActionTemplate, ActionType, DefinerField, DeviceCaps, MatchTemplate};

/// Full-mask field selector
pub fn field(selector: u32) -> DefinerField {
    DefinerField {
        selector,
        mask: 0xffff_ffff,
    }
}

/// Common match template fixtures
pub mod match_fixtures {
    use super::*;

    /// Exact match on a 5-tuple like field set
    pub fn five_tuple(id: u32) -> MatchTemplate {
        MatchTemplate::new(id, (1..=5).map(field).collect())
    }

    /// Match on destination fields only
    pub fn dst_only(id: u32) -> MatchTemplate {
        MatchTemplate::new(id, vec![field(2), field(4)])
    }

    /// Template needing an extended key
    pub fn jumbo(id: u32) -> MatchTemplate {
        let mut mt = five_tuple(id);
        mt.jumbo = true;
        mt
    }

    /// Template with a range match
    pub fn range(id: u32) -> MatchTemplate {
        let mut mt = five_tuple(id);
        mt.range = true;
        mt
    }

    /// Field-to-field compare template
    pub fn compare(id: u32) -> MatchTemplate {
        let mut mt = MatchTemplate::new(id, vec![field(7), field(8)]);
        mt.compare = true;
        mt
    }
}

/// Common action template fixtures
pub mod action_fixtures {
    use super::*;

    /// Counter then drop; fits in the match entry
    pub fn count_drop(id: u32) -> ActionTemplate {
        ActionTemplate::new(id, vec![ActionType::Count, ActionType::Drop], 1)
    }

    /// Header rewrite chain needing `stes` entries in total
    pub fn rewrite(id: u32, stes: u32) -> ActionTemplate {
        ActionTemplate::new(
            id,
            vec![
                ActionType::Count,
                ActionType::ModifyHeader,
                ActionType::Reformat,
                ActionType::Jump,
            ],
            stes,
        )
    }

    /// Terminal-only template
    pub fn drop_only(id: u32) -> ActionTemplate {
        ActionTemplate::new(id, vec![ActionType::Drop], 1)
    }

    /// Template the device rejects unless relaxed
    pub fn misordered(id: u32) -> ActionTemplate {
        ActionTemplate::new(id, vec![ActionType::Drop, ActionType::Count], 1)
    }
}

/// Common device capability fixtures
pub mod caps_fixtures {
    use super::*;

    /// Fully capable device
    pub fn full() -> DeviceCaps {
        DeviceCaps::default()
    }

    /// Device with a shallow lookup depth limit
    pub fn shallow(rtc_log_depth_max: u8) -> DeviceCaps {
        DeviceCaps {
            rtc_log_depth_max,
            ..DeviceCaps::default()
        }
    }

    /// Device without firmware-generated work requests
    pub fn no_gen_wqe() -> DeviceCaps {
        let mut caps = DeviceCaps::default();
        caps.supp_type_gen_wqe_flow_update = false;
        caps.rtc_max_hash_def_gen_wqe = 0;
        caps
    }

    /// Device without linear lookup tables
    pub fn no_linear() -> DeviceCaps {
        DeviceCaps {
            rtc_linear_lookup_table: false,
            access_index_linear: false,
            ..DeviceCaps::default()
        }
    }

    /// Device that shares its objects with a second instance
    pub fn shared(vhca_id: u16) -> DeviceCaps {
        DeviceCaps {
            shared_vhca_id: vhca_id,
            ..DeviceCaps::default()
        }
    }
}
