//! Matcher attribute and view types.

use serde::{Deserialize, Serialize};

use hws_devx::{AliasOid, FlowTableOid, MatcherId, RtcOid, TableId};

/// How rules are placed into the lookup resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InsertMode {
    #[default]
    ByHash,
    /// Caller supplies the rule index.
    ByIndex,
}

/// How packets are distributed over the rows of the lookup resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DistributeMode {
    #[default]
    ByHash,
    ByLinear,
}

/// Whether a lookup has to match the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MatchMode {
    #[default]
    Default,
    /// Every lookup hits; used by index-addressed tables.
    AlwaysHit,
}

/// Sizing of the lookup resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceMode {
    /// Explicit rows and depth (both log2).
    Htable { row_log: u8, col_log: u8 },
    /// Expected number of rules (log2); depth is derived.
    Rule { num_log: u8 },
}

/// Traffic origin a switch-domain matcher is optimised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FlowSource {
    #[default]
    Any,
    /// Traffic from virtual ports only; the mirror side does the work.
    Vport,
    /// Traffic from the wire only; the primary side does the work.
    Wire,
}

/// Attributes of a matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherAttr {
    /// Lower values are looked up first.
    pub priority: u32,
    pub mode: ResourceMode,
    #[serde(default)]
    pub insert_mode: InsertMode,
    #[serde(default)]
    pub distribute_mode: DistributeMode,
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default)]
    pub flow_src: FlowSource,
    /// Table-wide fallback outside the priority chain.
    #[serde(default)]
    pub isolated: bool,
    /// Can take part in a resize as source or destination.
    #[serde(default)]
    pub resizable: bool,
    /// Action templates that may be attached after creation.
    #[serde(default)]
    pub max_num_of_at_attach: u32,
    /// Rules are updated through their index.
    #[serde(default)]
    pub optimize_using_rule_idx: bool,
}

impl Default for MatcherAttr {
    fn default() -> Self {
        Self {
            priority: 0,
            mode: ResourceMode::Rule { num_log: 0 },
            insert_mode: InsertMode::ByHash,
            distribute_mode: DistributeMode::ByHash,
            match_mode: MatchMode::Default,
            flow_src: FlowSource::Any,
            isolated: false,
            resizable: false,
            max_num_of_at_attach: 0,
            optimize_using_rule_idx: false,
        }
    }
}

impl MatcherAttr {
    /// Hash table matcher with explicit geometry.
    pub fn htable(priority: u32, row_log: u8, col_log: u8) -> Self {
        Self {
            priority,
            mode: ResourceMode::Htable { row_log, col_log },
            ..Self::default()
        }
    }

    /// Matcher sized by its expected rule count.
    pub fn rule(priority: u32, num_log: u8) -> Self {
        Self {
            priority,
            mode: ResourceMode::Rule { num_log },
            ..Self::default()
        }
    }

    pub fn with_insert_mode(mut self, insert_mode: InsertMode) -> Self {
        self.insert_mode = insert_mode;
        self
    }

    pub fn with_distribute_mode(mut self, distribute_mode: DistributeMode) -> Self {
        self.distribute_mode = distribute_mode;
        self
    }

    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    pub fn with_flow_src(mut self, flow_src: FlowSource) -> Self {
        self.flow_src = flow_src;
        self
    }

    pub fn with_isolated(mut self, isolated: bool) -> Self {
        self.isolated = isolated;
        self
    }

    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    pub fn with_at_attach(mut self, max_num_of_at_attach: u32) -> Self {
        self.max_num_of_at_attach = max_num_of_at_attach;
        self
    }

    pub fn with_rule_idx(mut self, optimize_using_rule_idx: bool) -> Self {
        self.optimize_using_rule_idx = optimize_using_rule_idx;
        self
    }
}

/// Resolved geometry of a matcher (both log2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MatcherSize {
    pub row_log: u8,
    pub col_log: u8,
}

impl MatcherSize {
    /// Total entries (log2).
    pub fn total_log(&self) -> u8 {
        self.row_log.saturating_add(self.col_log)
    }
}

/// Properties derived while building a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct MatcherFlags {
    /// Overflow matcher owned by another matcher.
    pub collision: bool,
    /// Index-addressed entry array.
    pub ste_array: bool,
    pub resizable: bool,
    /// Hashing uses a definer different from the match definer.
    pub hash_definer: bool,
    pub range_definer: bool,
    pub compare: bool,
}

impl MatcherFlags {
    /// Returns true when rules need firmware-generated work requests.
    pub fn req_fw_wqe(&self) -> bool {
        self.hash_definer || self.range_definer || self.compare
    }
}

/// Build progress of a matcher. Teardown runs the steps below the reached
/// state in reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum MatcherState {
    #[default]
    Uninitialized,
    /// Definers and match entry pool created.
    TemplatesBound,
    /// Action entry resources created.
    ResourcesBound,
    /// End anchor created.
    AnchorCreated,
    /// Match lookup resources created.
    LookupCreated,
    /// Shared-domain alias created.
    SharedInit,
    /// Spliced into the table.
    Connected,
}

/// Snapshot of a matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherInfo {
    pub id: MatcherId,
    pub table: TableId,
    pub priority: u32,
    pub isolated: bool,
    /// Overflow matcher created for this matcher.
    pub col_matcher: Option<MatcherId>,
    /// Set on an overflow matcher.
    pub parent: Option<MatcherId>,
    pub size: MatcherSize,
    pub state: MatcherState,
    /// Supplemental action entries per rule.
    pub max_stes: u32,
    pub num_of_mt: usize,
    pub num_of_at: usize,
    /// Remaining action template attach budget.
    pub at_attach_budget: u32,
    pub end_ft: Option<FlowTableOid>,
    pub rtc_0: Option<RtcOid>,
    pub rtc_1: Option<RtcOid>,
    /// Alias of `rtc_0` on the local instance.
    pub alias: Option<AliasOid>,
    pub action_rtc_0: Option<RtcOid>,
    pub action_rtc_1: Option<RtcOid>,
    pub resize_dst: Option<MatcherId>,
}

/// Action resources queued on a resize destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeRecordInfo {
    /// Matcher the resources came from.
    pub source: MatcherId,
    pub max_stes: u32,
    /// Record holds live action resources.
    pub has_resources: bool,
}

/// Counters of a steering context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SteeringStats {
    pub tables_created: u64,
    pub tables_destroyed: u64,
    pub matchers_created: u64,
    pub matchers_destroyed: u64,
    pub collision_matchers_created: u64,
    pub create_failures: u64,
    pub fatal_disconnects: u64,
    pub resize_pairings: u64,
}
