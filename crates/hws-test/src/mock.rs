//! Mock hardware device.
//!
//! `MockDevice` implements every collaborator trait of the steering core
//! without hardware. It keeps the set of live objects, records every flow
//! table reference written, and can be told to fail the n-th call of any
//! command.

use std::collections::HashMap;
use std::sync::Mutex;

use log::debug;

use hws_devx::{
    ActionTemplate, AllowAccessAttr, Definer, DefinerKind, DevxCmd, DevxError, DevxObjType,
    DevxResult, FlowTableOid, FlowTableOps, FwFtType, LookupRef, MatchTemplate, MatcherDefiners,
    MatcherId, ObjCreateAttr, RawObjectId, RtcCreateAttr, RtcOid, RuleAttr, RuleHandle,
    RuleMover, TableObjects, TableType, TemplateCompiler,
};

/// Object classes tracked by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockObjKind {
    FlowTable,
    Rtc,
    SteRange,
    Stc,
    Alias,
}

impl From<DevxObjType> for MockObjKind {
    fn from(obj_type: DevxObjType) -> Self {
        match obj_type {
            DevxObjType::Rtc => MockObjKind::Rtc,
            DevxObjType::SteRange => MockObjKind::SteRange,
            DevxObjType::Stc => MockObjKind::Stc,
            DevxObjType::Alias => MockObjKind::Alias,
        }
    }
}

/// Commands that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    CreateRtc,
    CreateSteRange,
    CreateStc,
    CreateAlias,
    AllowAccess,
    CreateTable,
    CreateDefaultFt,
    SetNextRtc,
    SetNextFt,
    SetDefaultNextFt,
    ConnectDefaultMiss,
    MatcherInit,
    ProcessActionTemplate,
    MoveRule,
}

impl FailPoint {
    /// Fail points hit while allocating objects.
    pub const ALLOCATIONS: [FailPoint; 8] = [
        FailPoint::CreateRtc,
        FailPoint::CreateSteRange,
        FailPoint::CreateStc,
        FailPoint::CreateAlias,
        FailPoint::AllowAccess,
        FailPoint::CreateDefaultFt,
        FailPoint::MatcherInit,
        FailPoint::ProcessActionTemplate,
    ];

    /// Fail points hit while writing flow table references.
    pub const EDGES: [FailPoint; 4] = [
        FailPoint::SetNextRtc,
        FailPoint::SetNextFt,
        FailPoint::SetDefaultNextFt,
        FailPoint::ConnectDefaultMiss,
    ];
}

/// References currently written into a flow table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FtEdges {
    /// Primary lookup resource (RTC or alias).
    pub rtc_0: Option<RawObjectId>,
    /// Mirror lookup resource.
    pub rtc_1: Option<RawObjectId>,
    /// Miss path to another flow table.
    pub next_ft: Option<RawObjectId>,
    /// Miss path goes to the domain default.
    pub default_miss: bool,
}

/// A live mock object.
#[derive(Debug, Clone)]
pub struct MockObject {
    pub id: RawObjectId,
    pub kind: MockObjKind,
    /// Creation attributes, absent for flow tables.
    pub attr: Option<ObjCreateAttr>,
}

/// Live object counts at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiveSnapshot {
    pub flow_tables: usize,
    pub rtcs: usize,
    pub ste_ranges: usize,
    pub stcs: usize,
    pub aliases: usize,
    pub definers: usize,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: RawObjectId,
    next_definer: u32,
    objects: HashMap<RawObjectId, MockObject>,
    edges: HashMap<RawObjectId, FtEdges>,
    grants: HashMap<RawObjectId, Vec<u8>>,
    failures: HashMap<FailPoint, usize>,
    calls: HashMap<FailPoint, usize>,
    live_definers: usize,
    invalid_destroys: usize,
    rtc_history: Vec<RtcCreateAttr>,
    moved_rules: Vec<(RuleHandle, MatcherId)>,
}

impl MockState {
    fn trip(&mut self, point: FailPoint) -> DevxResult<()> {
        *self.calls.entry(point).or_insert(0) += 1;
        match self.failures.get(&point).copied() {
            Some(1) => {
                self.failures.remove(&point);
                debug!("mock device: injecting {:?} failure", point);
                Err(DevxError::no_resources(format!("injected {:?} failure", point)))
            }
            Some(n) => {
                self.failures.insert(point, n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn alloc(&mut self, kind: MockObjKind, attr: Option<ObjCreateAttr>) -> RawObjectId {
        self.next_id += 1;
        let id = self.next_id;
        self.objects.insert(id, MockObject { id, kind, attr });
        if kind == MockObjKind::FlowTable {
            self.edges.insert(id, FtEdges::default());
        }
        id
    }

    fn is_live(&self, id: RawObjectId, kind: MockObjKind) -> bool {
        self.objects.get(&id).is_some_and(|obj| obj.kind == kind)
    }

    fn count(&self, kind: MockObjKind) -> usize {
        self.objects.values().filter(|obj| obj.kind == kind).count()
    }

    /// Returns true when a live object still references `id`.
    fn is_referenced(&self, id: RawObjectId) -> bool {
        self.objects.values().any(|obj| match &obj.attr {
            Some(ObjCreateAttr::Rtc(rtc)) => {
                rtc.ste_base == id || rtc.miss_ft_id.is_some_and(|ft| ft.as_raw() == id)
            }
            Some(ObjCreateAttr::Stc(stc)) => stc.ste_base == id,
            Some(ObjCreateAttr::Alias(alias)) => alias.obj_id == id,
            _ => false,
        })
    }

    fn edges_mut(&mut self, ft: FlowTableOid) -> DevxResult<&mut FtEdges> {
        self.edges
            .get_mut(&ft.as_raw())
            .ok_or_else(|| DevxError::not_found(format!("flow table {}", ft)))
    }

    fn destroy(&mut self, kind: MockObjKind, id: RawObjectId) -> DevxResult<()> {
        if !self.is_live(id, kind) {
            self.invalid_destroys += 1;
            return Err(DevxError::not_found(format!("{:?} 0x{:x}", kind, id)));
        }
        if self.is_referenced(id) {
            self.invalid_destroys += 1;
            return Err(DevxError::Busy {
                object: format!("{:?} 0x{:x}", kind, id),
            });
        }
        self.objects.remove(&id);
        self.edges.remove(&id);
        self.grants.remove(&id);
        Ok(())
    }
}

/// Mock device implementing all steering collaborators.
#[derive(Debug)]
pub struct MockDevice {
    state: Mutex<MockState>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_id: 0x1000,
                next_definer: 0x10,
                ..Default::default()
            }),
        }
    }

    /// Makes the `nth` next call (1-based) of `point` fail.
    pub fn fail_nth(&self, point: FailPoint, nth: usize) {
        let mut state = self.state.lock().unwrap();
        if nth == 0 {
            state.failures.remove(&point);
        } else {
            state.failures.insert(point, nth);
        }
    }

    /// Removes all pending failure injections.
    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    /// Returns true while an injected failure has not fired yet.
    pub fn has_pending_failure(&self) -> bool {
        !self.state.lock().unwrap().failures.is_empty()
    }

    /// Number of calls made to a command.
    pub fn call_count(&self, point: FailPoint) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(&point)
            .copied()
            .unwrap_or(0)
    }

    /// Number of live objects of one kind.
    pub fn live_count(&self, kind: MockObjKind) -> usize {
        self.state.lock().unwrap().count(kind)
    }

    /// Number of live definers handed out by the template compiler.
    pub fn live_definers(&self) -> usize {
        self.state.lock().unwrap().live_definers
    }

    /// Snapshot of all live counts.
    pub fn snapshot(&self) -> LiveSnapshot {
        let state = self.state.lock().unwrap();
        LiveSnapshot {
            flow_tables: state.count(MockObjKind::FlowTable),
            rtcs: state.count(MockObjKind::Rtc),
            ste_ranges: state.count(MockObjKind::SteRange),
            stcs: state.count(MockObjKind::Stc),
            aliases: state.count(MockObjKind::Alias),
            definers: state.live_definers,
        }
    }

    /// Destroys of unknown, already destroyed or still referenced objects.
    pub fn invalid_destroys(&self) -> usize {
        self.state.lock().unwrap().invalid_destroys
    }

    /// Returns a live object.
    pub fn object(&self, id: RawObjectId) -> Option<MockObject> {
        self.state.lock().unwrap().objects.get(&id).cloned()
    }

    /// Creation attributes of a live lookup resource.
    pub fn rtc_attr(&self, rtc: RawObjectId) -> Option<RtcCreateAttr> {
        match self.object(rtc)?.attr? {
            ObjCreateAttr::Rtc(attr) => Some(attr),
            _ => None,
        }
    }

    /// Size of a live entry range.
    pub fn ste_log_size(&self, ste: RawObjectId) -> Option<u8> {
        match self.object(ste)?.attr? {
            ObjCreateAttr::SteRange(attr) => Some(attr.log_size),
            _ => None,
        }
    }

    /// Every lookup resource created so far, in creation order.
    pub fn rtc_history(&self) -> Vec<RtcCreateAttr> {
        self.state.lock().unwrap().rtc_history.clone()
    }

    /// References written into a flow table.
    pub fn edges(&self, ft: RawObjectId) -> Option<FtEdges> {
        self.state.lock().unwrap().edges.get(&ft).cloned()
    }

    /// Resolves an alias to the object it exposes.
    pub fn alias_origin(&self, alias: RawObjectId) -> Option<RawObjectId> {
        match self.object(alias)?.attr? {
            ObjCreateAttr::Alias(attr) => Some(attr.obj_id),
            _ => None,
        }
    }

    /// Follows lookup references from `ft` and returns the lookup resources
    /// a packet would visit, aliases resolved to their origin.
    pub fn walk_from(&self, ft: RawObjectId) -> Vec<RawObjectId> {
        let state = self.state.lock().unwrap();
        let mut visited = Vec::new();
        let mut cur = ft;

        while let Some(target) = state.edges.get(&cur).and_then(|e| e.rtc_0) {
            let rtc = match state.objects.get(&target).and_then(|o| o.attr.as_ref()) {
                Some(ObjCreateAttr::Alias(alias)) => alias.obj_id,
                _ => target,
            };
            if visited.contains(&rtc) {
                break;
            }
            visited.push(rtc);

            let miss_ft = match state.objects.get(&rtc).and_then(|o| o.attr.as_ref()) {
                Some(ObjCreateAttr::Rtc(attr)) => attr.miss_ft_id,
                _ => None,
            };
            match miss_ft {
                Some(next) => cur = next.as_raw(),
                None => break,
            }
        }

        visited
    }

    /// Rules handed to the rule engine for migration.
    pub fn moved_rules(&self) -> Vec<(RuleHandle, MatcherId)> {
        self.state.lock().unwrap().moved_rules.clone()
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DevxCmd for MockDevice {
    fn create_obj(&self, attr: &ObjCreateAttr) -> DevxResult<RawObjectId> {
        let mut state = self.state.lock().unwrap();

        match attr {
            ObjCreateAttr::Rtc(rtc) => {
                state.trip(FailPoint::CreateRtc)?;
                if !state.is_live(rtc.ste_base, MockObjKind::SteRange) {
                    return Err(DevxError::invalid_parameter("RTC over unknown STE range"));
                }
                if let Some(miss) = rtc.miss_ft_id {
                    if !state.is_live(miss.as_raw(), MockObjKind::FlowTable) {
                        return Err(DevxError::invalid_parameter("RTC misses to unknown FT"));
                    }
                }
                state.rtc_history.push(rtc.clone());
            }
            ObjCreateAttr::SteRange(_) => state.trip(FailPoint::CreateSteRange)?,
            ObjCreateAttr::Stc(stc) => {
                state.trip(FailPoint::CreateStc)?;
                if !state.is_live(stc.ste_base, MockObjKind::SteRange) {
                    return Err(DevxError::invalid_parameter("STC over unknown STE range"));
                }
            }
            ObjCreateAttr::Alias(alias) => {
                state.trip(FailPoint::CreateAlias)?;
                match state.grants.remove(&alias.obj_id) {
                    Some(key) if key == alias.access_key => {}
                    _ => return Err(DevxError::invalid_parameter("alias access key mismatch")),
                }
            }
        }

        let kind = MockObjKind::from(attr.obj_type());
        Ok(state.alloc(kind, Some(attr.clone())))
    }

    fn allow_other_vhca_access(&self, attr: &AllowAccessAttr) -> DevxResult<()> {
        let mut state = self.state.lock().unwrap();
        state.trip(FailPoint::AllowAccess)?;
        if !state.is_live(attr.obj_id, MockObjKind::from(attr.obj_type)) {
            return Err(DevxError::not_found(format!("object 0x{:x}", attr.obj_id)));
        }
        state.grants.insert(attr.obj_id, attr.access_key.clone());
        Ok(())
    }

    fn destroy_obj(&self, obj_type: DevxObjType, obj: RawObjectId) -> DevxResult<()> {
        self.state
            .lock()
            .unwrap()
            .destroy(MockObjKind::from(obj_type), obj)
    }
}

impl FlowTableOps for MockDevice {
    fn create_table(&self, _table_type: TableType, shared: bool) -> DevxResult<TableObjects> {
        let mut state = self.state.lock().unwrap();
        state.trip(FailPoint::CreateTable)?;
        let ft = state.alloc(MockObjKind::FlowTable, None);
        let local_ft = if shared {
            Some(state.alloc(MockObjKind::FlowTable, None))
        } else {
            None
        };
        Ok(TableObjects {
            ft: FlowTableOid::from_raw(ft).ok_or_else(|| DevxError::not_found("ft"))?,
            local_ft: local_ft.and_then(FlowTableOid::from_raw),
        })
    }

    fn destroy_table(&self, objs: &TableObjects) -> DevxResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(local_ft) = objs.local_ft {
            state.destroy(MockObjKind::FlowTable, local_ft.as_raw())?;
        }
        state.destroy(MockObjKind::FlowTable, objs.ft.as_raw())
    }

    fn create_default_ft(&self, _table_type: TableType) -> DevxResult<FlowTableOid> {
        let mut state = self.state.lock().unwrap();
        state.trip(FailPoint::CreateDefaultFt)?;
        let ft = state.alloc(MockObjKind::FlowTable, None);
        state.edges.insert(
            ft,
            FtEdges {
                default_miss: true,
                ..Default::default()
            },
        );
        FlowTableOid::from_raw(ft).ok_or_else(|| DevxError::not_found("ft"))
    }

    fn destroy_default_ft(&self, ft: FlowTableOid) -> DevxResult<()> {
        self.state
            .lock()
            .unwrap()
            .destroy(MockObjKind::FlowTable, ft.as_raw())
    }

    fn ft_set_next_rtc(
        &self,
        ft: FlowTableOid,
        _fw_ft_type: FwFtType,
        rtc_0: Option<LookupRef>,
        rtc_1: Option<RtcOid>,
    ) -> DevxResult<()> {
        let mut state = self.state.lock().unwrap();
        state.trip(FailPoint::SetNextRtc)?;
        let edges = state.edges_mut(ft)?;
        edges.rtc_0 = rtc_0.map(|r| r.as_raw());
        edges.rtc_1 = rtc_1.map(|r| r.as_raw());
        Ok(())
    }

    fn ft_set_next_ft(
        &self,
        ft: FlowTableOid,
        _fw_ft_type: FwFtType,
        next_ft: FlowTableOid,
    ) -> DevxResult<()> {
        let mut state = self.state.lock().unwrap();
        state.trip(FailPoint::SetNextFt)?;
        let edges = state.edges_mut(ft)?;
        edges.next_ft = Some(next_ft.as_raw());
        edges.default_miss = false;
        Ok(())
    }

    fn ft_set_default_next_ft(&self, _table_type: TableType, ft: FlowTableOid) -> DevxResult<()> {
        let mut state = self.state.lock().unwrap();
        state.trip(FailPoint::SetDefaultNextFt)?;
        let edges = state.edges_mut(ft)?;
        edges.next_ft = None;
        edges.default_miss = true;
        Ok(())
    }

    fn ft_connect_default_miss(&self, _table_type: TableType, ft: FlowTableOid) -> DevxResult<()> {
        let mut state = self.state.lock().unwrap();
        state.trip(FailPoint::ConnectDefaultMiss)?;
        let edges = state.edges_mut(ft)?;
        edges.next_ft = None;
        edges.default_miss = true;
        Ok(())
    }
}

impl TemplateCompiler for MockDevice {
    fn matcher_init(
        &self,
        _table_type: TableType,
        templates: &[MatchTemplate],
    ) -> DevxResult<MatcherDefiners> {
        let mut state = self.state.lock().unwrap();
        state.trip(FailPoint::MatcherInit)?;

        let mut definers = MatcherDefiners::default();
        for mt in templates {
            state.next_definer += 1;
            let kind = if mt.compare {
                DefinerKind::Compare
            } else if mt.jumbo {
                DefinerKind::Jumbo
            } else {
                DefinerKind::Match
            };
            definers
                .match_definers
                .push(Definer::new(state.next_definer, kind, mt.fields.clone()));

            let range = if mt.range {
                state.next_definer += 1;
                Some(Definer::new(
                    state.next_definer,
                    DefinerKind::Range,
                    mt.fields.clone(),
                ))
            } else {
                None
            };
            definers.range_definers.push(range);
        }

        // Templates over different fields hash on their common fields.
        if let Some(first) = templates.first() {
            if templates.iter().any(|mt| mt.fields != first.fields) {
                let common = first
                    .fields
                    .iter()
                    .filter(|f| templates.iter().all(|mt| mt.fields.contains(f)))
                    .copied()
                    .collect();
                state.next_definer += 1;
                definers.hash_definer =
                    Some(Definer::new(state.next_definer, DefinerKind::Match, common));
            }
        }
        definers.compare = templates.iter().any(|mt| mt.compare);

        state.live_definers += definer_count(&definers);
        Ok(definers)
    }

    fn matcher_uninit(&self, definers: &MatcherDefiners) {
        let mut state = self.state.lock().unwrap();
        state.live_definers = state.live_definers.saturating_sub(definer_count(definers));
    }

    fn check_action_combo(&self, template: &ActionTemplate, _table_type: TableType) -> bool {
        // Terminal actions may only close the list.
        match template.actions.iter().position(|a| a.is_terminal()) {
            Some(first_term) => template.actions[first_term..]
                .iter()
                .all(|a| a.is_terminal()),
            None => true,
        }
    }

    fn process_action_template(&self, _template: &ActionTemplate) -> DevxResult<()> {
        self.state
            .lock()
            .unwrap()
            .trip(FailPoint::ProcessActionTemplate)
    }
}

impl RuleMover for MockDevice {
    fn move_rule(
        &self,
        rule: &RuleHandle,
        destination: MatcherId,
        _attr: &RuleAttr,
    ) -> DevxResult<()> {
        let mut state = self.state.lock().unwrap();
        state.trip(FailPoint::MoveRule)?;
        state.moved_rules.push((*rule, destination));
        Ok(())
    }
}

fn definer_count(definers: &MatcherDefiners) -> usize {
    definers.match_definers.len()
        + definers.range_definers.iter().flatten().count()
        + usize::from(definers.hash_definer.is_some())
}
