//! Matcher creation, sizing, teardown and failure unwinding.

mod common;

use common::{always_hit_attr, ste_array_attr, Harness};
use hws_devx::{
    FwFtType, MatchTemplate, MatcherId, RtcAccessIndexMode, TableId, TableType,
};
use hws_steering::{
    DistributeMode, ErrorKind, FlowSource, InsertMode, MatchMode, MatcherAttr, MatcherSize,
    MatcherState, SteeringConfig, TableAttr,
};
use hws_test::{
    action_fixtures, caps_fixtures, match_fixtures, ChainVerifier, FailPoint, MockObjKind,
};
use pretty_assertions::assert_eq;

fn size(row_log: u8, col_log: u8) -> MatcherSize {
    MatcherSize { row_log, col_log }
}

#[test]
fn test_large_rule_count_gets_collision_matcher() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);

    let m = h.matcher(tbl, &MatcherAttr::rule(0, 11)).unwrap();
    let info = h.ctx.matcher_info(m).unwrap();
    assert_eq!(info.size, size(11, 2));
    assert_eq!(info.state, MatcherState::Connected);

    let col = info.col_matcher.expect("collision matcher");
    let col_info = h.ctx.matcher_info(col).unwrap();
    assert_eq!(col_info.size, size(6, 4));
    assert_eq!(col_info.parent, Some(m));
    assert_eq!(col_info.priority, 0);

    assert_eq!(h.ctx.table_chain(tbl).unwrap(), vec![m, col]);
    ChainVerifier::new(&h.dev)
        .assert_chain(h.entry_ft(tbl), &h.rtcs(&[m, col]))
        .unwrap();

    let small = h.matcher(tbl, &MatcherAttr::rule(1, 10)).unwrap();
    let small_info = h.ctx.matcher_info(small).unwrap();
    assert_eq!(small_info.col_matcher, None);
    assert_eq!(small_info.size, size(10, 4));

    assert_eq!(h.ctx.num_matchers().unwrap(), 3);
    assert_eq!(h.ctx.stats().unwrap().collision_matchers_created, 1);
}

#[test]
fn test_destroy_releases_collision_matcher() {
    let h = Harness::new();
    let tbl = h.table(TableType::Fdb);
    let before = h.dev.snapshot();

    let m = h.matcher(tbl, &MatcherAttr::rule(0, 12)).unwrap();
    let col = h.ctx.matcher_info(m).unwrap().col_matcher.unwrap();

    let err = h.ctx.destroy_matcher(col).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(h.ctx.num_matchers().unwrap(), 2);

    h.ctx.destroy_matcher(m).unwrap();
    assert_eq!(h.ctx.num_matchers().unwrap(), 0);
    assert!(h.ctx.table_chain(tbl).unwrap().is_empty());
    ChainVerifier::new(&h.dev).assert_balanced(&before).unwrap();
    assert_eq!(h.dev.live_definers(), 0);
}

#[test]
fn test_rejected_geometry_allocates_nothing() {
    let h = Harness::with(caps_fixtures::shallow(4), SteeringConfig::default());
    let tbl = h.table(TableType::NicRx);
    let before = h.dev.snapshot();

    let err = h.matcher(tbl, &MatcherAttr::htable(0, 2, 5)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotSupported);
    assert_eq!(h.dev.snapshot(), before);
    assert_eq!(h.ctx.num_matchers().unwrap(), 0);
    assert_eq!(h.dev.call_count(FailPoint::MatcherInit), 0);

    h.matcher(tbl, &MatcherAttr::htable(0, 2, 4)).unwrap();
}

#[test]
fn test_template_count_and_unknown_table() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);
    let attr = MatcherAttr::htable(0, 4, 1);

    let err = h
        .matcher_with(tbl, &[], &[action_fixtures::count_drop(1)], &attr)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);

    let err = h
        .matcher_with(tbl, &[match_fixtures::five_tuple(1)], &[], &attr)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);

    let err = h.matcher(TableId(99), &attr).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(
        h.ctx.destroy_matcher(MatcherId(99)).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_root_table_matchers_not_supported() {
    let h = Harness::new();
    let root = h
        .ctx
        .create_table(&TableAttr::new(TableType::NicRx, 0))
        .unwrap();
    let before = h.dev.snapshot();

    let err = h.matcher(root, &MatcherAttr::rule(0, 4)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);

    // Hash tables are rejected by validation already.
    let err = h.matcher(root, &MatcherAttr::htable(0, 4, 1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);

    assert_eq!(h.dev.snapshot(), before);

    let other = h.table(TableType::NicRx);
    let err = h.ctx.set_table_miss(root, Some(other)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
    let err = h.ctx.set_table_miss(other, Some(root)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
}

#[test]
fn test_match_lookup_attributes() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);
    let m = h.small(tbl, 0);
    let info = h.ctx.matcher_info(m).unwrap();

    let attr = h.dev.rtc_attr(h.rtc0(m)).unwrap();
    assert_eq!(attr.log_size, 4);
    assert_eq!(attr.log_depth, 1);
    assert_eq!(attr.miss_ft_id, info.end_ft);
    assert_eq!(attr.table_type, Some(FwFtType::NicRx));
    assert!(!attr.fw_gen_wqe);
    assert_eq!(h.dev.ste_log_size(attr.ste_base), Some(5));

    assert_eq!(info.max_stes, 0);
    assert_eq!(info.action_rtc_0, None);
    assert_eq!(h.dev.live_count(MockObjKind::Stc), 0);
}

#[test]
fn test_action_entries_sized_by_templates() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);
    let before = h.dev.snapshot();

    let m = h
        .matcher_with(
            tbl,
            &[match_fixtures::five_tuple(1)],
            &[action_fixtures::count_drop(1), action_fixtures::rewrite(2, 3)],
            &MatcherAttr::htable(0, 4, 1),
        )
        .unwrap();
    let info = h.ctx.matcher_info(m).unwrap();
    assert_eq!(info.max_stes, 2);

    let action_rtc = info.action_rtc_0.unwrap().as_raw();
    let attr = h.dev.rtc_attr(action_rtc).unwrap();
    assert_eq!(attr.log_size, 5);
    assert_eq!(attr.log_depth, 0);
    assert_eq!(attr.miss_ft_id, None);
    assert_eq!(attr.match_definer_0, h.ctx.caps().trivial_match_definer);
    assert_eq!(h.dev.ste_log_size(attr.ste_base), Some(5));
    assert_eq!(h.dev.live_count(MockObjKind::Stc), 1);
    assert!(h.ctx.is_dependent(m).unwrap());

    h.ctx.destroy_matcher(m).unwrap();
    ChainVerifier::new(&h.dev).assert_balanced(&before).unwrap();
}

#[test]
fn test_attach_action_template_budget() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);
    let m = h
        .matcher_with(
            tbl,
            &[match_fixtures::five_tuple(1)],
            &[action_fixtures::rewrite(1, 3)],
            &MatcherAttr::htable(0, 4, 1).with_at_attach(2),
        )
        .unwrap();

    h.ctx
        .attach_action_template(m, &action_fixtures::rewrite(2, 2))
        .unwrap();
    let info = h.ctx.matcher_info(m).unwrap();
    assert_eq!(info.num_of_at, 2);
    assert_eq!(info.at_attach_budget, 1);

    let err = h
        .ctx
        .attach_action_template(m, &action_fixtures::rewrite(3, 5))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoMemory);
    assert_eq!(h.ctx.matcher_info(m).unwrap().at_attach_budget, 1);

    let err = h
        .ctx
        .attach_action_template(m, &action_fixtures::misordered(4))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    h.ctx
        .attach_action_template(m, &action_fixtures::drop_only(5))
        .unwrap();
    let err = h
        .ctx
        .attach_action_template(m, &action_fixtures::count_drop(6))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
    assert_eq!(h.ctx.matcher_info(m).unwrap().num_of_at, 3);
}

#[test]
fn test_attach_syncs_collision_matcher() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);
    let m = h
        .matcher(tbl, &MatcherAttr::rule(0, 11).with_at_attach(1))
        .unwrap();
    let col = h.ctx.matcher_info(m).unwrap().col_matcher.unwrap();

    let err = h
        .ctx
        .attach_action_template(col, &action_fixtures::drop_only(2))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    h.ctx
        .attach_action_template(m, &action_fixtures::drop_only(2))
        .unwrap();
    let col_info = h.ctx.matcher_info(col).unwrap();
    assert_eq!(col_info.num_of_at, 2);
    assert_eq!(col_info.at_attach_budget, 0);
}

#[test]
fn test_misordered_template_rejected_at_create() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);
    let before = h.dev.snapshot();

    let err = h
        .matcher_with(
            tbl,
            &[match_fixtures::five_tuple(1)],
            &[action_fixtures::misordered(1)],
            &MatcherAttr::htable(0, 4, 1),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    ChainVerifier::new(&h.dev).assert_balanced(&before).unwrap();
    assert_eq!(h.ctx.stats().unwrap().create_failures, 1);
}

#[test]
fn test_range_matcher_uses_fw_wqe() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);
    let before = h.dev.snapshot();
    let attr = MatcherAttr::htable(0, 4, 1);

    let m = h
        .matcher_with(
            tbl,
            &[match_fixtures::range(1)],
            &[action_fixtures::count_drop(1)],
            &attr,
        )
        .unwrap();
    let rtc = h.dev.rtc_attr(h.rtc0(m)).unwrap();
    assert!(rtc.is_scnd_range);
    assert!(rtc.fw_gen_wqe);
    assert_eq!(rtc.num_hash_definer, 1);
    assert_eq!(h.dev.ste_log_size(rtc.ste_base), Some(6));
    assert!(h.ctx.is_dependent(m).unwrap());
    assert!(!h.ctx.is_updatable(m).unwrap());
    h.ctx.destroy_matcher(m).unwrap();

    let err = h
        .matcher_with(
            tbl,
            &[match_fixtures::range(1)],
            &[action_fixtures::count_drop(1)],
            &attr.clone().with_at_attach(1),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);

    let err = h
        .matcher_with(
            tbl,
            &[match_fixtures::range(1)],
            &[action_fixtures::rewrite(1, 3)],
            &attr,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);

    ChainVerifier::new(&h.dev).assert_balanced(&before).unwrap();
}

#[test]
fn test_fw_wqe_needs_device_support() {
    let h = Harness::with(caps_fixtures::no_gen_wqe(), SteeringConfig::default());
    let tbl = h.table(TableType::NicRx);
    let before = h.dev.snapshot();

    let err = h
        .matcher_with(
            tbl,
            &[match_fixtures::range(1)],
            &[action_fixtures::count_drop(1)],
            &MatcherAttr::htable(0, 4, 1),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
    ChainVerifier::new(&h.dev).assert_balanced(&before).unwrap();

    h.small(tbl, 0);
}

#[test]
fn test_hash_definer_for_mixed_templates() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);
    let m = h
        .matcher_with(
            tbl,
            &[match_fixtures::five_tuple(1), match_fixtures::dst_only(2)],
            &[action_fixtures::count_drop(1)],
            &MatcherAttr::htable(0, 4, 1),
        )
        .unwrap();

    let rtc = h.dev.rtc_attr(h.rtc0(m)).unwrap();
    assert!(rtc.fw_gen_wqe);
    assert_eq!(rtc.num_hash_definer, 1);
    assert_eq!(h.ctx.matcher_info(m).unwrap().num_of_mt, 2);
    assert!(h.ctx.is_dependent(m).unwrap());
    assert_eq!(h.dev.live_definers(), 3);
}

#[test]
fn test_compare_matcher_size() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);
    let before = h.dev.snapshot();
    let mt = [match_fixtures::compare(1)];
    let at = [action_fixtures::count_drop(1)];

    let m = h
        .matcher_with(tbl, &mt, &at, &MatcherAttr::htable(0, 0, 0))
        .unwrap();
    let rtc = h.dev.rtc_attr(h.rtc0(m)).unwrap();
    assert!(rtc.is_compare);
    assert_eq!(rtc.match_definer_0, h.ctx.caps().trivial_match_definer);
    h.ctx.destroy_matcher(m).unwrap();

    let err = h
        .matcher_with(tbl, &mt, &at, &MatcherAttr::htable(0, 0, 1))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);

    let err = h
        .matcher_with(
            tbl,
            &mt,
            &[action_fixtures::count_drop(1), action_fixtures::drop_only(2)],
            &MatcherAttr::htable(0, 0, 0),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);

    ChainVerifier::new(&h.dev).assert_balanced(&before).unwrap();
}

#[test]
fn test_insert_by_index_modes() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);

    let hit = h.matcher(tbl, &always_hit_attr(0)).unwrap();
    let rtc = h.dev.rtc_attr(h.rtc0(hit)).unwrap();
    assert_eq!(rtc.num_hash_definer, 1);
    assert_eq!(rtc.access_index_mode, RtcAccessIndexMode::ByHash);
    assert_eq!(h.ctx.table_chain(tbl).unwrap(), vec![hit]);
    assert!(h.ctx.is_updatable(hit).unwrap());

    let linear_attr = always_hit_attr(1).with_distribute_mode(DistributeMode::ByLinear);
    let linear = h.matcher(tbl, &linear_attr).unwrap();
    let rtc = h.dev.rtc_attr(h.rtc0(linear)).unwrap();
    assert_eq!(rtc.access_index_mode, RtcAccessIndexMode::Linear);
    assert_eq!(rtc.match_definer_0, h.ctx.caps().linear_match_definer);

    let rejected = [
        // STE array outside the isolated set.
        MatcherAttr::htable(0, 4, 0).with_insert_mode(InsertMode::ByIndex),
        // Index insertion needs a single column.
        MatcherAttr::htable(0, 4, 2).with_insert_mode(InsertMode::ByIndex),
        // Linear distribution only for always-hit matchers.
        MatcherAttr::htable(0, 4, 0)
            .with_insert_mode(InsertMode::ByIndex)
            .with_distribute_mode(DistributeMode::ByLinear),
        MatcherAttr::htable(0, 17, 0)
            .with_insert_mode(InsertMode::ByIndex)
            .with_distribute_mode(DistributeMode::ByLinear)
            .with_match_mode(MatchMode::AlwaysHit),
        // Hash insertion distributes by hash.
        MatcherAttr::htable(0, 4, 1).with_distribute_mode(DistributeMode::ByLinear),
        // Only STE arrays may be isolated.
        MatcherAttr::htable(0, 4, 1).with_isolated(true),
    ];
    for attr in &rejected {
        let err = h.matcher(tbl, attr).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported, "{:?}", attr);
    }
    assert_eq!(h.ctx.table_chain(tbl).unwrap(), vec![hit, linear]);
}

#[test]
fn test_index_modes_need_device_support() {
    let h = Harness::with(caps_fixtures::no_linear(), SteeringConfig::default());
    let tbl = h.table(TableType::NicRx);

    let err = h
        .matcher(
            tbl,
            &always_hit_attr(0).with_distribute_mode(DistributeMode::ByLinear),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);

    let mut caps = caps_fixtures::full();
    caps.rtc_hash_split_table = false;
    let h = Harness::with(caps, SteeringConfig::default());
    let tbl = h.table(TableType::NicRx);
    let err = h.matcher(tbl, &always_hit_attr(0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
    h.matcher(tbl, &ste_array_attr(0)).unwrap();
}

#[test]
fn test_switch_domain_mirror_lookup() {
    let h = Harness::new();

    let fdb = h.table(TableType::Fdb);
    let m = h.small(fdb, 0);
    let info = h.ctx.matcher_info(m).unwrap();
    let rtc_1 = info.rtc_1.unwrap().as_raw();
    assert_ne!(rtc_1, h.rtc0(m));
    let mirror = h.dev.rtc_attr(rtc_1).unwrap();
    let primary = h.dev.rtc_attr(h.rtc0(m)).unwrap();
    assert_eq!(mirror.table_type, Some(FwFtType::FdbTx));
    assert_eq!(primary.table_type, Some(FwFtType::FdbRx));
    assert_ne!(mirror.ste_base, primary.ste_base);
    assert_eq!(mirror.log_size, 4);
    assert_eq!(h.dev.edges(h.entry_ft(fdb)).unwrap().rtc_1, Some(rtc_1));

    let unified = h.table(TableType::FdbUnified);
    let m = h.small(unified, 0);
    let info = h.ctx.matcher_info(m).unwrap();
    assert_eq!(info.rtc_1, info.rtc_0);

    let nic = h.table(TableType::NicTx);
    let m = h.small(nic, 0);
    assert_eq!(h.ctx.matcher_info(m).unwrap().rtc_1, None);
    assert_eq!(h.dev.edges(h.entry_ft(nic)).unwrap().rtc_1, None);
}

#[test]
fn test_flow_source_sizes_one_side() {
    let h = Harness::new();
    let fdb = h.table(TableType::Fdb);

    let vport = h
        .matcher(
            fdb,
            &MatcherAttr::htable(0, 4, 1).with_flow_src(FlowSource::Vport),
        )
        .unwrap();
    let info = h.ctx.matcher_info(vport).unwrap();
    let primary = h.dev.rtc_attr(h.rtc0(vport)).unwrap();
    let mirror = h.dev.rtc_attr(info.rtc_1.unwrap().as_raw()).unwrap();
    assert_eq!((primary.log_size, primary.log_depth), (0, 0));
    assert_eq!((mirror.log_size, mirror.log_depth), (4, 1));
    assert_eq!(h.dev.ste_log_size(primary.ste_base), Some(0));
    assert_eq!(h.dev.ste_log_size(mirror.ste_base), Some(5));

    let wire = h
        .matcher(
            fdb,
            &MatcherAttr::htable(0, 4, 1).with_flow_src(FlowSource::Wire),
        )
        .unwrap();
    let info = h.ctx.matcher_info(wire).unwrap();
    let primary = h.dev.rtc_attr(h.rtc0(wire)).unwrap();
    let mirror = h.dev.rtc_attr(info.rtc_1.unwrap().as_raw()).unwrap();
    assert_eq!((primary.log_size, primary.log_depth), (4, 1));
    assert_eq!((mirror.log_size, mirror.log_depth), (0, 0));
    assert_eq!(h.dev.ste_log_size(primary.ste_base), Some(5));
    assert_eq!(h.dev.ste_log_size(mirror.ste_base), Some(0));

    // Without a flow source the table direction picks the side.
    let tx = h.table(TableType::FdbTx);
    let m = h.small(tx, 0);
    let info = h.ctx.matcher_info(m).unwrap();
    let primary = h.dev.rtc_attr(h.rtc0(m)).unwrap();
    let mirror = h.dev.rtc_attr(info.rtc_1.unwrap().as_raw()).unwrap();
    assert_eq!((primary.log_size, primary.log_depth), (0, 0));
    assert_eq!((mirror.log_size, mirror.log_depth), (4, 1));
    assert_eq!(h.dev.ste_log_size(primary.ste_base), Some(0));
    assert_eq!(h.dev.ste_log_size(mirror.ste_base), Some(5));

    let nic = h.table(TableType::NicRx);
    let err = h
        .matcher(
            nic,
            &MatcherAttr::htable(0, 4, 1).with_flow_src(FlowSource::Wire),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
}

#[test]
fn test_updatable_and_dependent() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);

    let plain = h.small(tbl, 0);
    assert!(!h.ctx.is_updatable(plain).unwrap());
    assert!(!h.ctx.is_dependent(plain).unwrap());

    let by_idx = h.matcher(tbl, &ste_array_attr(1)).unwrap();
    assert!(h.ctx.is_updatable(by_idx).unwrap());

    let rule_idx = h
        .matcher(tbl, &MatcherAttr::htable(2, 4, 1).with_rule_idx(true))
        .unwrap();
    assert!(h.ctx.is_updatable(rule_idx).unwrap());

    let resizable = h
        .matcher(
            tbl,
            &MatcherAttr::htable(3, 4, 1)
                .with_rule_idx(true)
                .with_resizable(true),
        )
        .unwrap();
    assert!(!h.ctx.is_updatable(resizable).unwrap());

    let mut dep = action_fixtures::count_drop(2);
    dep.need_dep_write = true;
    let dependent = h
        .matcher_with(
            tbl,
            &[match_fixtures::five_tuple(1)],
            &[dep],
            &MatcherAttr::htable(4, 4, 1),
        )
        .unwrap();
    assert!(h.ctx.is_dependent(dependent).unwrap());
}

/// Builds a shared switch table with two chained matchers, arms one
/// failure and tries to add a large matcher with action entries between
/// them.
fn inject(point: FailPoint, nth: usize) {
    let h = Harness::shared();
    let tbl = h.table(TableType::Fdb);
    let a = h.small(tbl, 5);
    let b = h.small(tbl, 20);
    let before = h.dev.snapshot();
    let verifier = ChainVerifier::new(&h.dev);

    h.dev.fail_nth(point, nth);
    let res = h.matcher_with(
        tbl,
        &[match_fixtures::five_tuple(1)],
        &[action_fixtures::rewrite(1, 3)],
        &MatcherAttr::rule(10, 11),
    );

    if h.dev.has_pending_failure() {
        let m = res.unwrap_or_else(|e| panic!("{:?} #{}: unexpected {}", point, nth, e));
        h.dev.clear_failures();
        h.ctx.destroy_matcher(m).unwrap();
    } else {
        let err = res.expect_err("armed failure must fail the create");
        assert!(!err.is_fatal(), "{:?} #{}: {}", point, nth, err);
    }

    assert_eq!(h.ctx.table_chain(tbl).unwrap(), vec![a, b], "{:?} #{}", point, nth);
    assert_eq!(h.ctx.num_matchers().unwrap(), 2);
    verifier
        .assert_balanced(&before)
        .unwrap_or_else(|e| panic!("{:?} #{}: {}", point, nth, e));

    let local_target = h.dev.edges(h.local_ft(tbl)).unwrap().rtc_0.unwrap();
    assert_eq!(h.dev.alias_origin(local_target), Some(h.rtc0(a)));
}

#[test]
fn test_allocation_failures_unwind() {
    for point in FailPoint::ALLOCATIONS {
        for nth in 1..=8 {
            inject(point, nth);
        }
    }
}

#[test]
fn test_edge_failures_unwind() {
    for point in FailPoint::EDGES {
        for nth in 1..=12 {
            inject(point, nth);
        }
    }
}

#[test]
fn test_allocation_failure_keeps_walk() {
    for point in FailPoint::ALLOCATIONS {
        let h = Harness::new();
        let tbl = h.table(TableType::NicRx);
        let a = h.small(tbl, 1);
        let b = h.small(tbl, 3);

        h.dev.fail_nth(point, 1);
        let res = h.matcher_with(
            tbl,
            &[match_fixtures::five_tuple(1)],
            &[action_fixtures::rewrite(1, 3)],
            &MatcherAttr::htable(2, 4, 1),
        );
        h.dev.clear_failures();

        if point == FailPoint::CreateAlias || point == FailPoint::AllowAccess {
            // Not used outside shared contexts.
            h.ctx.destroy_matcher(res.unwrap()).unwrap();
        } else {
            assert!(res.is_err(), "{:?}", point);
        }
        ChainVerifier::new(&h.dev)
            .assert_chain(h.entry_ft(tbl), &h.rtcs(&[a, b]))
            .unwrap();
    }
}

#[test]
fn test_default_attr_is_smallest_rule_matcher() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);
    let m = h.matcher(tbl, &MatcherAttr::default()).unwrap();
    assert_eq!(h.ctx.matcher_info(m).unwrap().size, size(0, 0));
    assert_eq!(h.ctx.stats().unwrap().matchers_created, 1);

    let mts: Vec<MatchTemplate> = (1..=3).map(match_fixtures::five_tuple).collect();
    let m = h
        .matcher_with(
            tbl,
            &mts,
            &[action_fixtures::count_drop(1)],
            &MatcherAttr::default(),
        )
        .unwrap();
    assert_eq!(h.ctx.matcher_info(m).unwrap().num_of_mt, 3);
}
