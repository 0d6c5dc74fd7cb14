//! Priority chain and miss-table wiring.

mod common;

use std::sync::Arc;
use std::thread;

use common::{ste_array_attr, Harness};
use hws_devx::{MatcherId, TableType};
use hws_steering::{ErrorKind, MatcherAttr};
use hws_test::{ChainVerifier, FailPoint};
use pretty_assertions::assert_eq;

#[test]
fn test_chain_sorted_by_priority() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);

    let m10 = h.small(tbl, 10);
    let m5 = h.small(tbl, 5);
    let m20 = h.small(tbl, 20);

    assert_eq!(h.ctx.table_chain(tbl).unwrap(), vec![m5, m10, m20]);
    assert_eq!(h.priorities(tbl), vec![5, 10, 20]);

    let verifier = ChainVerifier::new(&h.dev);
    verifier
        .assert_chain(h.entry_ft(tbl), &h.rtcs(&[m5, m10, m20]))
        .unwrap();
    verifier.assert_points_to(h.end_ft(m20), None).unwrap();
}

#[test]
fn test_equal_priority_goes_after_existing() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);

    let m10 = h.small(tbl, 10);
    let m5 = h.small(tbl, 5);
    let m20 = h.small(tbl, 20);
    let m10b = h.small(tbl, 10);

    assert_eq!(h.ctx.table_chain(tbl).unwrap(), vec![m5, m10, m10b, m20]);
    ChainVerifier::new(&h.dev)
        .assert_chain(h.entry_ft(tbl), &h.rtcs(&[m5, m10, m10b, m20]))
        .unwrap();
}

#[test]
fn test_destroy_repairs_chain() {
    let h = Harness::new();
    let tbl = h.table(TableType::Fdb);
    let before = h.dev.snapshot();

    let a = h.small(tbl, 1);
    let b = h.small(tbl, 2);
    let c = h.small(tbl, 3);
    let verifier = ChainVerifier::new(&h.dev);

    h.ctx.destroy_matcher(b).unwrap();
    assert_eq!(h.ctx.table_chain(tbl).unwrap(), vec![a, c]);
    verifier
        .assert_chain(h.entry_ft(tbl), &h.rtcs(&[a, c]))
        .unwrap();

    h.ctx.destroy_matcher(a).unwrap();
    verifier.assert_chain(h.entry_ft(tbl), &h.rtcs(&[c])).unwrap();

    h.ctx.destroy_matcher(c).unwrap();
    verifier.assert_points_to(h.entry_ft(tbl), None).unwrap();
    verifier.assert_balanced(&before).unwrap();
    assert_eq!(h.ctx.num_matchers().unwrap(), 0);
}

#[test]
fn test_isolated_matcher_outside_chain() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);
    let a = h.small(tbl, 1);
    let b = h.small(tbl, 2);
    let entry_edges = h.dev.edges(h.entry_ft(tbl));
    let tail_edges = h.dev.edges(h.end_ft(b));

    let iso = h.matcher(tbl, &ste_array_attr(0)).unwrap();

    assert_eq!(h.ctx.table_chain(tbl).unwrap(), vec![a, b]);
    assert_eq!(h.ctx.isolated_matchers(tbl).unwrap(), vec![iso]);
    assert_eq!(h.dev.edges(h.entry_ft(tbl)), entry_edges);
    assert_eq!(h.dev.edges(h.end_ft(b)), tail_edges);
    assert!(h.ctx.matcher_info(iso).unwrap().isolated);

    h.ctx.destroy_matcher(iso).unwrap();
    assert!(h.ctx.isolated_matchers(tbl).unwrap().is_empty());
    assert_eq!(h.ctx.table_chain(tbl).unwrap(), vec![a, b]);
}

#[test]
fn test_miss_table_follows_head() {
    let h = Harness::new();
    let t1 = h.table(TableType::NicRx);
    let t2 = h.table(TableType::NicRx);
    let verifier = ChainVerifier::new(&h.dev);

    h.ctx.set_table_miss(t1, Some(t2)).unwrap();
    verifier
        .assert_misses_to(h.entry_ft(t1), Some(h.entry_ft(t2)))
        .unwrap();

    // First matcher of t2 becomes the lookup t1 misses into.
    let m2 = h.small(t2, 1);
    verifier
        .assert_points_to(h.entry_ft(t1), Some(h.rtc0(m2)))
        .unwrap();
    verifier.assert_misses_to(h.entry_ft(t1), None).unwrap();

    let m1 = h.small(t1, 1);
    verifier
        .assert_chain(h.entry_ft(t1), &h.rtcs(&[m1, m2]))
        .unwrap();

    h.ctx.destroy_matcher(m2).unwrap();
    verifier
        .assert_misses_to(h.end_ft(m1), Some(h.entry_ft(t2)))
        .unwrap();
    verifier.assert_chain(h.entry_ft(t1), &h.rtcs(&[m1])).unwrap();

    assert_eq!(h.ctx.table_info(t1).unwrap().miss_tbl, Some(t2));
}

#[test]
fn test_isolated_matcher_follows_miss_table() {
    let h = Harness::new();
    let t1 = h.table(TableType::NicRx);
    let t2 = h.table(TableType::NicRx);
    let iso = h.matcher(t1, &ste_array_attr(0)).unwrap();
    let verifier = ChainVerifier::new(&h.dev);

    h.ctx.set_table_miss(t1, Some(t2)).unwrap();
    verifier
        .assert_misses_to(h.end_ft(iso), Some(h.entry_ft(t2)))
        .unwrap();

    let m2 = h.small(t2, 1);
    verifier
        .assert_points_to(h.end_ft(iso), Some(h.rtc0(m2)))
        .unwrap();
}

#[test]
fn test_table_miss_rules() {
    let h = Harness::new();
    let nic = h.table(TableType::NicRx);
    let fdb = h.table(TableType::Fdb);
    let other = h.table(TableType::NicRx);

    let err = h.ctx.set_table_miss(nic, Some(fdb)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = h.ctx.set_table_miss(nic, Some(nic)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    h.ctx.set_table_miss(nic, Some(other)).unwrap();
    let err = h.ctx.destroy_table(other).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    h.ctx.set_table_miss(nic, None).unwrap();
    h.ctx.destroy_table(other).unwrap();
    assert_eq!(h.ctx.table_info(nic).unwrap().miss_tbl, None);
}

#[test]
fn test_destroy_table_with_matchers_fails() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicTx);
    let m = h.small(tbl, 1);

    let err = h.ctx.destroy_table(tbl).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    h.ctx.destroy_matcher(m).unwrap();
    h.ctx.destroy_table(tbl).unwrap();
    assert_eq!(
        h.ctx.table_chain(tbl).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    let stats = h.ctx.stats().unwrap();
    assert_eq!(stats.tables_created, 1);
    assert_eq!(stats.tables_destroyed, 1);
}

#[test]
fn test_insert_edge_failure_keeps_chain() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);
    let a = h.small(tbl, 1);
    let b = h.small(tbl, 3);
    let before = h.dev.snapshot();

    h.dev.fail_nth(FailPoint::SetNextRtc, 2);
    let err = h.matcher(tbl, &MatcherAttr::htable(2, 4, 1)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Splice);
    assert!(!err.is_fatal());
    assert_eq!(h.ctx.table_chain(tbl).unwrap(), vec![a, b]);
    ChainVerifier::new(&h.dev).assert_balanced(&before).unwrap();
    assert_eq!(h.ctx.stats().unwrap().create_failures, 1);
}

#[test]
fn test_fatal_disconnect_still_releases() {
    let h = Harness::new();
    let tbl = h.table(TableType::NicRx);
    let a = h.small(tbl, 1);
    let before = h.dev.snapshot();
    let b = h.small(tbl, 2);
    let c = h.small(tbl, 3);
    let verifier = ChainVerifier::new(&h.dev);
    verifier.assert_balanced(&before).unwrap_err();

    h.dev.fail_nth(FailPoint::SetNextRtc, 1);
    let err = h.ctx.destroy_matcher(b).unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(err.kind(), ErrorKind::FatalSplice);
    assert_eq!(h.ctx.matcher_info(b).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(h.ctx.table_chain(tbl).unwrap(), vec![a, c]);
    assert_eq!(h.ctx.stats().unwrap().fatal_disconnects, 1);

    h.ctx.destroy_matcher(c).unwrap();
    verifier.assert_balanced(&before).unwrap();
}

#[test]
fn test_concurrent_callers_keep_chain_sorted() {
    const THREADS: u32 = 8;
    const PER_THREAD: u32 = 10;

    let h = Arc::new(Harness::new());
    let tbl = h.table(TableType::Fdb);
    let before = h.dev.snapshot();

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let h = Arc::clone(&h);
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|i| {
                        let priority = (t + i) % 5;
                        (h.small(tbl, priority), priority)
                    })
                    .collect::<Vec<(MatcherId, u32)>>()
            })
        })
        .collect();
    let created: Vec<Vec<(MatcherId, u32)>> = workers
        .into_iter()
        .map(|w| w.join().expect("create worker"))
        .collect();

    let chain = h.ctx.table_chain(tbl).unwrap();
    assert_eq!(chain.len(), (THREADS * PER_THREAD) as usize);
    assert_eq!(h.ctx.num_matchers().unwrap(), chain.len());
    let priorities = h.priorities(tbl);
    assert!(priorities.windows(2).all(|w| w[0] <= w[1]), "{:?}", priorities);

    // Matchers of one caller with equal priority keep their creation order.
    for own in &created {
        let mut expected = own.clone();
        expected.sort_by_key(|(_, priority)| *priority);
        let expected: Vec<MatcherId> = expected.into_iter().map(|(id, _)| id).collect();
        let actual: Vec<MatcherId> = chain
            .iter()
            .copied()
            .filter(|id| own.iter().any(|(m, _)| m == id))
            .collect();
        assert_eq!(actual, expected);
    }

    let verifier = ChainVerifier::new(&h.dev);
    verifier
        .assert_chain(h.entry_ft(tbl), &h.rtcs(&chain))
        .unwrap();

    let workers: Vec<_> = created
        .into_iter()
        .map(|own| {
            let h = Arc::clone(&h);
            thread::spawn(move || {
                for (id, _) in own {
                    h.ctx.destroy_matcher(id).expect("destroy matcher");
                }
            })
        })
        .collect();
    for w in workers {
        w.join().expect("destroy worker");
    }

    assert!(h.ctx.table_chain(tbl).unwrap().is_empty());
    assert_eq!(h.ctx.num_matchers().unwrap(), 0);
    verifier.assert_points_to(h.entry_ft(tbl), None).unwrap();
    verifier.assert_balanced(&before).unwrap();
}
