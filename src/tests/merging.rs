use crate::claims::ClaimRange;
use crate::merge::outcome::{classify, Outcome};
use crate::merge::{merge, MergeContext, MergeReport};
use crate::positions::PositionId;
use crate::records::validator::ValidationConfig;
use crate::records::PositionRecord;
use crate::store::CanonicalStore;
use crate::tests::record_for;

fn run(batch: &[PositionRecord], store: &mut CanonicalStore) -> MergeReport {
    let claim = ClaimRange {
        start: 0,
        end: 1000,
        owner: "alice".to_string(),
    };
    let config = ValidationConfig::default();
    let ctx = MergeContext {
        claim: &claim,
        batch_bounds: None,
        config: &config,
        oracle: None,
    };

    merge(batch, store, &ctx).unwrap()
}

#[test]
fn check_deeper_record_wins_within_batch() {
    let mut store = CanonicalStore::new();
    let batch = vec![
        record_for(7, 12, "alice", 100),
        record_for(7, 20, "bob", 100),
    ];

    let report = run(&batch, &mut store);

    assert_eq!(report.accepted, vec![7]);
    assert_eq!(report.superseded, vec![7]);
    assert!(report.rejected.is_empty());

    let winner = store.accepted(PositionId(7)).unwrap();
    assert_eq!(winner.evaluation.depth, 20);
    assert_eq!(winner.contributor, "bob");

    // The shallower record is retained, flagged, never discarded
    assert_eq!(store.len(), 2);
    assert_eq!(store.accepted_count(), 1);
    assert_eq!(
        store.entries().iter().filter(|entry| entry.superseded).count(),
        1,
    );
}

#[test]
fn check_remerge_is_idempotent() {
    let mut store = CanonicalStore::new();
    let batch = vec![
        record_for(7, 12, "alice", 100),
        record_for(7, 20, "bob", 100),
        record_for(8, 15, "alice", 100),
    ];

    run(&batch, &mut store);
    let stored_before = store.len();

    let report = run(&batch, &mut store);

    assert!(report.accepted.is_empty());
    assert!(report.superseded.is_empty());
    assert_eq!(report.rejected.len(), batch.len());
    assert!(report
        .rejected
        .iter()
        .all(|rejected| rejected.reason.code() == "duplicate"));
    assert_eq!(store.len(), stored_before);
    assert_eq!(classify(&report), Outcome::Rejected);
}

#[test]
fn check_deeper_record_dethrones_stored_one() {
    let mut store = CanonicalStore::new();
    store.insert_accepted(record_for(3, 10, "alice", 50));

    let report = run(&[record_for(3, 20, "bob", 100)], &mut store);

    assert_eq!(report.accepted, vec![3]);
    assert_eq!(report.superseded, vec![3]);

    let winner = store.accepted(PositionId(3)).unwrap();
    assert_eq!(winner.contributor, "bob");
    assert_eq!(store.entries()[0].superseded, true);
    assert_eq!(store.accepted_count(), 1);
}

#[test]
fn check_shallower_record_is_retained_but_not_accepted() {
    let mut store = CanonicalStore::new();
    store.insert_accepted(record_for(3, 30, "alice", 50));

    let report = run(&[record_for(3, 12, "bob", 100)], &mut store);

    assert!(report.accepted.is_empty());
    assert_eq!(report.superseded, vec![3]);
    assert!(report.rejected.is_empty());

    // The store keeps its deeper record, the loser joins the audit trail
    assert_eq!(store.accepted(PositionId(3)).unwrap().contributor, "alice");
    assert_eq!(store.len(), 2);
    assert!(store.entries()[1].superseded);
    assert_eq!(classify(&report), Outcome::Rejected);
}

#[test]
fn check_depth_tie_broken_by_earlier_submission() {
    let mut store = CanonicalStore::new();
    store.insert_accepted(record_for(3, 20, "alice", 100));

    let report = run(&[record_for(3, 20, "bob", 50)], &mut store);

    assert_eq!(report.accepted, vec![3]);
    assert_eq!(store.accepted(PositionId(3)).unwrap().contributor, "bob");
}

#[test]
fn check_mixed_batch_is_partially_rejected() {
    let mut store = CanonicalStore::new();
    let batch = vec![
        record_for(1, 20, "alice", 100),
        record_for(2, 20, "alice", 100),
        record_for(3, 5, "alice", 100), // below the depth floor
    ];

    let report = run(&batch, &mut store);

    assert_eq!(report.accepted_count(), 2);
    assert_eq!(report.rejected_count(), 1);
    assert_eq!(report.rejected[0].reason.code(), "depth-below-minimum");
    assert_eq!(classify(&report), Outcome::PartiallyRejected);
}

#[test]
fn check_clean_batch_is_validated() {
    let mut store = CanonicalStore::new();
    let batch = vec![
        record_for(1, 20, "alice", 100),
        record_for(2, 20, "alice", 100),
        record_for(3, 20, "alice", 100),
    ];

    let report = run(&batch, &mut store);

    assert_eq!(report.accepted_count(), 3);
    assert_eq!(classify(&report), Outcome::Validated);
    assert!(classify(&report).passed());
}

#[test]
fn check_empty_batch_is_rejected() {
    let mut store = CanonicalStore::new();
    let report = run(&[], &mut store);

    assert_eq!(classify(&report), Outcome::Rejected);
    assert!(!classify(&report).passed());
}

#[test]
fn check_merge_is_batch_order_independent() {
    let forward = vec![
        record_for(7, 12, "alice", 100),
        record_for(7, 20, "bob", 100),
        record_for(7, 20, "carol", 100),
    ];
    let mut reversed = forward.clone();
    reversed.reverse();

    let mut store_a = CanonicalStore::new();
    let mut store_b = CanonicalStore::new();
    run(&forward, &mut store_a);
    run(&reversed, &mut store_b);

    assert_eq!(
        store_a.accepted(PositionId(7)).unwrap(),
        store_b.accepted(PositionId(7)).unwrap(),
    );
}
