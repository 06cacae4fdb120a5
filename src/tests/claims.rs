use crate::claims::registry::{check_duplicate, register_claim};
use crate::claims::{ClaimRange, MalformedClaimError};
use crate::positions::PositionId;
use crate::store::CanonicalStore;
use crate::tests::record_for;

fn claim(start: u64, end: u64, owner: &str) -> ClaimRange {
    ClaimRange {
        start,
        end,
        owner: owner.to_string(),
    }
}

#[test]
fn check_well_formed_token() {
    let parsed = ClaimRange::parse("analysis/5_10", "alice").unwrap();

    assert_eq!(parsed, claim(5, 10, "alice"));
    assert_eq!(parsed.len(), 5);
    assert!(parsed.contains(PositionId(5)));
    assert!(parsed.contains(PositionId(9)));
    assert!(!parsed.contains(PositionId(10)));
}

#[test]
fn check_malformed_tokens() {
    assert_eq!(
        ClaimRange::parse("analysis/10_5", "alice"),
        Err(MalformedClaimError::Inverted { start: 10, end: 5 }),
    );
    assert_eq!(
        ClaimRange::parse("analysis/5_5", "alice"),
        Err(MalformedClaimError::Inverted { start: 5, end: 5 }),
    );
    assert_eq!(
        ClaimRange::parse("analysis/abc_10", "alice"),
        Err(MalformedClaimError::Shape("analysis/abc_10".to_string())),
    );
    assert_eq!(
        ClaimRange::parse("results/5_10", "alice"),
        Err(MalformedClaimError::Shape("results/5_10".to_string())),
    );
    assert_eq!(
        ClaimRange::parse("analysis/5_921600", "alice"),
        Err(MalformedClaimError::BoundOutOfDomain("921600".to_string())),
    );
    // Bounds too large for u64 are out of domain, not a panic
    assert_eq!(
        ClaimRange::parse("analysis/0_99999999999999999999999", "alice"),
        Err(MalformedClaimError::BoundOutOfDomain(
            "99999999999999999999999".to_string(),
        )),
    );
}

#[test]
fn check_overlapping_claims_rejected() {
    let first = claim(0, 100, "alice");
    let second = claim(50, 150, "bob");

    register_claim(&first, &[]).unwrap();
    let error = register_claim(&second, &[first.clone()]).unwrap_err();

    assert_eq!(error.attempted, second);
    assert_eq!(error.existing, first);
}

#[test]
fn check_adjacent_claims_allowed() {
    let first = claim(0, 100, "alice");
    let second = claim(100, 200, "bob");

    register_claim(&second, &[first]).unwrap();
}

#[test]
fn check_containing_claim_rejected() {
    let outer = claim(0, 1000, "alice");
    let inner = claim(400, 500, "bob");

    assert!(register_claim(&inner, &[outer.clone()]).is_err());
    assert!(register_claim(&outer, &[inner]).is_err());
}

#[test]
fn check_duplicate_probe() {
    let mut store = CanonicalStore::new();
    assert!(!check_duplicate(PositionId(7), &store));

    store.insert_accepted(record_for(7, 20, "alice", 100));
    assert!(check_duplicate(PositionId(7), &store));

    // A superseded entry alone is not a duplicate
    store.insert_superseded(record_for(8, 12, "bob", 100));
    assert!(!check_duplicate(PositionId(8), &store));
}
