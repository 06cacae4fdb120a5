use std::collections::HashSet;
use std::str::FromStr;
use chess::Piece;

use crate::positions::{
    decode, encode, is_flipped, is_mirrored, setup_pair, PositionId, RangeError, StartingSetup,
    POSITION_COUNT, SETUPS_PER_SIDE,
};

#[test]
fn check_pair_roundtrip_over_full_domain() {
    for white in 0..SETUPS_PER_SIDE as u32 {
        for black in 0..SETUPS_PER_SIDE as u32 {
            let id = encode(white, black).unwrap();
            assert_eq!(decode(id).unwrap(), (white, black));
        }
    }
}

#[test]
fn check_id_roundtrip_over_full_domain() {
    for id in 0..POSITION_COUNT {
        let (white, black) = decode(PositionId(id)).unwrap();
        assert_eq!(encode(white, black).unwrap(), PositionId(id));
    }
}

#[test]
fn check_encoding_is_row_major() {
    // The first side's index is the high word. Fixed for all contributors.
    assert_eq!(encode(0, 1).unwrap(), PositionId(1));
    assert_eq!(encode(1, 0).unwrap(), PositionId(960));
    assert_eq!(encode(959, 959).unwrap(), PositionId(POSITION_COUNT - 1));
}

#[test]
fn check_setups_are_injective_and_legal() {
    let mut seen = HashSet::new();

    for index in 0..SETUPS_PER_SIDE as u32 {
        let setup = StartingSetup::from_index(index).unwrap();
        assert!(seen.insert(setup.to_string()), "setup {} repeated", setup);

        let pieces = setup.pieces();
        let files = |piece: Piece| -> Vec<usize> {
            (0..8).filter(|&file| pieces[file] == piece).collect()
        };

        let bishops = files(Piece::Bishop);
        assert_ne!(bishops[0] % 2, bishops[1] % 2, "bishops share a color in {}", setup);

        let rooks = files(Piece::Rook);
        let king = files(Piece::King)[0];
        assert!(rooks[0] < king && king < rooks[1], "king not between rooks in {}", setup);
    }

    assert_eq!(seen.len(), SETUPS_PER_SIDE as usize);
}

#[test]
fn check_setup_index_roundtrip() {
    for index in 0..SETUPS_PER_SIDE as u32 {
        let setup = StartingSetup::from_index(index).unwrap();
        assert_eq!(setup.index(), index);

        let reparsed = StartingSetup::from_str(&setup.to_string()).unwrap();
        assert_eq!(reparsed, setup);
    }
}

#[test]
fn check_classical_setup_number() {
    assert_eq!(StartingSetup::from_str("rnbqkbnr").unwrap().index(), 518);
}

#[test]
fn check_out_of_domain_inputs() {
    assert_eq!(encode(960, 0), Err(RangeError::SetupIndexOutOfRange(960)));
    assert_eq!(encode(0, 960), Err(RangeError::SetupIndexOutOfRange(960)));
    assert_eq!(
        decode(PositionId(POSITION_COUNT)),
        Err(RangeError::PositionIdOutOfRange(POSITION_COUNT)),
    );
    assert!(StartingSetup::from_index(960).is_err());
}

#[test]
fn check_invalid_setup_strings() {
    assert!(StartingSetup::from_str("rnbqkbn").is_err());
    assert!(StartingSetup::from_str("rnbqkbnx").is_err());
    assert!(StartingSetup::from_str("rnbnbqkr").is_err()); // bishops on same color
    assert!(StartingSetup::from_str("knrbbqnr").is_err()); // king outside the rooks
    assert!(StartingSetup::from_str("rnbqqbnr").is_err()); // two queens, no king
}

#[test]
fn check_mirrored_and_flipped() {
    let (white, black) = setup_pair(encode(518, 518).unwrap()).unwrap();
    assert!(is_mirrored(&white, &black));

    let white = StartingSetup::from_index(0).unwrap();
    let black = white.reversed();
    assert!(is_flipped(&white, &black));
    assert!(!is_mirrored(&white, &black));

    // The reversal of a legal setup is itself legal, with its own index.
    let reparsed = StartingSetup::from_str(&black.to_string()).unwrap();
    assert_eq!(StartingSetup::from_index(reparsed.index()).unwrap(), black);
}
