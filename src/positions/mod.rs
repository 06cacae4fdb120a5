use std::fmt::{Display, Formatter};
use std::str::FromStr;
use chess::Piece;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The codec between position identifiers and Double Fischer Random setups.
///
/// Every other component relies on this mapping being stable: contributors
/// never talk to each other, so the identifier space is the only shared
/// vocabulary. The encoding is row-major with the first side's setup index
/// as the high word: `id = white_index * 960 + black_index`.

pub const SETUPS_PER_SIDE: u64 = 960;
pub const POSITION_COUNT: u64 = SETUPS_PER_SIDE * SETUPS_PER_SIDE;

#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum RangeError {
    #[error("setup index {0} is outside [0, {SETUPS_PER_SIDE})")]
    SetupIndexOutOfRange(u64),
    #[error("position id {0} is outside [0, {POSITION_COUNT})")]
    PositionIdOutOfRange(u64),
}

/// Identifies one (white setup, black setup) pair.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(pub u64);

impl Display for PositionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn encode(white_index: u32, black_index: u32) -> Result<PositionId, RangeError> {
    if white_index as u64 >= SETUPS_PER_SIDE {
        return Err(RangeError::SetupIndexOutOfRange(white_index as u64));
    }
    if black_index as u64 >= SETUPS_PER_SIDE {
        return Err(RangeError::SetupIndexOutOfRange(black_index as u64));
    }

    Ok(PositionId(white_index as u64 * SETUPS_PER_SIDE + black_index as u64))
}

pub fn decode(id: PositionId) -> Result<(u32, u32), RangeError> {
    if id.0 >= POSITION_COUNT {
        return Err(RangeError::PositionIdOutOfRange(id.0));
    }

    let white_index = (id.0 / SETUPS_PER_SIDE) as u32;
    let black_index = (id.0 % SETUPS_PER_SIDE) as u32;

    Ok((white_index, black_index))
}

/// Decodes an id into the actual back-rank setups of both sides.
pub fn setup_pair(id: PositionId) -> Result<(StartingSetup, StartingSetup), RangeError> {
    let (white_index, black_index) = decode(id)?;

    Ok((
        StartingSetup::from_index(white_index)?,
        StartingSetup::from_index(black_index)?,
    ))
}

// Knight placements among the five squares left after bishops and queen,
// indexed by the remaining Scharnagl digit.
const KNIGHT_PLACEMENTS: [(usize, usize); 10] = [
    (0, 1), (0, 2), (0, 3), (0, 4),
    (1, 2), (1, 3), (1, 4),
    (2, 3), (2, 4),
    (3, 4),
];

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum SetupParseError {
    #[error("setup '{0}' must be exactly 8 pieces")]
    WrongLength(String),
    #[error("setup contains unknown piece symbol '{0}'")]
    UnknownPiece(char),
    #[error("setup '{0}' does not have the right piece counts (2 rooks, 2 knights, 2 bishops, 1 queen, 1 king)")]
    WrongPieceCounts(String),
    #[error("setup '{0}' has both bishops on the same square color")]
    BishopsSameColor(String),
    #[error("setup '{0}' does not place the king strictly between the rooks")]
    KingNotBetweenRooks(String),
}

/// One side's back rank under Fischer Random constraints.
///
/// Only constructible through `from_index` or `FromStr`, so every value
/// satisfies the bishop-color and king-between-rooks constraints.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct StartingSetup {
    pieces: [Piece; 8],
}

impl StartingSetup {
    /// Derives the back rank for a Scharnagl index: bishops on opposite
    /// colors, then queen, then knights from the lookup table, then
    /// rook-king-rook left to right in the free squares.
    pub fn from_index(index: u32) -> Result<StartingSetup, RangeError> {
        if index as u64 >= SETUPS_PER_SIDE {
            return Err(RangeError::SetupIndexOutOfRange(index as u64));
        }

        let mut placed: [Option<Piece>; 8] = [None; 8];

        let n = index;
        let light_bishop = (n % 4) as usize;
        let n = n / 4;
        let dark_bishop = (n % 4) as usize;
        let n = n / 4;
        let queen = (n % 6) as usize;
        let knights = (n / 6) as usize;

        placed[light_bishop * 2 + 1] = Some(Piece::Bishop);
        placed[dark_bishop * 2] = Some(Piece::Bishop);

        let free: Vec<usize> = (0..8).filter(|&file| placed[file].is_none()).collect();
        placed[free[queen]] = Some(Piece::Queen);

        let free: Vec<usize> = (0..8).filter(|&file| placed[file].is_none()).collect();
        let (first_knight, second_knight) = KNIGHT_PLACEMENTS[knights];
        placed[free[first_knight]] = Some(Piece::Knight);
        placed[free[second_knight]] = Some(Piece::Knight);

        let free: Vec<usize> = (0..8).filter(|&file| placed[file].is_none()).collect();
        placed[free[0]] = Some(Piece::Rook);
        placed[free[1]] = Some(Piece::King);
        placed[free[2]] = Some(Piece::Rook);

        let mut pieces = [Piece::Rook; 8];
        for (file, piece) in placed.into_iter().enumerate() {
            pieces[file] = piece.expect("all 8 files filled by construction");
        }

        Ok(StartingSetup { pieces })
    }

    /// The exact inverse of `from_index`.
    pub fn index(&self) -> u32 {
        let files = |piece: Piece| -> Vec<usize> {
            (0..8).filter(|&file| self.pieces[file] == piece).collect()
        };

        let bishops = files(Piece::Bishop);
        let dark_bishop = bishops.iter().find(|&&file| file % 2 == 0).copied()
            .expect("one bishop on a dark square by construction");
        let light_bishop = bishops.iter().find(|&&file| file % 2 == 1).copied()
            .expect("one bishop on a light square by construction");

        let queen_file = files(Piece::Queen)[0];
        let queen = queen_file - bishops.iter().filter(|&&file| file < queen_file).count();

        let occupied = [bishops[0], bishops[1], queen_file];
        let free: Vec<usize> = (0..8).filter(|file| !occupied.contains(file)).collect();
        let knight_files = files(Piece::Knight);
        let first_knight = free.iter().position(|file| knight_files.contains(file))
            .expect("two knights in free squares");
        let second_knight = free.iter().rposition(|file| knight_files.contains(file))
            .expect("two knights in free squares");

        let knights = KNIGHT_PLACEMENTS
            .iter()
            .position(|&placement| placement == (first_knight, second_knight))
            .expect("knight placement in lookup table");

        (((knights * 6 + queen) * 4 + dark_bishop / 2) * 4 + (light_bishop - 1) / 2) as u32
    }

    pub fn pieces(&self) -> &[Piece; 8] {
        &self.pieces
    }

    /// The left-right reversal of this back rank.
    pub fn reversed(&self) -> StartingSetup {
        let mut pieces = self.pieces;
        pieces.reverse();

        StartingSetup { pieces }
    }
}

/// Both sides use an identical setup.
pub fn is_mirrored(white: &StartingSetup, black: &StartingSetup) -> bool {
    white == black
}

/// One side's setup is the left-right reversal of the other.
pub fn is_flipped(white: &StartingSetup, black: &StartingSetup) -> bool {
    white.reversed() == *black
}

fn piece_symbol(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}

impl Display for StartingSetup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for piece in self.pieces {
            write!(f, "{}", piece_symbol(piece))?;
        }

        Ok(())
    }
}

impl FromStr for StartingSetup {
    type Err = SetupParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbols: Vec<char> = s.chars().collect();
        if symbols.len() != 8 {
            return Err(SetupParseError::WrongLength(s.to_string()));
        }

        let mut pieces = [Piece::Rook; 8];
        for (file, symbol) in symbols.into_iter().enumerate() {
            pieces[file] = match symbol {
                'n' => Piece::Knight,
                'b' => Piece::Bishop,
                'r' => Piece::Rook,
                'q' => Piece::Queen,
                'k' => Piece::King,
                other => return Err(SetupParseError::UnknownPiece(other)),
            };
        }

        let count = |piece: Piece| pieces.iter().filter(|&&p| p == piece).count();
        if count(Piece::Rook) != 2
            || count(Piece::Knight) != 2
            || count(Piece::Bishop) != 2
            || count(Piece::Queen) != 1
            || count(Piece::King) != 1
        {
            return Err(SetupParseError::WrongPieceCounts(s.to_string()));
        }

        let bishops: Vec<usize> = (0..8).filter(|&file| pieces[file] == Piece::Bishop).collect();
        if bishops[0] % 2 == bishops[1] % 2 {
            return Err(SetupParseError::BishopsSameColor(s.to_string()));
        }

        let rooks: Vec<usize> = (0..8).filter(|&file| pieces[file] == Piece::Rook).collect();
        let king = (0..8).position(|file| pieces[file] == Piece::King)
            .expect("king counted above");
        if !(rooks[0] < king && king < rooks[1]) {
            return Err(SetupParseError::KingNotBetweenRooks(s.to_string()));
        }

        Ok(StartingSetup { pieces })
    }
}

#[test]
fn check_standard_setup() {
    // Scharnagl number 518 is the classical starting position
    let setup = StartingSetup::from_index(518).unwrap();

    assert_eq!(setup.to_string(), "rnbqkbnr");
    assert_eq!(setup.index(), 518);
}
