//! Super Rotation System (SRS) wall kick data
//!
//! When a clockwise rotation collides, these offsets are tried in order
//! and the first placement that fits wins. Only clockwise rotation is
//! exposed to players, so only the four clockwise transitions are kept.

use crate::tetromino::{Rotation, TetrominoType};

/// Number of placements tried per rotation (the first is identity)
pub const KICK_TESTS: usize = 5;

/// Get wall kick offsets for a clockwise rotation out of `from`
/// Returns 5 (row_offset, col_offset) pairs, row+ is up, col+ is right
pub fn get_wall_kicks(piece_type: TetrominoType, from: Rotation) -> [(i32, i32); KICK_TESTS] {
    match piece_type {
        // O never needs to move
        TetrominoType::O => [(0, 0); KICK_TESTS],
        TetrominoType::I => i_piece_kicks(from),
        _ => jlstz_kicks(from),
    }
}

/// Wall kicks for J, L, S, T, Z pieces (row offsets negated from the
/// row-down tables usually published)
fn jlstz_kicks(from: Rotation) -> [(i32, i32); KICK_TESTS] {
    match from {
        // 0→R
        Rotation::North => [(0, 0), (0, -1), (1, -1), (-2, 0), (-2, -1)],
        // R→2
        Rotation::East => [(0, 0), (0, 1), (-1, 1), (2, 0), (2, 1)],
        // 2→L
        Rotation::South => [(0, 0), (0, 1), (1, 1), (-2, 0), (-2, 1)],
        // L→0
        Rotation::West => [(0, 0), (0, -1), (-1, -1), (2, 0), (2, -1)],
    }
}

/// Wall kicks for the I piece
fn i_piece_kicks(from: Rotation) -> [(i32, i32); KICK_TESTS] {
    match from {
        // 0→R
        Rotation::North => [(0, 0), (0, -2), (0, 1), (-1, -2), (2, 1)],
        // R→2
        Rotation::East => [(0, 0), (0, -1), (0, 2), (2, -1), (-1, 2)],
        // 2→L
        Rotation::South => [(0, 0), (0, 2), (0, -1), (1, 2), (-2, -1)],
        // L→0
        Rotation::West => [(0, 0), (0, 1), (0, -2), (-2, 1), (1, -2)],
    }
}
