//! Piece catalog: the 7 tetrominoes and their rotation states
//!
//! Shapes follow SRS (Super Rotation System) so the kick tables in
//! [`crate::srs`] line up with the offsets below.

use serde::{Deserialize, Serialize};

/// Color identifier stored in locked cells (1-7, one per piece kind)
pub type ColorId = u8;

/// The 7 tetromino types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TetrominoType {
    I, // long bar
    O, // square
    T,
    S,
    Z,
    J,
    L,
}

impl TetrominoType {
    /// Color id used when the piece is locked into the board
    pub fn color_id(&self) -> ColorId {
        match self {
            TetrominoType::I => 1,
            TetrominoType::O => 2,
            TetrominoType::T => 3,
            TetrominoType::S => 4,
            TetrominoType::Z => 5,
            TetrominoType::J => 6,
            TetrominoType::L => 7,
        }
    }

    /// Get all tetromino types for bag randomization
    pub fn all() -> [TetrominoType; 7] {
        [
            TetrominoType::I,
            TetrominoType::O,
            TetrominoType::T,
            TetrominoType::S,
            TetrominoType::Z,
            TetrominoType::J,
            TetrominoType::L,
        ]
    }

    /// Single-letter name, handy for previews
    pub fn letter(&self) -> char {
        match self {
            TetrominoType::I => 'I',
            TetrominoType::O => 'O',
            TetrominoType::T => 'T',
            TetrominoType::S => 'S',
            TetrominoType::Z => 'Z',
            TetrominoType::J => 'J',
            TetrominoType::L => 'L',
        }
    }

    /// Get the shape offsets for this tetromino at a given rotation
    /// Returns 4 (row, col) offsets relative to the piece's pivot
    /// Row increases upward, col increases rightward
    pub fn shape(&self, rotation: Rotation) -> [(i32, i32); 4] {
        match self {
            TetrominoType::I => match rotation {
                Rotation::North => [(0, -1), (0, 0), (0, 1), (0, 2)],
                Rotation::East => [(1, 1), (0, 1), (-1, 1), (-2, 1)],
                Rotation::South => [(-1, -1), (-1, 0), (-1, 1), (-1, 2)],
                Rotation::West => [(1, 0), (0, 0), (-1, 0), (-2, 0)],
            },
            // O has a single state in every orientation
            TetrominoType::O => [(0, 0), (0, 1), (-1, 0), (-1, 1)],
            TetrominoType::T => match rotation {
                Rotation::North => [(0, -1), (0, 0), (0, 1), (1, 0)],
                Rotation::East => [(1, 0), (0, 0), (-1, 0), (0, 1)],
                Rotation::South => [(0, -1), (0, 0), (0, 1), (-1, 0)],
                Rotation::West => [(1, 0), (0, 0), (-1, 0), (0, -1)],
            },
            // North: .SS    East: S.    South: SS.   West: .S
            //        SS.          SS           .SS        SS
            //                     .S                      S.
            TetrominoType::S => match rotation {
                Rotation::North => [(1, 0), (1, 1), (0, -1), (0, 0)],
                Rotation::East => [(1, 0), (0, 0), (0, 1), (-1, 1)],
                Rotation::South => [(0, 0), (0, 1), (-1, -1), (-1, 0)],
                Rotation::West => [(1, -1), (0, -1), (0, 0), (-1, 0)],
            },
            // North: ZZ.    East: .Z    South: .ZZ   West: Z.
            //        .ZZ          ZZ           ZZ.        ZZ
            //                     Z.                      .Z
            TetrominoType::Z => match rotation {
                Rotation::North => [(1, -1), (1, 0), (0, 0), (0, 1)],
                Rotation::East => [(1, 1), (0, 0), (0, 1), (-1, 0)],
                Rotation::South => [(0, -1), (0, 0), (-1, 0), (-1, 1)],
                Rotation::West => [(1, 0), (0, -1), (0, 0), (-1, -1)],
            },
            TetrominoType::J => match rotation {
                Rotation::North => [(1, -1), (0, -1), (0, 0), (0, 1)],
                Rotation::East => [(1, 0), (1, 1), (0, 0), (-1, 0)],
                Rotation::South => [(0, -1), (0, 0), (0, 1), (-1, 1)],
                Rotation::West => [(1, 0), (0, 0), (-1, 0), (-1, -1)],
            },
            TetrominoType::L => match rotation {
                Rotation::North => [(1, 1), (0, -1), (0, 0), (0, 1)],
                Rotation::East => [(1, 0), (0, 0), (-1, 0), (-1, 1)],
                Rotation::South => [(0, -1), (0, 0), (0, 1), (-1, -1)],
                Rotation::West => [(1, -1), (1, 0), (0, 0), (-1, 0)],
            },
        }
    }

    /// Spawn offset (row, col) relative to the bottom of the hidden buffer
    pub fn spawn_offset(&self) -> (i32, i32) {
        match self {
            TetrominoType::I | TetrominoType::O => (0, 4),
            _ => (1, 4),
        }
    }
}

/// Rotation states (SRS naming), indexed 0-3 clockwise from spawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    North, // Spawn state
    East,
    South,
    West,
}

impl Rotation {
    /// Number of rotation states every piece cycles through
    pub const COUNT: usize = 4;

    /// Rotate clockwise: North → East → South → West → North
    pub fn cw(&self) -> Rotation {
        Rotation::from_index(self.index() + 1)
    }

    pub fn index(&self) -> usize {
        match self {
            Rotation::North => 0,
            Rotation::East => 1,
            Rotation::South => 2,
            Rotation::West => 3,
        }
    }

    /// Wraps modulo [`Rotation::COUNT`]
    pub fn from_index(index: usize) -> Rotation {
        match index % Self::COUNT {
            0 => Rotation::North,
            1 => Rotation::East,
            2 => Rotation::South,
            _ => Rotation::West,
        }
    }

    pub fn all() -> [Rotation; 4] {
        [Rotation::North, Rotation::East, Rotation::South, Rotation::West]
    }
}
