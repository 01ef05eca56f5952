//! Active falling piece logic
//!
//! Every move is tentative: the candidate placement is tested against
//! the board and the piece is left untouched when it does not fit.

use crate::board::{BOARD_HEIGHT, Board};
use crate::srs::get_wall_kicks;
use crate::tetromino::{Rotation, TetrominoType};

/// An active falling piece
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    /// The type of tetromino
    pub piece_type: TetrominoType,
    /// Current rotation state
    pub rotation: Rotation,
    /// Position (row, col) of the piece's pivot point
    /// Row 0 is bottom, increases upward
    pub row: i32,
    pub col: i32,
}

impl Piece {
    /// Create a new piece at spawn position, just above the visible field
    pub fn new(piece_type: TetrominoType) -> Self {
        let (row, col) = piece_type.spawn_offset();
        Self {
            piece_type,
            rotation: Rotation::North,
            row: BOARD_HEIGHT as i32 + row,
            col,
        }
    }

    /// Spawn a piece onto `board`; None signals top-out
    pub fn spawn(piece_type: TetrominoType, board: &Board) -> Option<Self> {
        let piece = Self::new(piece_type);
        if board.is_game_over(&piece.block_positions()) {
            None
        } else {
            Some(piece)
        }
    }

    /// Get the absolute positions of all 4 blocks
    pub fn block_positions(&self) -> [(i32, i32); 4] {
        self.positions_at(self.rotation, self.row, self.col)
    }

    fn positions_at(&self, rotation: Rotation, row: i32, col: i32) -> [(i32, i32); 4] {
        self.piece_type
            .shape(rotation)
            .map(|(dr, dc)| (row + dr, col + dc))
    }

    /// Shift by (rows, cols) if the target fits, returns true if moved
    fn try_shift(&mut self, board: &Board, rows: i32, cols: i32) -> bool {
        let (row, col) = (self.row + rows, self.col + cols);
        if board.can_place(&self.positions_at(self.rotation, row, col)) {
            self.row = row;
            self.col = col;
            true
        } else {
            false
        }
    }

    /// Try to move left, returns true if successful
    pub fn move_left(&mut self, board: &Board) -> bool {
        self.try_shift(board, 0, -1)
    }

    /// Try to move right, returns true if successful
    pub fn move_right(&mut self, board: &Board) -> bool {
        self.try_shift(board, 0, 1)
    }

    /// Try to move down, returns true if successful
    pub fn move_down(&mut self, board: &Board) -> bool {
        self.try_shift(board, -1, 0)
    }

    /// Rotate clockwise using SRS wall kicks, returns true if rotated
    pub fn rotate(&mut self, board: &Board) -> bool {
        let new_rotation = self.rotation.cw();

        for (kick_row, kick_col) in get_wall_kicks(self.piece_type, self.rotation) {
            let (row, col) = (self.row + kick_row, self.col + kick_col);
            if board.can_place(&self.positions_at(new_rotation, row, col)) {
                self.rotation = new_rotation;
                self.row = row;
                self.col = col;
                return true;
            }
        }

        false
    }

    /// Hard drop - move down as far as possible and return distance dropped
    pub fn hard_drop(&mut self, board: &Board) -> u32 {
        let mut distance = 0;
        while self.move_down(board) {
            distance += 1;
        }
        distance
    }

    /// Row the piece would land on (for ghost rendering)
    pub fn ghost_row(&self, board: &Board) -> i32 {
        let mut ghost = *self;
        ghost.hard_drop(board);
        ghost.row
    }
}
