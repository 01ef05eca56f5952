//! Game board representation and collision detection
//!
//! Collision convention: anything left of column 0, right of the last
//! column, below the floor or above the stored rows counts as occupied.
//! The hidden buffer rows above the visible field are ordinary empty
//! rows, so pieces can spawn and rotate there.

use crate::tetromino::ColorId;

/// Standard board dimensions
pub const BOARD_WIDTH: usize = 10;
pub const BOARD_HEIGHT: usize = 20;
/// Hidden rows above the visible board for spawning
pub const BUFFER_HEIGHT: usize = 4;
pub const TOTAL_HEIGHT: usize = BOARD_HEIGHT + BUFFER_HEIGHT;

/// A cell on the board - either empty or occupied by a locked piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Occupied(ColorId),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn is_occupied(&self) -> bool {
        matches!(self, Cell::Occupied(_))
    }
}

/// The game board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// Grid stored as [row][col], row 0 is bottom, row increases upward
    cells: [[Cell; BOARD_WIDTH]; TOTAL_HEIGHT],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Self {
            cells: [[Cell::Empty; BOARD_WIDTH]; TOTAL_HEIGHT],
        }
    }

    pub fn width(&self) -> usize {
        BOARD_WIDTH
    }

    pub fn height(&self) -> usize {
        BOARD_HEIGHT
    }

    /// Whether (row, col) addresses a stored cell
    pub fn is_inside(&self, row: i32, col: i32) -> bool {
        (0..TOTAL_HEIGHT as i32).contains(&row) && (0..BOARD_WIDTH as i32).contains(&col)
    }

    /// Get the cell at a position (row, col)
    /// Returns None if out of bounds
    pub fn get(&self, row: i32, col: i32) -> Option<Cell> {
        if !self.is_inside(row, col) {
            return None;
        }
        Some(self.cells[row as usize][col as usize])
    }

    /// Set a cell at a position
    /// Returns false if out of bounds
    pub fn set(&mut self, row: i32, col: i32, cell: Cell) -> bool {
        if !self.is_inside(row, col) {
            return false;
        }
        self.cells[row as usize][col as usize] = cell;
        true
    }

    /// Collision test for a single position; walls, floor and ceiling
    /// are occupied
    pub fn is_occupied(&self, row: i32, col: i32) -> bool {
        self.get(row, col).is_none_or(|cell| cell.is_occupied())
    }

    /// Check if every absolute cell can be placed
    pub fn can_place(&self, positions: &[(i32, i32)]) -> bool {
        positions
            .iter()
            .all(|&(row, col)| !self.is_occupied(row, col))
    }

    /// Lock a piece onto the board
    ///
    /// # Panics
    ///
    /// If the positions cannot be placed. Callers always test with
    /// [`Board::can_place`] first, so this is a control-flow defect.
    pub fn lock(&mut self, positions: &[(i32, i32)], color: ColorId) {
        assert!(
            self.can_place(positions),
            "lock called on blocked positions {positions:?}"
        );
        for &(row, col) in positions {
            self.set(row, col, Cell::Occupied(color));
        }
    }

    /// Remove every full row, shift the rows above down and return the
    /// number of rows removed
    pub fn clear_full_lines(&mut self) -> usize {
        let mut lines_cleared = 0;
        let mut write_row = 0;

        for read_row in 0..TOTAL_HEIGHT {
            if !self.is_line_full(read_row) {
                if write_row != read_row {
                    self.cells[write_row] = self.cells[read_row];
                }
                write_row += 1;
            } else {
                lines_cleared += 1;
            }
        }

        // Fill the top with empty rows
        for row in write_row..TOTAL_HEIGHT {
            self.cells[row] = [Cell::Empty; BOARD_WIDTH];
        }

        lines_cleared
    }

    /// Check if a line is completely filled
    fn is_line_full(&self, row: usize) -> bool {
        self.cells[row].iter().all(|cell| cell.is_occupied())
    }

    /// Top-out test: true iff any spawn cell is already occupied
    pub fn is_game_over(&self, spawn_cells: &[(i32, i32)]) -> bool {
        spawn_cells
            .iter()
            .any(|&(row, col)| self.get(row, col).is_some_and(|cell| cell.is_occupied()))
    }

    /// Highest row holding an occupied cell, if any
    pub fn top_occupied_row(&self) -> Option<usize> {
        (0..TOTAL_HEIGHT)
            .rev()
            .find(|&row| self.cells[row].iter().any(|cell| cell.is_occupied()))
    }

    /// Check if the board is completely empty
    pub fn is_empty(&self) -> bool {
        self.cells
            .iter()
            .all(|row| row.iter().all(|cell| cell.is_empty()))
    }

    /// Visible rows, bottom to top
    pub fn visible_rows(&self) -> impl Iterator<Item = (usize, &[Cell; BOARD_WIDTH])> {
        self.cells[..BOARD_HEIGHT].iter().enumerate()
    }
}
