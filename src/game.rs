//! Core game state and logic for one session

use crate::bag::Bag;
use crate::board::Board;
use crate::command::Action;
use crate::piece::Piece;
use crate::score::{Score, ScoringTable, Timing, clear_name};
use crate::tetromino::TetrominoType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Opaque player identifier handed in by the chat platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The chat location a game is bound to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextKey {
    /// Server (guild) the channel lives in; None for direct messages
    pub server: Option<u64>,
    pub channel: u64,
}

impl ContextKey {
    pub fn new(server: Option<u64>, channel: u64) -> Self {
        Self { server, channel }
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.server {
            Some(server) => write!(f, "{server}/{}", self.channel),
            None => write!(f, "dm/{}", self.channel),
        }
    }
}

/// Why a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// Player issued quit
    Quit,
    /// A new piece could not spawn
    TopOut,
    /// Removed from the registry from outside the game
    Evicted,
}

/// Game state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Running,
    Ended(EndReason),
}

impl GameStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, GameStatus::Running)
    }
}

/// Result emitted exactly once when a game ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalResult {
    pub context: ContextKey,
    pub user_id: UserId,
    pub score: u64,
    pub lines_cleared: u32,
    pub level: u32,
    pub reason: EndReason,
}

/// Per-game tunables resolved when the game is created
#[derive(Debug, Clone, Copy, Default)]
pub struct GameConfig {
    pub scoring: ScoringTable,
    pub timing: Timing,
    /// Fixed bag seed; random when None
    pub seed: Option<u64>,
}

/// Read-only snapshot handed to renderers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub context: ContextKey,
    pub user_id: UserId,
    pub board: Board,
    pub piece: Option<Piece>,
    /// Landing row of the current piece
    pub ghost_row: Option<i32>,
    pub next: TetrominoType,
    pub score: u64,
    pub lines: u32,
    pub level: u32,
    pub status: GameStatus,
    /// Last clear name, e.g. "Double"
    pub last_action: Option<&'static str>,
}

/// The main game struct
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    /// Current falling piece, None once the game has ended
    current: Option<Piece>,
    next: TetrominoType,
    bag: Bag,
    score: Score,
    status: GameStatus,
    timing: Timing,
    context: ContextKey,
    user_id: UserId,
    last_action: Option<&'static str>,
}

impl Game {
    /// Create a running game with a freshly spawned piece
    pub fn new(context: ContextKey, user_id: UserId, config: GameConfig) -> Self {
        let mut bag = match config.seed {
            Some(seed) => Bag::with_seed(seed),
            None => Bag::new(),
        };
        let first = bag.next();
        let next = bag.next();
        let board = Board::new();
        // An empty board always has room
        let current = Piece::spawn(first, &board);

        Self {
            board,
            current,
            next,
            bag,
            score: Score::new(config.scoring),
            status: GameStatus::Running,
            timing: config.timing,
            context,
            user_id,
            last_action: None,
        }
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_piece(&self) -> Option<&Piece> {
        self.current.as_ref()
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    pub fn context(&self) -> &ContextKey {
        &self.context
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Delay before the next gravity tick, from the current level
    pub fn tick_interval(&self) -> Duration {
        self.timing.interval(self.score.level)
    }

    /// Apply actions in order, stopping as soon as the game ends
    pub fn apply(&mut self, actions: &[Action]) -> GameStatus {
        for &action in actions {
            if !self.is_running() {
                break;
            }
            self.process_action(action);
        }
        self.status
    }

    /// Process a single action
    pub fn process_action(&mut self, action: Action) {
        if !self.is_running() {
            return;
        }
        match action {
            Action::MoveLeft => self.move_left(),
            Action::MoveRight => self.move_right(),
            Action::Rotate => self.rotate(),
            Action::SoftDrop => self.soft_drop(),
            Action::HardDrop => self.hard_drop(),
            Action::Quit => self.end(EndReason::Quit),
        }
    }

    /// Gravity: an unsolicited soft drop
    pub fn tick(&mut self) {
        if self.is_running() {
            self.soft_drop();
        }
    }

    /// End the game; no-op if it already ended
    pub fn end(&mut self, reason: EndReason) {
        if self.is_running() {
            self.status = GameStatus::Ended(reason);
            self.current = None;
        }
    }

    fn move_left(&mut self) {
        if let Some(piece) = &mut self.current {
            piece.move_left(&self.board);
        }
    }

    fn move_right(&mut self) {
        if let Some(piece) = &mut self.current {
            piece.move_right(&self.board);
        }
    }

    fn rotate(&mut self) {
        if let Some(piece) = &mut self.current {
            piece.rotate(&self.board);
        }
    }

    /// Move down one row, locking when blocked
    fn soft_drop(&mut self) {
        let Some(piece) = &mut self.current else {
            return;
        };
        if !piece.move_down(&self.board) {
            self.lock_piece();
        }
    }

    fn hard_drop(&mut self) {
        if let Some(piece) = &mut self.current {
            let distance = piece.hard_drop(&self.board);
            self.score.add_hard_drop(distance);
            self.lock_piece();
        }
    }

    /// Lock the current piece, clear lines, score and spawn the next one
    fn lock_piece(&mut self) {
        let Some(piece) = self.current.take() else {
            return;
        };

        self.board
            .lock(&piece.block_positions(), piece.piece_type.color_id());

        let lines = self.board.clear_full_lines() as u32;
        let level_before = self.score.level;
        if lines > 0 {
            let reward = self.score.add_clear(lines);
            debug!(context = %self.context, lines, reward, "lines cleared");
        }
        self.last_action = clear_name(lines);
        if self.score.level != level_before {
            info!(context = %self.context, level = self.score.level, "level up");
        }

        let spawn_type = std::mem::replace(&mut self.next, self.bag.next());
        match Piece::spawn(spawn_type, &self.board) {
            Some(next_piece) => self.current = Some(next_piece),
            None => {
                info!(context = %self.context, score = self.score.points, "top out");
                self.status = GameStatus::Ended(EndReason::TopOut);
            }
        }
    }

    /// Result for the scoreboard
    pub fn final_result(&self) -> FinalResult {
        FinalResult {
            context: self.context.clone(),
            user_id: self.user_id,
            score: self.score.points,
            lines_cleared: self.score.lines,
            level: self.score.level,
            reason: match self.status {
                GameStatus::Ended(reason) => reason,
                GameStatus::Running => EndReason::Evicted,
            },
        }
    }

    /// Snapshot for rendering
    pub fn view(&self) -> SessionView {
        SessionView {
            context: self.context.clone(),
            user_id: self.user_id,
            board: self.board.clone(),
            piece: self.current,
            ghost_row: self.current.map(|p| p.ghost_row(&self.board)),
            next: self.next,
            score: self.score.points,
            lines: self.score.lines,
            level: self.score.level,
            status: self.status,
            last_action: self.last_action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BOARD_HEIGHT, BOARD_WIDTH, Cell};
    use crate::tetromino::Rotation;

    fn game() -> Game {
        Game::new(
            ContextKey::new(Some(1), 2),
            UserId(3),
            GameConfig {
                seed: Some(9),
                ..GameConfig::default()
            },
        )
    }

    fn with_piece(kind: TetrominoType) -> Game {
        let mut game = game();
        game.current = Some(Piece::new(kind));
        game
    }

    fn fill_row_except(board: &mut Board, row: i32, holes: &[i32]) {
        for col in 0..BOARD_WIDTH as i32 {
            if !holes.contains(&col) {
                board.set(row, col, Cell::Occupied(7));
            }
        }
    }

    #[test]
    fn test_new_game_is_running_with_piece() {
        let game = game();
        assert!(game.is_running());
        assert!(game.current_piece().is_some());
        assert_eq!(game.score().level, 1);
        assert_eq!(game.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_i_piece_slides_to_left_wall_and_drops() {
        let mut game = with_piece(TetrominoType::I);
        let status = game.apply(&[
            Action::MoveLeft,
            Action::MoveLeft,
            Action::MoveLeft,
            Action::MoveLeft,
            Action::HardDrop,
        ]);
        assert_eq!(status, GameStatus::Running);
        for col in 0..4 {
            assert_eq!(game.board().get(0, col), Some(Cell::Occupied(1)));
        }
        assert_eq!(game.board().get(0, 4), Some(Cell::Empty));
        assert_eq!(game.score().lines, 0);
        assert_eq!(game.score().points, 2 * BOARD_HEIGHT as u64);
    }

    #[test]
    fn test_o_piece_fills_gap_and_clears_one_line() {
        let mut game = with_piece(TetrominoType::O);
        // Bottom row open exactly under the O footprint, a marker above
        fill_row_except(&mut game.board, 0, &[4, 5]);
        game.board.set(1, 0, Cell::Occupied(6));

        // Let gravity carry it down so only the clear scores
        for _ in 0..=BOARD_HEIGHT {
            game.tick();
            if game.score().lines > 0 {
                break;
            }
        }

        assert_eq!(game.score().lines, 1);
        assert_eq!(game.score().points, 100);
        // Upper half of the O and the marker shifted down onto row 0
        assert_eq!(game.board().get(0, 0), Some(Cell::Occupied(6)));
        assert_eq!(game.board().get(0, 4), Some(Cell::Occupied(2)));
        assert_eq!(game.board().get(0, 5), Some(Cell::Occupied(2)));
        assert_eq!(game.board().get(0, 1), Some(Cell::Empty));
        assert_eq!(game.board().top_occupied_row(), Some(0));
        assert_eq!(game.view().last_action, Some("Single"));
    }

    #[test]
    fn test_tetris_scores_more_than_two_singles() {
        let mut game = game();
        for row in 0..4 {
            fill_row_except(&mut game.board, row, &[0]);
        }
        game.current = Some(Piece {
            piece_type: TetrominoType::I,
            rotation: Rotation::West,
            row: 10,
            col: 0,
        });
        game.apply(&[Action::HardDrop]);
        assert_eq!(game.score().lines, 4);
        // 8 rows dropped at 2 each plus a level-1 tetris
        assert_eq!(game.score().points, 800 + 16);
        assert!(game.board().is_empty());
    }

    #[test]
    fn test_blocked_soft_drop_locks() {
        let mut game = with_piece(TetrominoType::O);
        game.current = Some(Piece {
            row: 1,
            ..Piece::new(TetrominoType::O)
        });
        game.apply(&[Action::SoftDrop]);
        assert_eq!(game.board().get(0, 4), Some(Cell::Occupied(2)));
        // Soft drops earn nothing
        assert_eq!(game.score().points, 0);
        assert!(game.current_piece().is_some());
    }

    #[test]
    fn test_top_out_ends_game() {
        let mut game = with_piece(TetrominoType::O);
        // Stack reaching into the spawn rows, with a hole so nothing clears
        for row in 0..=21 {
            fill_row_except(&mut game.board, row, &[0]);
        }
        game.current = Some(Piece {
            row: 23,
            col: 4,
            ..Piece::new(TetrominoType::O)
        });
        let status = game.apply(&[Action::HardDrop, Action::MoveLeft]);
        assert_eq!(status, GameStatus::Ended(EndReason::TopOut));
        assert!(game.current_piece().is_none());
        assert_eq!(game.final_result().reason, EndReason::TopOut);
    }

    #[test]
    fn test_quit_stops_remaining_actions() {
        let mut game = with_piece(TetrominoType::T);
        let status = game.apply(&[Action::Quit, Action::HardDrop]);
        assert_eq!(status, GameStatus::Ended(EndReason::Quit));
        assert!(game.board().is_empty());
        assert_eq!(game.score().points, 0);
        // Ended games ignore further input
        game.tick();
        game.process_action(Action::HardDrop);
        assert!(game.board().is_empty());
    }

    #[test]
    fn test_tick_moves_piece_down() {
        let mut game = with_piece(TetrominoType::T);
        let row = game.current_piece().map(|p| p.row);
        game.tick();
        assert_eq!(game.current_piece().map(|p| p.row), row.map(|r| r - 1));
    }

    #[test]
    fn test_rotate_command_turns_piece() {
        let mut game = with_piece(TetrominoType::I);
        let before = game.view();
        game.apply(&[Action::Rotate]);
        let after = game.view();
        assert_ne!(before.piece, after.piece);
        assert_eq!(after.piece.map(|p| p.rotation), Some(Rotation::East));
    }

    #[test]
    fn test_final_result_carries_owner() {
        let mut game = game();
        game.end(EndReason::Evicted);
        let result = game.final_result();
        assert_eq!(result.user_id, UserId(3));
        assert_eq!(result.context, ContextKey::new(Some(1), 2));
        assert_eq!(result.reason, EndReason::Evicted);
    }
}
