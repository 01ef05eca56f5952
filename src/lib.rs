//! TRIS - falling blocks played turn by turn through chat
//!
//! One game per chat context, each advanced by player commands and its
//! own gravity timer. Finished games feed a shared scoreboard.

pub mod bag;
pub mod board;
pub mod command;
pub mod error;
pub mod game;
pub mod piece;
pub mod registry;
pub mod score;
pub mod scoreboard;
pub mod settings;
pub mod srs;
pub mod tetromino;

pub use board::{BOARD_HEIGHT, BOARD_WIDTH, Board, Cell};
pub use command::Action;
pub use error::{Result, TrisError};
pub use game::{ContextKey, EndReason, FinalResult, Game, GameConfig, GameStatus, SessionView, UserId};
pub use piece::Piece;
pub use registry::{CommandOutcome, Registry, SpeedScope};
pub use scoreboard::{ScoreRecord, Scoreboard};
pub use settings::Settings;
pub use tetromino::TetrominoType;
