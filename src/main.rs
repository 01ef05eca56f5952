//! TRIS console - chat commands on stdin, board on stdout
//!
//! Plays the part of the chat bot for a single console channel: every
//! line starting with `!` is dispatched like a chat message.

use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tris::{
    Action, BOARD_HEIGHT, Cell, ContextKey, GameStatus, Registry, Scoreboard, SessionView,
    Settings, SpeedScope, UserId,
};

const CONSOLE: ContextKey = ContextKey {
    server: None,
    channel: 0,
};
const PLAYER: UserId = UserId(0);

const HELP: &str = "\
TRIS COMMANDS

Game Controls:
!tris - Start new game
!a    - Move left
!d    - Move right
!s    - Hard drop (instant fall)
!w    - Rotate piece
!q    - End current game

* You can combine commands: !aaa (move left 3x), !wd (rotate + move right)
* Hard drop gives 2 points per cell dropped

Stats:
!highscores    - View top 10 scores
!stats         - Your totals
!speed <x>     - Gravity speed for new games (2 = twice as fast)
!trishelp      - Show this help";

/// Get the tris temp directory, creating it if needed
fn tris_temp_dir() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join("tris");
    let _ = std::fs::create_dir_all(&dir);
    dir
}

fn main() -> io::Result<()> {
    let session_id: u32 = rand::random();

    // Logs go to a file so they never mix with the board
    let tris_dir = tris_temp_dir();
    let log_file = format!("{:08x}.log", session_id);
    let file_appender = tracing_appender::rolling::never(&tris_dir, &log_file);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tris=debug"));
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter)
        .with_ansi(false)
        .init();

    tracing::info!(
        "TRIS starting up, session={:08x}, log={}",
        session_id,
        tris_dir.join(&log_file).display()
    );

    let settings = Settings::load();
    let scoreboard = match settings.scores_path() {
        Some(path) => Scoreboard::open(&path).unwrap_or_else(|e| {
            tracing::warn!("could not load scores from {}: {}", path.display(), e);
            Scoreboard::new()
        }),
        None => Scoreboard::new(),
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(settings, Arc::new(scoreboard)))
}

async fn run(settings: Settings, scoreboard: Arc<Scoreboard>) -> io::Result<()> {
    let registry = Registry::new(settings, scoreboard);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = line.trim().strip_prefix('!') else {
            continue;
        };
        if let Err(e) = dispatch(&registry, command).await {
            println!("{e}");
        }
    }

    for result in registry.shutdown().await {
        println!("Game closed. Score: {}", result.score);
    }
    if let Err(e) = registry.scoreboard().save() {
        eprintln!("Warning: Could not save scores: {}", e);
    }
    Ok(())
}

async fn dispatch(registry: &Registry, command: &str) -> tris::Result<()> {
    let mut words = command.split_whitespace();
    let head = words.next().unwrap_or_default().to_ascii_lowercase();

    match head.as_str() {
        "tris" => {
            registry.start_session(CONSOLE, PLAYER)?;
            let mut updates = registry.subscribe(&CONSOLE)?;
            // Redraw on every change, gravity included; ends with the game
            tokio::spawn(async move {
                let mut text = render(&updates.borrow_and_update());
                println!("{text}");
                while updates.changed().await.is_ok() {
                    text = render(&updates.borrow_and_update());
                    println!("{text}");
                }
            });
        }
        "highscores" => {
            let scores = registry.scoreboard().top_scores(10);
            if scores.is_empty() {
                println!("No high scores yet");
            }
            for (rank, record) in scores.iter().enumerate() {
                let date = record
                    .achieved_at
                    .map(|at| at.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}. player {} - {} pts ({} games) {}",
                    rank + 1,
                    record.user_id,
                    record.high_score,
                    record.games_played,
                    date
                );
            }
        }
        "stats" => {
            let record = registry.scoreboard().stats_for(PLAYER)?;
            println!(
                "Best: {} | Games: {} | Lines: {} | Best level: {}",
                record.high_score, record.games_played, record.total_lines, record.best_level
            );
        }
        "speed" => {
            let raw = words.next().unwrap_or_default();
            let factor = raw
                .parse::<f64>()
                .map_err(|_| tris::TrisError::InvalidCommand(raw.to_string()))?;
            let scope = match CONSOLE.server {
                Some(server) => SpeedScope::Server(server),
                None => SpeedScope::Context(CONSOLE),
            };
            registry.set_speed(scope, factor)?;
            println!("Speed set to {factor}x for new games");
        }
        "trishelp" => println!("{HELP}"),
        letters => {
            let actions = Action::parse_compact(letters)?;
            // The subscription prints the result
            registry.apply_command(&CONSOLE, &actions).await?;
        }
    }
    Ok(())
}

/// Text rendering of a snapshot
fn render(view: &SessionView) -> String {
    if let GameStatus::Ended(_) = view.status {
        return format!(
            "GAME OVER!\nScore: {}\n\nUse `!tris` to start a new game",
            view.score
        );
    }

    let piece_cells = view
        .piece
        .map(|p| p.block_positions().to_vec())
        .unwrap_or_default();
    // Show the spawn rows while the piece is still above the field
    let top = piece_cells
        .iter()
        .map(|&(row, _)| row)
        .max()
        .unwrap_or(0)
        .max(BOARD_HEIGHT as i32 - 1);

    let mut out = format!(
        "Tris\nScore: {}  Lines: {}  Level: {}  Next: {}\n",
        view.score,
        view.lines,
        view.level,
        view.next.letter()
    );
    if let Some(action) = view.last_action {
        out.push_str(action);
        out.push('\n');
    }
    out.push('\n');
    for row in (0..=top).rev() {
        for col in 0..view.board.width() as i32 {
            let symbol = if piece_cells.contains(&(row, col)) {
                "🟥"
            } else {
                match view.board.get(row, col) {
                    Some(Cell::Occupied(_)) => "🟦",
                    _ => "⬛",
                }
            };
            out.push_str(symbol);
        }
        out.push('\n');
    }
    out
}
