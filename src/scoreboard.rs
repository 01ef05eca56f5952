//! Per-player statistics built from finished games
//!
//! Records live in memory behind a mutex. When opened with a path,
//! [`Scoreboard::save`] rewrites the whole table as JSON lines from a
//! snapshot, so recording never waits on the disk.

use crate::error::{Result, TrisError};
use crate::game::{FinalResult, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Running statistics for one player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub user_id: UserId,
    pub high_score: u64,
    pub games_played: u32,
    pub total_lines: u64,
    #[serde(default)]
    pub best_level: u32,
    /// Order in which the current high score was set; earlier wins ties
    pub achieved: u64,
    /// When the current high score was set
    #[serde(default)]
    pub achieved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Ledger {
    records: HashMap<UserId, ScoreRecord>,
    next_seq: u64,
    /// Bumped on every update
    version: u64,
}

/// Score aggregator shared by every session
#[derive(Debug, Default)]
pub struct Scoreboard {
    ledger: Mutex<Ledger>,
    path: Option<PathBuf>,
    /// Ledger version last written to `path`; also serialises writers
    written: Mutex<u64>,
}

impl Scoreboard {
    /// In-memory scoreboard
    pub fn new() -> Self {
        Self::default()
    }

    /// Scoreboard backed by a JSON-lines file; a missing file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut ledger = Ledger::default();

        match fs::read_to_string(&path) {
            Ok(contents) => {
                for line in contents.lines().filter(|l| !l.trim().is_empty()) {
                    let record: ScoreRecord = serde_json::from_str(line)?;
                    ledger.next_seq = ledger.next_seq.max(record.achieved + 1);
                    ledger.records.insert(record.user_id, record);
                }
                info!("loaded {} score records from {}", ledger.records.len(), path.display());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            ledger: Mutex::new(ledger),
            path: Some(path),
            written: Mutex::new(0),
        })
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        // A panic mid-update leaves whole records behind, keep serving them
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// True when [`Scoreboard::save`] writes somewhere
    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }

    /// Fold one finished game into the player's record
    pub fn record_result(&self, user_id: UserId, score: u64, lines_cleared: u32) -> ScoreRecord {
        self.record(user_id, score, lines_cleared, 0)
    }

    /// Fold a [`FinalResult`] into the player's record
    pub fn record_final(&self, result: &FinalResult) -> ScoreRecord {
        self.record(result.user_id, result.score, result.lines_cleared, result.level)
    }

    fn record(&self, user_id: UserId, score: u64, lines_cleared: u32, level: u32) -> ScoreRecord {
        let now = Utc::now();
        let mut ledger = self.ledger();
        let seq = ledger.next_seq;
        ledger.next_seq += 1;

        let record = ledger.records.entry(user_id).or_insert(ScoreRecord {
            user_id,
            high_score: score,
            games_played: 0,
            total_lines: 0,
            best_level: 0,
            achieved: seq,
            achieved_at: Some(now),
        });
        if score > record.high_score {
            record.high_score = score;
            record.achieved = seq;
            record.achieved_at = Some(now);
        }
        record.games_played += 1;
        record.total_lines += lines_cleared as u64;
        record.best_level = record.best_level.max(level);
        let updated = record.clone();
        ledger.version += 1;
        drop(ledger);

        info!(user = %user_id, score, high = updated.high_score, "result recorded");
        updated
    }

    /// Best players first; equal scores ordered by who set theirs first
    pub fn top_scores(&self, limit: usize) -> Vec<ScoreRecord> {
        let ledger = self.ledger();
        let mut records: Vec<_> = ledger.records.values().cloned().collect();
        records.sort_by(|a, b| {
            b.high_score
                .cmp(&a.high_score)
                .then(a.achieved.cmp(&b.achieved))
        });
        records.truncate(limit);
        records
    }

    pub fn stats_for(&self, user_id: UserId) -> Result<ScoreRecord> {
        self.ledger()
            .records
            .get(&user_id)
            .cloned()
            .ok_or(TrisError::NoRecord)
    }

    /// Write all records to the backing file, if any
    ///
    /// Blocking; the ledger is only locked long enough to copy it. A
    /// snapshot older than what is already on disk is skipped.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let (version, snapshot) = {
            let ledger = self.ledger();
            let records: Vec<_> = ledger.records.values().cloned().collect();
            (ledger.version, records)
        };

        let mut written = self.written.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if version <= *written {
            debug!(version, "scores already on disk");
            return Ok(());
        }
        write_records(path, snapshot)?;
        *written = version;
        Ok(())
    }
}

fn write_records(path: &Path, mut records: Vec<ScoreRecord>) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    records.sort_by_key(|r| r.achieved);

    // Write a sibling file then swap it in so readers never see half a table
    let tmp = path.with_extension("jsonl.tmp");
    let mut file = fs::File::create(&tmp)?;
    for record in &records {
        serde_json::to_writer(&mut file, record)?;
        file.write_all(b"\n")?;
    }
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "tris-{}-{}-{}.jsonl",
            name,
            std::process::id(),
            rand::random::<u32>()
        ))
    }

    #[test]
    fn test_record_accumulates() {
        let board = Scoreboard::new();
        board.record_result(UserId(1), 500, 4);
        board.record_result(UserId(1), 300, 2);
        let stats = board.stats_for(UserId(1)).unwrap();
        assert_eq!(stats.high_score, 500);
        assert_eq!(stats.games_played, 2);
        assert_eq!(stats.total_lines, 6);
    }

    #[test]
    fn test_unknown_user_has_no_record() {
        let board = Scoreboard::new();
        assert!(matches!(board.stats_for(UserId(9)), Err(TrisError::NoRecord)));
    }

    #[test]
    fn test_top_scores_order_and_ties() {
        let board = Scoreboard::new();
        board.record_result(UserId(1), 200, 1);
        board.record_result(UserId(2), 900, 8);
        board.record_result(UserId(3), 200, 2);
        board.record_result(UserId(4), 50, 0);

        let top: Vec<_> = board.top_scores(3).iter().map(|r| r.user_id).collect();
        assert_eq!(top, vec![UserId(2), UserId(1), UserId(3)]);
        assert_eq!(board.top_scores(10).len(), 4);
        assert!(board.top_scores(0).is_empty());
    }

    #[test]
    fn test_tie_goes_to_whoever_reached_it_first() {
        let board = Scoreboard::new();
        board.record_result(UserId(1), 100, 1);
        board.record_result(UserId(2), 300, 3);
        // User 1 matches 300 later
        board.record_result(UserId(1), 300, 3);
        let top: Vec<_> = board.top_scores(2).iter().map(|r| r.user_id).collect();
        assert_eq!(top, vec![UserId(2), UserId(1)]);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let board = Arc::new(Scoreboard::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let board = Arc::clone(&board);
                std::thread::spawn(move || {
                    for n in 0..50 {
                        board.record_result(UserId(7), i * 100 + n, 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let stats = board.stats_for(UserId(7)).unwrap();
        assert_eq!(stats.games_played, 400);
        assert_eq!(stats.total_lines, 400);
        assert_eq!(stats.high_score, 749);
    }

    #[test]
    fn test_persists_and_reloads() {
        let path = temp_path("reload");
        {
            let board = Scoreboard::open(&path).unwrap();
            board.record_result(UserId(1), 400, 3);
            board.record_result(UserId(2), 700, 5);
            board.save().unwrap();
        }
        let board = Scoreboard::open(&path).unwrap();
        assert_eq!(board.stats_for(UserId(2)).unwrap().high_score, 700);
        // New records keep ordering after reload
        board.record_result(UserId(3), 400, 1);
        let top: Vec<_> = board.top_scores(3).iter().map(|r| r.user_id).collect();
        assert_eq!(top, vec![UserId(2), UserId(1), UserId(3)]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_recording_leaves_disk_to_save() {
        let path = temp_path("deferred");
        let board = Scoreboard::open(&path).unwrap();
        assert!(board.is_persistent());
        board.record_result(UserId(1), 100, 1);
        assert!(!path.exists());

        board.save().unwrap();
        let first = fs::read_to_string(&path).unwrap();
        assert_eq!(first.lines().count(), 1);

        // Nothing new: the file is left alone
        fs::write(&path, "").unwrap();
        board.save().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");

        board.record_result(UserId(2), 50, 0);
        board.save().unwrap();
        assert_eq!(Scoreboard::open(&path).unwrap().top_scores(10).len(), 2);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_high_score_carries_a_timestamp() {
        let board = Scoreboard::new();
        let before = Utc::now();
        board.record_result(UserId(1), 100, 1);
        let first = board.stats_for(UserId(1)).unwrap().achieved_at.unwrap();
        assert!(first >= before);

        // A lower score keeps the old date
        board.record_result(UserId(1), 10, 0);
        assert_eq!(board.stats_for(UserId(1)).unwrap().achieved_at, Some(first));
    }

    #[test]
    fn test_records_without_timestamp_still_load() {
        let path = temp_path("legacy");
        fs::write(
            &path,
            "{\"user_id\":4,\"high_score\":90,\"games_played\":2,\"total_lines\":3,\"achieved\":0}\n",
        )
        .unwrap();
        let board = Scoreboard::open(&path).unwrap();
        let record = board.stats_for(UserId(4)).unwrap();
        assert_eq!(record.high_score, 90);
        assert_eq!(record.achieved_at, None);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let path = temp_path("corrupt");
        fs::write(&path, "{not json}\n").unwrap();
        assert!(matches!(Scoreboard::open(&path), Err(TrisError::Json(_))));
        let _ = fs::remove_file(&path);
    }
}
