//! Scoring, levels and gravity speed

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lines needed per level
pub const LINES_PER_LEVEL: u32 = 10;
/// Gravity stops speeding up past this level
const MAX_SPEED_LEVEL: u32 = 20;
/// Longest gap between gravity ticks, whatever the tunables say
pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);

/// Point values; line rewards are multiplied by the current level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringTable {
    pub single: u64,
    pub double: u64,
    pub triple: u64,
    pub tetris: u64,
    /// Flat reward per row travelled by a hard drop
    pub hard_drop_per_row: u64,
}

impl Default for ScoringTable {
    fn default() -> Self {
        Self {
            single: 100,
            double: 300,
            triple: 500,
            tetris: 800,
            hard_drop_per_row: 2,
        }
    }
}

impl ScoringTable {
    /// Base reward for clearing `lines` rows in one lock
    pub fn line_reward(&self, lines: u32) -> u64 {
        match lines {
            0 => 0,
            1 => self.single,
            2 => self.double,
            3 => self.triple,
            _ => self.tetris,
        }
    }
}

/// Name of a clear, for the status line
pub fn clear_name(lines: u32) -> Option<&'static str> {
    match lines {
        1 => Some("Single"),
        2 => Some("Double"),
        3 => Some("Triple"),
        4 => Some("Tetris"),
        _ => None,
    }
}

/// Gravity timing, scaled by a speed factor (2.0 falls twice as fast)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub base_interval: Duration,
    pub min_interval: Duration,
    pub speed_factor: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(1),
            min_interval: Duration::from_millis(50),
            speed_factor: 1.0,
        }
    }
}

impl Timing {
    /// Interval between gravity ticks at `level`
    pub fn interval(&self, level: u32) -> Duration {
        // Tetris Guideline gravity curve: level 1 is one row per base interval
        let level = level.clamp(1, MAX_SPEED_LEVEL) as f64;
        let curve = (0.8 - ((level - 1.0) * 0.007)).powf(level - 1.0);
        let secs = self.base_interval.as_secs_f64() * curve / self.speed_factor;
        Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_INTERVAL)
            .max(self.min_interval)
            .min(MAX_INTERVAL)
    }
}

/// Score tracking for one game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    /// Current score
    pub points: u64,
    /// Current level
    pub level: u32,
    /// Total lines cleared
    pub lines: u32,
    table: ScoringTable,
}

impl Default for Score {
    fn default() -> Self {
        Self::new(ScoringTable::default())
    }
}

impl Score {
    pub fn new(table: ScoringTable) -> Self {
        Self {
            points: 0,
            level: 1,
            lines: 0,
            table,
        }
    }

    /// Add the reward for `lines` rows cleared by one lock and update the
    /// level. Returns the points awarded
    pub fn add_clear(&mut self, lines: u32) -> u64 {
        // Reward uses the level the clear happened on
        let reward = self.table.line_reward(lines) * self.level as u64;
        self.points += reward;
        self.lines += lines;
        self.level = 1 + self.lines / LINES_PER_LEVEL;
        reward
    }

    /// Add score for a hard drop
    pub fn add_hard_drop(&mut self, cells: u32) {
        self.points += cells as u64 * self.table.hard_drop_per_row;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_clear() {
        let mut score = Score::default();
        assert_eq!(score.add_clear(1), 100);
        assert_eq!(score.points, 100);
        assert_eq!(score.lines, 1);
    }

    #[test]
    fn test_tetris_beats_two_singles() {
        let mut quad = Score::default();
        quad.add_clear(4);

        let mut singles = Score::default();
        singles.add_clear(1);
        singles.add_clear(1);

        assert!(quad.points > singles.points);
        assert_eq!(quad.points, 800);
        assert_eq!(singles.points, 200);
    }

    #[test]
    fn test_rewards_are_super_linear() {
        let table = ScoringTable::default();
        for lines in 1..4 {
            let per_line_now = table.line_reward(lines) as f64 / lines as f64;
            let per_line_next = table.line_reward(lines + 1) as f64 / (lines + 1) as f64;
            assert!(per_line_next > per_line_now);
        }
    }

    #[test]
    fn test_level_up() {
        let mut score = Score::default();
        for _ in 0..10 {
            score.add_clear(1);
        }
        assert_eq!(score.level, 2);
        // Rewarded at the new level
        assert_eq!(score.add_clear(1), 200);
    }

    #[test]
    fn test_hard_drop_bonus() {
        let mut score = Score::default();
        score.add_hard_drop(20);
        assert_eq!(score.points, 40);
        assert_eq!(score.lines, 0);
    }

    #[test]
    fn test_interval_shrinks_with_level_and_is_floored() {
        let timing = Timing::default();
        assert_eq!(timing.interval(1), Duration::from_secs(1));
        let mut last = timing.interval(1);
        for level in 2..=30 {
            let next = timing.interval(level);
            assert!(next <= last, "level {level}");
            assert!(next >= timing.min_interval);
            last = next;
        }
        assert_eq!(timing.interval(30), timing.min_interval);
    }

    #[test]
    fn test_speed_factor_scales_interval() {
        let timing = Timing {
            speed_factor: 2.0,
            ..Timing::default()
        };
        assert_eq!(timing.interval(1), Duration::from_millis(500));
    }

    #[test]
    fn test_extreme_factors_stay_within_bounds() {
        let crawl = Timing {
            speed_factor: 1e-20,
            ..Timing::default()
        };
        assert_eq!(crawl.interval(1), MAX_INTERVAL);
        let broken = Timing {
            speed_factor: f64::NAN,
            ..Timing::default()
        };
        assert_eq!(broken.interval(1), MAX_INTERVAL);
        let blur = Timing {
            speed_factor: 1e20,
            ..Timing::default()
        };
        assert_eq!(blur.interval(1), blur.min_interval);
    }
}
