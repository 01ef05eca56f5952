//! Settings persistence using TOML
//!
//! Stores settings in ~/.config/tris/settings.toml (or platform equivalent)

use crate::error::{Result, TrisError};
use crate::game::GameConfig;
use crate::score::{ScoringTable, Timing};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Gravity speed
    pub speed: SpeedSettings,
    /// Point values
    pub scoring: ScoringTable,
    /// Where finished games are kept
    pub storage: StorageSettings,
}

/// Gravity speed settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedSettings {
    /// Default speed factor when no scope overrides it (2.0 = twice as fast)
    pub factor: f64,
    /// Tick interval at level 1 and factor 1.0
    pub base_interval_ms: u64,
    /// Fastest allowed tick interval
    pub min_interval_ms: u64,
}

/// Storage settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// JSON-lines score file; the platform data dir is used when unset
    pub scores_file: Option<PathBuf>,
}

impl Default for SpeedSettings {
    fn default() -> Self {
        Self {
            factor: 1.0,
            base_interval_ms: 1000,
            min_interval_ms: 50,
        }
    }
}

/// Slowest accepted speed factor
pub const MIN_SPEED_FACTOR: f64 = 0.1;
/// Fastest accepted speed factor
pub const MAX_SPEED_FACTOR: f64 = 100.0;

/// Reject speed factors outside [`MIN_SPEED_FACTOR`, `MAX_SPEED_FACTOR`]
pub fn validate_speed(factor: f64) -> Result<f64> {
    if (MIN_SPEED_FACTOR..=MAX_SPEED_FACTOR).contains(&factor) {
        Ok(factor)
    } else {
        Err(TrisError::InvalidSpeed(factor))
    }
}

impl Settings {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "tris", "tris")
    }

    /// Get the settings file path
    fn settings_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("settings.toml"))
    }

    /// Load settings from the platform config dir, or use defaults
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::debug!("using default settings ({}): {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load settings from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(contents)?;
        validate_speed(settings.speed.factor)?;
        Ok(settings)
    }

    /// Save settings to the platform config dir
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::settings_path() else {
            return Err(TrisError::Io(std::io::Error::other(
                "could not determine config directory",
            )));
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| TrisError::Io(std::io::Error::other(e.to_string())))?;
        fs::write(&path, contents)?;
        Ok(())
    }

    /// Score file location: configured path, else the platform data dir
    pub fn scores_path(&self) -> Option<PathBuf> {
        self.storage.scores_file.clone().or_else(|| {
            Self::project_dirs().map(|dirs| dirs.data_dir().join("scores.jsonl"))
        })
    }

    /// Game tunables for a new session at `speed_factor`
    pub fn game_config(&self, speed_factor: f64) -> GameConfig {
        GameConfig {
            scoring: self.scoring,
            timing: Timing {
                base_interval: Duration::from_millis(self.speed.base_interval_ms),
                min_interval: Duration::from_millis(self.speed.min_interval_ms),
                speed_factor,
            },
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            [speed]
            factor = 1.5

            [scoring]
            tetris = 1200
            "#,
        )
        .unwrap();
        assert_eq!(settings.speed.factor, 1.5);
        assert_eq!(settings.speed.base_interval_ms, 1000);
        assert_eq!(settings.scoring.tetris, 1200);
        assert_eq!(settings.scoring.single, 100);
        assert_eq!(settings.storage.scores_file, None);
    }

    #[test]
    fn test_rejects_bad_speed() {
        assert!(matches!(
            Settings::from_toml("[speed]\nfactor = 0.0\n"),
            Err(TrisError::InvalidSpeed(_))
        ));
        assert!(matches!(
            Settings::from_toml("[speed]\nfactor = \"fast\"\n"),
            Err(TrisError::Config(_))
        ));
    }

    #[test]
    fn test_speed_factor_range() {
        for bad in [1e-20, 0.05, 100.5, 1e300, f64::NAN, f64::INFINITY, -2.0] {
            assert!(
                matches!(validate_speed(bad), Err(TrisError::InvalidSpeed(_))),
                "{bad}"
            );
        }
        for good in [MIN_SPEED_FACTOR, 0.5, 1.0, 7.0, MAX_SPEED_FACTOR] {
            assert_eq!(validate_speed(good).unwrap(), good);
        }
    }

    #[test]
    fn test_round_trips_through_toml() {
        let mut settings = Settings::default();
        settings.speed.factor = 3.0;
        settings.storage.scores_file = Some(PathBuf::from("/tmp/scores.jsonl"));
        let text = toml::to_string_pretty(&settings).unwrap();
        assert_eq!(Settings::from_toml(&text).unwrap(), settings);
    }

    #[test]
    fn test_game_config_uses_timing() {
        let mut settings = Settings::default();
        settings.speed.base_interval_ms = 800;
        let config = settings.game_config(2.0);
        assert_eq!(config.timing.interval(1), Duration::from_millis(400));
        assert_eq!(config.scoring, ScoringTable::default());
    }
}
