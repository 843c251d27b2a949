use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rule set determining what the stimulus word represents and what the
/// correct answer is.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
pub enum Variant {
    /// word and ink conflict; answer is the ink color
    Classic,
    /// same stimuli, but the answer is the word
    Reverse,
    /// non-color words; answer is the ink color
    Neutral,
    /// emotionally-valenced words; answer is the ink color
    Emotional,
}

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    pub fn palette_size(&self) -> usize {
        match self {
            Difficulty::Easy => 4,
            Difficulty::Medium => 6,
            Difficulty::Hard => 8,
            Difficulty::Expert => 10,
        }
    }

    /// Per-trial response window for this difficulty.
    pub fn default_timeout(&self) -> Duration {
        let ms = match self {
            Difficulty::Easy => 3000,
            Difficulty::Medium => 2500,
            Difficulty::Hard => 2000,
            Difficulty::Expert => 1500,
        };
        Duration::from_millis(ms)
    }
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Variant::Classic,
        Variant::Reverse,
        Variant::Neutral,
        Variant::Emotional,
    ];
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("trial count must be greater than zero")]
    ZeroTrials,
    #[error("per-trial timeout must be greater than zero")]
    ZeroTimeout,
    #[error("congruent ratio {0} is outside [0, 1]")]
    RatioOutOfRange(f64),
}

/// Parameters of a single test session. Immutable once the session starts;
/// the engine takes it by value.
#[derive(Debug, Clone, PartialEq)]
pub struct TestConfiguration {
    pub variant: Variant,
    pub difficulty: Difficulty,
    pub trials: usize,
    pub timeout: Duration,
    /// Chance that a Classic/Reverse trial is congruent (word == ink).
    pub congruent_ratio: f64,
}

impl TestConfiguration {
    pub const DEFAULT_TRIALS: usize = 20;
    pub const DEFAULT_CONGRUENT_RATIO: f64 = 0.5;

    pub fn new(variant: Variant, difficulty: Difficulty) -> Self {
        Self {
            variant,
            difficulty,
            trials: Self::DEFAULT_TRIALS,
            timeout: difficulty.default_timeout(),
            congruent_ratio: Self::DEFAULT_CONGRUENT_RATIO,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials == 0 {
            return Err(ConfigError::ZeroTrials);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if !(0.0..=1.0).contains(&self.congruent_ratio) {
            return Err(ConfigError::RatioOutOfRange(self.congruent_ratio));
        }
        Ok(())
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// Last-used settings, pre-filled into the setup screen on the next launch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    pub user: String,
    pub variant: Variant,
    pub difficulty: Difficulty,
    pub trials: usize,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            user: String::new(),
            variant: Variant::Classic,
            difficulty: Difficulty::Easy,
            trials: TestConfiguration::DEFAULT_TRIALS,
        }
    }
}

pub trait PreferencesStore {
    fn load(&self) -> Preferences;
    fn save(&self, prefs: &Preferences) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FilePreferencesStore {
    path: PathBuf,
}

impl FilePreferencesStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = crate::app_dirs::AppDirs::preferences_path()
            .unwrap_or_else(|| PathBuf::from("stroop_preferences.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FilePreferencesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferencesStore for FilePreferencesStore {
    fn load(&self) -> Preferences {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(prefs) = serde_json::from_slice::<Preferences>(&bytes) {
                return prefs;
            }
        }
        Preferences::default()
    }

    fn save(&self, prefs: &Preferences) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(prefs).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
