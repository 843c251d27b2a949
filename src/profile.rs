use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::summary::SessionSummary;
use crate::util::mean;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("no profile named {0:?}")]
    NotFound(String),
    #[error("profile storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("profile file is not valid json: {0}")]
    Format(#[from] serde_json::Error),
}

/// A named user and their session history, ordered by timestamp. Aggregates
/// are derived on demand; only the history is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub history: Vec<SessionSummary>,
}

impl UserProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            history: Vec::new(),
        }
    }

    /// Append a summary, keeping the history in timestamp order. Prior
    /// entries are never touched.
    pub fn merge(&mut self, summary: SessionSummary) {
        let pos = self
            .history
            .iter()
            .rposition(|s| s.timestamp <= summary.timestamp)
            .map(|i| i + 1)
            .unwrap_or(0);
        self.history.insert(pos, summary);
    }

    pub fn sessions(&self) -> usize {
        self.history.len()
    }

    pub fn best_accuracy(&self) -> Option<f64> {
        self.history
            .iter()
            .map(|s| s.accuracy)
            .max_by(|a, b| a.total_cmp(b))
    }

    pub fn mean_accuracy(&self) -> Option<f64> {
        mean(&self.history.iter().map(|s| s.accuracy).collect::<Vec<_>>())
    }

    pub fn mean_reaction_time_ms(&self) -> Option<f64> {
        mean(
            &self
                .history
                .iter()
                .map(|s| s.mean_reaction_time_ms)
                .collect::<Vec<_>>(),
        )
    }

    /// Most recent sessions first, at most `n` of them.
    pub fn recent(&self, n: usize) -> Vec<&SessionSummary> {
        self.history.iter().rev().take(n).collect()
    }
}

pub trait ProfileStore {
    fn load(&self, name: &str) -> Result<UserProfile, ProfileError>;
    fn save(&self, profile: &UserProfile) -> Result<(), ProfileError>;
    fn user_names(&self) -> Result<Vec<String>, ProfileError>;

    /// Missing profiles are not an error when we are about to write one.
    fn load_or_create(&self, name: &str) -> Result<UserProfile, ProfileError> {
        match self.load(name) {
            Ok(profile) => Ok(profile),
            Err(ProfileError::NotFound(_)) => Ok(UserProfile::new(name)),
            Err(e) => Err(e),
        }
    }
}

/// History list as stored on disk; the user name is the document key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileRecord {
    history: Vec<SessionSummary>,
}

/// Whole-document JSON store mapping user name to profile record.
/// Single-writer, last-write-wins: every save is a read-modify-write of the
/// full document. No locking, no multi-process guarantees.
#[derive(Debug, Clone)]
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = crate::app_dirs::AppDirs::profiles_path()
            .unwrap_or_else(|| PathBuf::from("stroop_profiles.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    fn read_document(&self) -> Result<BTreeMap<String, ProfileRecord>, ProfileError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for JsonProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileStore for JsonProfileStore {
    fn load(&self, name: &str) -> Result<UserProfile, ProfileError> {
        let mut document = self.read_document()?;
        match document.remove(name) {
            Some(record) => Ok(UserProfile {
                name: name.to_string(),
                history: record.history,
            }),
            None => Err(ProfileError::NotFound(name.to_string())),
        }
    }

    fn save(&self, profile: &UserProfile) -> Result<(), ProfileError> {
        let mut document = self.read_document()?;
        document.insert(
            profile.name.clone(),
            ProfileRecord {
                history: profile.history.clone(),
            },
        );

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&document)?;
        fs::write(&self.path, data)?;
        Ok(())
    }

    fn user_names(&self) -> Result<Vec<String>, ProfileError> {
        Ok(self.read_document()?.into_keys().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Difficulty, Variant};
    use chrono::{Duration, Local};
    use tempfile::tempdir;

    fn summary(accuracy: f64, offset_secs: i64) -> SessionSummary {
        SessionSummary {
            timestamp: Local::now() + Duration::seconds(offset_secs),
            variant: Variant::Classic,
            difficulty: Difficulty::Easy,
            accuracy,
            mean_reaction_time_ms: 800.0,
        }
    }

    #[test]
    fn merge_appends_in_timestamp_order() {
        let mut profile = UserProfile::new("ada");
        profile.merge(summary(80.0, 0));
        profile.merge(summary(90.0, 10));
        assert_eq!(profile.sessions(), 2);
        assert_eq!(profile.history[0].accuracy, 80.0);
        assert_eq!(profile.history[1].accuracy, 90.0);
    }

    #[test]
    fn merge_places_out_of_order_summary_by_timestamp() {
        let mut profile = UserProfile::new("ada");
        profile.merge(summary(80.0, 10));
        let early = summary(60.0, -10);
        profile.merge(early.clone());

        assert_eq!(profile.history[0], early);
        assert_eq!(profile.history[1].accuracy, 80.0);
    }

    #[test]
    fn aggregates_are_derived_from_history() {
        let mut profile = UserProfile::new("ada");
        assert_eq!(profile.best_accuracy(), None);
        assert_eq!(profile.mean_accuracy(), None);

        profile.merge(summary(70.0, 0));
        profile.merge(summary(90.0, 1));

        assert_eq!(profile.best_accuracy(), Some(90.0));
        assert_eq!(profile.mean_accuracy(), Some(80.0));
        assert_eq!(profile.mean_reaction_time_ms(), Some(800.0));
    }

    #[test]
    fn recent_lists_newest_first() {
        let mut profile = UserProfile::new("ada");
        profile.merge(summary(60.0, 0));
        profile.merge(summary(70.0, 1));
        profile.merge(summary(80.0, 2));

        let recent = profile.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].accuracy, 80.0);
        assert_eq!(recent[1].accuracy, 70.0);
    }

    #[test]
    fn load_missing_profile_is_not_found() {
        let dir = tempdir().unwrap();
        let store = JsonProfileStore::with_path(dir.path().join("profiles.json"));

        let err = store.load("ghost").unwrap_err();
        assert!(matches!(err, ProfileError::NotFound(name) if name == "ghost"));
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempdir().unwrap();
        let store = JsonProfileStore::with_path(dir.path().join("profiles.json"));

        let mut profile = UserProfile::new("ada");
        profile.merge(summary(100.0, 0));
        store.save(&profile).unwrap();

        let loaded = store.load("ada").unwrap();
        assert_eq!(loaded, profile);
    }

    #[test]
    fn save_preserves_other_users() {
        let dir = tempdir().unwrap();
        let store = JsonProfileStore::with_path(dir.path().join("profiles.json"));

        store.save(&UserProfile::new("ada")).unwrap();
        store.save(&UserProfile::new("bob")).unwrap();

        assert_eq!(store.user_names().unwrap(), vec!["ada", "bob"]);
        assert!(store.load("ada").is_ok());
    }

    #[test]
    fn load_or_create_returns_empty_profile_for_new_user() {
        let dir = tempdir().unwrap();
        let store = JsonProfileStore::with_path(dir.path().join("profiles.json"));

        let profile = store.load_or_create("new").unwrap();
        assert_eq!(profile.name, "new");
        assert!(profile.history.is_empty());
    }

    #[test]
    fn corrupt_document_is_a_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::write(&path, b"not json").unwrap();
        let store = JsonProfileStore::with_path(&path);

        assert!(matches!(
            store.load("ada").unwrap_err(),
            ProfileError::Format(_)
        ));
    }
}
