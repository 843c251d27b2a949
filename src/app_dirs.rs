use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn profiles_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "stroop").map(|pd| pd.data_dir().join("profiles.json"))
    }

    pub fn preferences_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "stroop").map(|pd| pd.config_dir().join("preferences.json"))
    }

    /// Where per-trial CSV exports land.
    pub fn export_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "stroop").map(|pd| pd.data_dir().join("exports"))
    }
}
