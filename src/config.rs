use std::{path::PathBuf, time::Duration};

use crate::session::{detector::DEFAULT_PROCESSING_DELAY, AnimationTimings};

const DB_FILE_NAME: &str = "camera_rulers.sqlite3";
const SETTINGS_FILE_NAME: &str = "settings.json";

/// Startup configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Where the database and settings live. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    pub processing_delay: Duration,
    pub animations: AnimationTimings,
    /// Fill an empty history with demo entries.
    pub seed_samples: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            processing_delay: DEFAULT_PROCESSING_DELAY,
            animations: AnimationTimings::default(),
            seed_samples: false,
        }
    }
}

impl AppConfig {
    /// Reads `CAMERA_RULERS_DATA_DIR`, `CAMERA_RULERS_SEED_SAMPLES` and `CAMERA_RULERS_FAST`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| {
            lookup(key)
                .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };

        let mut config = Self::default();
        config.data_dir = lookup("CAMERA_RULERS_DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);
        config.seed_samples = flag("CAMERA_RULERS_SEED_SAMPLES");
        if flag("CAMERA_RULERS_FAST") {
            config.processing_delay = Duration::ZERO;
        }
        config
    }

    pub fn database_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(DB_FILE_NAME))
    }

    pub fn settings_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(SETTINGS_FILE_NAME))
    }
}
