pub mod config;
pub mod db;
pub mod events;
pub mod history;
pub mod models;
pub mod session;
pub mod settings;
pub mod utils;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{broadcast, Mutex};

use config::AppConfig;
use db::Database;
use events::{AppEvent, EventBus};
use history::{DeleteConfirmation, HistoryStore};
use session::{SessionController, SimulatedDetector};
use settings::SettingsStore;

pub use utils::init_logging;

const ENABLE_LOGS: bool = true;

/// Everything the presentation layer talks to.
pub struct AppState {
    pub events: EventBus,
    pub history: HistoryStore,
    pub session: SessionController,
    pub settings: SettingsStore,
    pub(crate) pending_delete: Mutex<Option<DeleteConfirmation>>,
}

impl AppState {
    pub async fn bootstrap(config: AppConfig) -> Result<Self> {
        log_info!("Camera Rulers starting up...");

        let events = EventBus::new();

        let database = match config.database_path() {
            Some(path) => Database::new(path).context("failed to open measurement database")?,
            None => Database::in_memory()?,
        };
        let settings = match config.settings_path() {
            Some(path) => SettingsStore::new(path, events.clone())?,
            None => SettingsStore::in_memory(events.clone()),
        };

        let history = HistoryStore::new(database, events.clone());
        if config.seed_samples {
            history.seed_samples(Utc::now()).await?;
        }

        let session = SessionController::with_timings(
            SimulatedDetector::new(config.processing_delay),
            history.clone(),
            events.clone(),
            config.animations,
        );

        match &config.data_dir {
            Some(dir) => log_info!("Data directory: {}", dir.display()),
            None => log_info!("Running with in-memory storage"),
        }

        Ok(Self {
            events,
            history,
            session,
            settings,
            pending_delete: Mutex::new(None),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }
}
