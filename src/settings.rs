use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    str::FromStr,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    events::{AppEvent, EventBus},
    models::UnitPreference,
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(rename = "useAI")]
    pub use_ai: bool,
    pub show_grid: bool,
    pub auto_save: bool,
    pub voice_guidance: bool,
    pub unit: UnitPreference,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_ai: true,
            show_grid: true,
            auto_save: false,
            voice_guidance: false,
            unit: UnitPreference::Metric,
        }
    }
}

/// Boolean toggles addressable by name from the settings screen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SettingKey {
    #[serde(rename = "useAI")]
    UseAi,
    ShowGrid,
    AutoSave,
    VoiceGuidance,
}

impl SettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::UseAi => "useAI",
            SettingKey::ShowGrid => "showGrid",
            SettingKey::AutoSave => "autoSave",
            SettingKey::VoiceGuidance => "voiceGuidance",
        }
    }

    fn slot(self, settings: &mut Settings) -> &mut bool {
        match self {
            SettingKey::UseAi => &mut settings.use_ai,
            SettingKey::ShowGrid => &mut settings.show_grid,
            SettingKey::AutoSave => &mut settings.auto_save,
            SettingKey::VoiceGuidance => &mut settings.voice_guidance,
        }
    }
}

impl FromStr for SettingKey {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "useAI" | "useAi" => Ok(SettingKey::UseAi),
            "showGrid" => Ok(SettingKey::ShowGrid),
            "autoSave" => Ok(SettingKey::AutoSave),
            "voiceGuidance" => Ok(SettingKey::VoiceGuidance),
            other => Err(anyhow!("unknown setting '{other}'")),
        }
    }
}

/// User toggles and unit preference, persisted as JSON when backed by a file.
pub struct SettingsStore {
    path: Option<PathBuf>,
    data: RwLock<Settings>,
    events: EventBus,
}

impl SettingsStore {
    pub fn new(path: PathBuf, events: EventBus) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!(
                    "Ignoring unreadable settings at {}: {err}",
                    path.display()
                );
                Settings::default()
            })
        } else {
            Settings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
            events,
        })
    }

    pub fn in_memory(events: EventBus) -> Self {
        Self {
            path: None,
            data: RwLock::new(Settings::default()),
            events,
        }
    }

    pub fn settings(&self) -> Settings {
        self.read().clone()
    }

    /// Flip one toggle and return its new value.
    pub fn toggle(&self, key: SettingKey) -> Result<bool> {
        let (value, snapshot) = {
            let mut guard = self.write();
            let mut next = guard.clone();
            let slot = key.slot(&mut next);
            *slot = !*slot;
            let value = *slot;
            self.persist(&next)?;
            *guard = next.clone();
            (value, next)
        };

        log_info!("Setting {} is now {}", key.as_str(), value);
        self.events.emit(AppEvent::SettingsChanged { settings: snapshot });
        Ok(value)
    }

    pub fn set_unit(&self, unit: UnitPreference) -> Result<()> {
        let snapshot = {
            let mut guard = self.write();
            let next = Settings {
                unit,
                ..guard.clone()
            };
            self.persist(&next)?;
            *guard = next.clone();
            next
        };

        self.events.emit(AppEvent::SettingsChanged { settings: snapshot });
        Ok(())
    }

    /// Extension point for device calibration. Nothing to calibrate yet.
    pub fn reset_calibration(&self) {
        log_info!("Resetting device calibration...");
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub mod commands {
    use std::str::FromStr;

    use super::{SettingKey, Settings};
    use crate::{models::UnitPreference, AppState};

    pub fn get_settings(state: &AppState) -> Result<Settings, String> {
        Ok(state.settings.settings())
    }

    pub fn toggle_setting(state: &AppState, key: String) -> Result<bool, String> {
        let key = SettingKey::from_str(&key).map_err(|e| e.to_string())?;
        state.settings.toggle(key).map_err(|e| e.to_string())
    }

    pub fn set_measurement_unit(state: &AppState, unit: String) -> Result<(), String> {
        let unit = UnitPreference::from_str(&unit).map_err(|e| e.to_string())?;
        state.settings.set_unit(unit).map_err(|e| e.to_string())
    }

    pub fn reset_calibration(state: &AppState) -> Result<(), String> {
        state.settings.reset_calibration();
        Ok(())
    }
}
