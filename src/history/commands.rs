use chrono::Local;
use serde::Serialize;

use crate::{models::Measurement, utils::format_timestamp_ms, AppState};

/// Row model for the history list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub measurement: Measurement,
    pub display_value: String,
    pub display_date: String,
}

impl HistoryEntry {
    fn from_measurement(measurement: Measurement, now: &chrono::DateTime<Local>) -> Self {
        Self {
            display_value: measurement.display_value(),
            display_date: format_timestamp_ms(measurement.timestamp.timestamp_millis(), now),
            measurement,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePrompt {
    pub id: String,
    pub title: String,
    pub message: String,
}

pub async fn list_history(state: &AppState, query: Option<String>) -> Result<Vec<HistoryEntry>, String> {
    let measurements = match query {
        Some(query) => state.history.search(&query).await,
        None => state.history.list().await,
    }
    .map_err(|e| e.to_string())?;

    let now = Local::now();
    Ok(measurements
        .into_iter()
        .map(|m| HistoryEntry::from_measurement(m, &now))
        .collect())
}

/// Open the delete confirmation. Replaces any prompt still waiting for an answer.
pub async fn request_delete_measurement(state: &AppState, id: String) -> Result<DeletePrompt, String> {
    let confirmation = state.history.request_delete(id);
    let prompt = DeletePrompt {
        id: confirmation.id().to_string(),
        title: confirmation.title().to_string(),
        message: confirmation.message().to_string(),
    };
    *state.pending_delete.lock().await = Some(confirmation);
    Ok(prompt)
}

/// Answer the open delete confirmation. Returns whether an entry was removed.
pub async fn resolve_delete_measurement(state: &AppState, confirmed: bool) -> Result<bool, String> {
    let confirmation = state
        .pending_delete
        .lock()
        .await
        .take()
        .ok_or_else(|| "no delete confirmation is pending".to_string())?;
    let id = confirmation.id().to_string();

    let removed = state
        .history
        .resolve_delete(confirmation, confirmed)
        .await
        .map_err(|e| e.to_string())?;

    if removed {
        state.session.forget_active(&id).await;
    }
    Ok(removed)
}
