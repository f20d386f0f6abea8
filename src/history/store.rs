use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use crate::{
    db::Database,
    events::{AppEvent, EventBus},
    models::{Measurement, MeasurementUnit},
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const DELETE_PROMPT_TITLE: &str = "Delete Measurement";
pub const DELETE_PROMPT_MESSAGE: &str = "Are you sure you want to delete this measurement?";

/// Proof that the user was asked before a history entry is removed.
///
/// Only `HistoryStore::request_delete` creates one and resolving it consumes it.
#[derive(Debug)]
#[must_use = "a delete request does nothing until it is resolved"]
pub struct DeleteConfirmation {
    id: String,
}

impl DeleteConfirmation {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &'static str {
        DELETE_PROMPT_TITLE
    }

    pub fn message(&self) -> &'static str {
        DELETE_PROMPT_MESSAGE
    }
}

/// The saved measurements, newest first.
///
/// The one collection both the capture flow and the history screen read and write.
#[derive(Clone)]
pub struct HistoryStore {
    db: Database,
    events: EventBus,
}

impl HistoryStore {
    pub fn new(db: Database, events: EventBus) -> Self {
        Self { db, events }
    }

    pub async fn list(&self) -> Result<Vec<Measurement>> {
        self.db.list_measurements().await
    }

    /// Case-insensitive substring match on the label. Blank queries match everything.
    pub async fn search(&self, query: &str) -> Result<Vec<Measurement>> {
        let needle = query.trim().to_lowercase();
        let all = self.list().await?;
        if needle.is_empty() {
            return Ok(all);
        }

        Ok(all
            .into_iter()
            .filter(|m| {
                m.label
                    .as_deref()
                    .is_some_and(|label| label.to_lowercase().contains(&needle))
            })
            .collect())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Measurement>> {
        self.db.get_measurement(id).await
    }

    pub async fn len(&self) -> Result<usize> {
        self.db.count_measurements().await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    pub async fn add(&self, measurement: &Measurement) -> Result<()> {
        self.db.insert_measurement(measurement).await?;
        log_info!("Saved measurement {} ({})", measurement.id, measurement.display_value());
        Ok(())
    }

    /// Returns false when `measurement` is no longer in history.
    pub async fn update(&self, measurement: &Measurement) -> Result<bool> {
        self.db.update_measurement(measurement).await
    }

    /// Ask the presentation layer to confirm removal of `id`.
    pub fn request_delete(&self, id: impl Into<String>) -> DeleteConfirmation {
        let id = id.into();
        self.events.emit(AppEvent::DeleteRequested { id: id.clone() });
        DeleteConfirmation { id }
    }

    /// Apply the user's answer. Returns whether an entry was removed.
    pub async fn resolve_delete(
        &self,
        confirmation: DeleteConfirmation,
        confirmed: bool,
    ) -> Result<bool> {
        if !confirmed {
            log_info!("Delete of {} cancelled", confirmation.id);
            return Ok(false);
        }
        self.remove(&confirmation.id).await
    }

    /// Remove without prompting. Unknown ids are a no-op.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let removed = self.db.delete_measurement(id).await?;
        if removed {
            log_info!("Deleted measurement {id}");
            self.events.emit(AppEvent::MeasurementDeleted { id: id.to_string() });
        } else {
            log_warn!("Delete requested for unknown measurement {id}");
        }
        Ok(removed)
    }

    /// Insert the demo entries when the history is empty. Returns how many were added.
    pub async fn seed_samples(&self, now: DateTime<Utc>) -> Result<usize> {
        if !self.is_empty().await? {
            return Ok(0);
        }

        let samples = sample_measurements(now);
        // Oldest first so the newest sample lists on top.
        for sample in samples.iter().rev() {
            self.db.insert_measurement(sample).await?;
        }
        log_info!("Seeded {} sample measurements", samples.len());
        Ok(samples.len())
    }
}

fn sample_measurements(now: DateTime<Utc>) -> Vec<Measurement> {
    let sample = |id: &str, value, unit, age: Duration, label: &str, name: &str, details: &str| {
        Measurement {
            id: id.to_string(),
            value,
            unit,
            image_uri: None,
            timestamp: now - age,
            label: Some(label.to_string()),
            object_name: Some(name.to_string()),
            object_details: Some(details.to_string()),
            points: Vec::new(),
        }
    };

    vec![
        sample(
            "meas-1",
            12.5,
            MeasurementUnit::Cm,
            Duration::hours(1),
            "Coffee Table",
            "Table",
            "Wooden coffee table, rectangular shape",
        ),
        sample(
            "meas-2",
            6.2,
            MeasurementUnit::In,
            Duration::days(1),
            "Book Width",
            "Book",
            "Hardcover book, medium size",
        ),
        sample(
            "meas-3",
            155.3,
            MeasurementUnit::Cm,
            Duration::days(2),
            "Wall Length",
            "Wall",
            "Living room east wall, white paint",
        ),
    ]
}
