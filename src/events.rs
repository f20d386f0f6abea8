//! Change notifications published to the presentation layer.
//!
//! Stores publish; the UI subscribes and re-renders. Animation progress is owned
//! by the subscriber: `LineAnimation` and `ResultReady` carry the duration to
//! animate from 0 to 1, `PointsCleared` resets both progress values to 0.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::{
    models::{Measurement, MeasurementUnit},
    settings::Settings,
};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AppEvent {
    #[serde(rename_all = "camelCase")]
    PointsChanged { point_count: usize },
    #[serde(rename_all = "camelCase")]
    LineAnimation { duration_ms: u64 },
    PointsCleared,
    #[serde(rename_all = "camelCase")]
    ProcessingChanged { is_processing: bool },
    #[serde(rename_all = "camelCase")]
    ResultReady {
        measurement: Measurement,
        reveal_ms: u64,
    },
    CaptureFailed { message: String },
    MeasurementUpdated { measurement: Measurement },
    MeasurementDeleted { id: String },
    DeleteRequested { id: String },
    UnitChanged { unit: MeasurementUnit },
    SettingsChanged { settings: Settings },
}

impl AppEvent {
    /// Stable event name, matching the `type` tag on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::PointsChanged { .. } => "pointsChanged",
            AppEvent::LineAnimation { .. } => "lineAnimation",
            AppEvent::PointsCleared => "pointsCleared",
            AppEvent::ProcessingChanged { .. } => "processingChanged",
            AppEvent::ResultReady { .. } => "resultReady",
            AppEvent::CaptureFailed { .. } => "captureFailed",
            AppEvent::MeasurementUpdated { .. } => "measurementUpdated",
            AppEvent::MeasurementDeleted { .. } => "measurementDeleted",
            AppEvent::DeleteRequested { .. } => "deleteRequested",
            AppEvent::UnitChanged { .. } => "unitChanged",
            AppEvent::SettingsChanged { .. } => "settingsChanged",
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers. Having none is not an error.
    pub fn emit(&self, event: AppEvent) {
        log::trace!("emit {}", event.name());
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
pub(crate) fn drain(rx: &mut broadcast::Receiver<AppEvent>) -> Vec<AppEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
