use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::models::{Measurement, MeasurementUnit, Point};

use super::capture::CaptureError;

/// Transient state of the measurement screen. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub points: Vec<Point>,
    pub active_measurement: Option<Measurement>,
    pub is_processing: bool,
    pub current_unit: MeasurementUnit,
    /// Present exactly while `is_processing` is set.
    #[serde(skip)]
    pub capture_token: Option<CancellationToken>,
    /// Bumped by every `clear_points`.
    #[serde(skip)]
    clear_epoch: u64,
}

/// What a capture works from, taken when processing starts.
#[derive(Debug, Clone)]
pub struct CaptureSnapshot {
    pub points: Vec<Point>,
    pub unit: MeasurementUnit,
    pub token: CancellationToken,
    clear_epoch: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tapped point and return the new point count.
    pub fn add_point(&mut self, point: Point) -> usize {
        self.points.push(point);
        self.points.len()
    }

    pub fn clear_points(&mut self) {
        self.points.clear();
        self.clear_epoch = self.clear_epoch.wrapping_add(1);
    }

    pub fn begin_capture(&mut self) -> Result<CaptureSnapshot, CaptureError> {
        if self.is_processing {
            return Err(CaptureError::AlreadyProcessing);
        }

        let token = CancellationToken::new();
        self.is_processing = true;
        self.capture_token = Some(token.clone());

        Ok(CaptureSnapshot {
            points: self.points.clone(),
            unit: self.current_unit,
            token,
            clear_epoch: self.clear_epoch,
        })
    }

    /// The new measurement becomes active and the snapshot's points are consumed.
    ///
    /// Points tapped while the capture ran stay. When the list was cleared in
    /// the meantime the snapshot points are already gone. Returns the remaining count.
    pub fn complete_capture(
        &mut self,
        measurement: Measurement,
        snapshot: &CaptureSnapshot,
    ) -> usize {
        if self.clear_epoch == snapshot.clear_epoch {
            let consumed = snapshot.points.len().min(self.points.len());
            self.points.drain(..consumed);
        }
        self.active_measurement = Some(measurement);
        self.end_processing();
        self.points.len()
    }

    /// Drop the in-flight capture, leaving everything else as it was.
    pub fn fail_capture(&mut self) {
        self.end_processing();
    }

    /// Signal the in-flight capture to stop. Returns false when idle.
    pub fn cancel_capture(&self) -> bool {
        match &self.capture_token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Replace the active measurement if it still has the same id.
    pub fn refresh_active(&mut self, measurement: &Measurement) -> bool {
        match &mut self.active_measurement {
            Some(active) if active.id == measurement.id => {
                *active = measurement.clone();
                true
            }
            _ => false,
        }
    }

    /// Clear the active measurement when it is `id`.
    pub fn forget_active(&mut self, id: &str) -> bool {
        if self.active_measurement.as_ref().is_some_and(|m| m.id == id) {
            self.active_measurement = None;
            true
        } else {
            false
        }
    }

    pub fn toggle_unit(&mut self) -> MeasurementUnit {
        self.current_unit = self.current_unit.toggled();
        self.current_unit
    }

    fn end_processing(&mut self) {
        self.is_processing = false;
        self.capture_token = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn measurement(id: &str) -> Measurement {
        Measurement {
            id: id.into(),
            value: 15.2,
            unit: MeasurementUnit::Cm,
            image_uri: Some("file://x.jpg".into()),
            timestamp: Utc::now(),
            label: None,
            object_name: Some("Smartphone".into()),
            object_details: None,
            points: vec![],
        }
    }

    #[test]
    fn point_count_tracks_calls_since_clear() {
        let mut state = SessionState::new();
        assert_eq!(state.add_point(Point::new(1.0, 1.0)), 1);
        assert_eq!(state.add_point(Point::new(2.0, 2.0)), 2);
        state.clear_points();
        assert_eq!(state.add_point(Point::new(3.0, 3.0)), 1);
    }

    #[test]
    fn second_capture_is_rejected_while_processing() {
        let mut state = SessionState::new();
        state.add_point(Point::new(1.0, 1.0));
        let snapshot = state.begin_capture().unwrap();
        assert_eq!(snapshot.points.len(), 1);
        assert!(state.is_processing);
        assert!(matches!(
            state.begin_capture(),
            Err(CaptureError::AlreadyProcessing)
        ));
    }

    #[test]
    fn completion_sets_active_and_resets_points() {
        let mut state = SessionState::new();
        state.add_point(Point::new(1.0, 1.0));
        let snapshot = state.begin_capture().unwrap();
        assert_eq!(state.complete_capture(measurement("m1"), &snapshot), 0);

        assert!(!state.is_processing);
        assert!(state.capture_token.is_none());
        assert!(state.points.is_empty());
        assert_eq!(state.active_measurement.unwrap().id, "m1");
    }

    #[test]
    fn taps_during_capture_are_kept() {
        let mut state = SessionState::new();
        state.add_point(Point::new(1.0, 1.0));
        state.add_point(Point::new(2.0, 2.0));
        let snapshot = state.begin_capture().unwrap();
        state.add_point(Point::new(7.0, 7.0));

        assert_eq!(state.complete_capture(measurement("m1"), &snapshot), 1);
        assert_eq!(state.points, vec![Point::new(7.0, 7.0)]);
    }

    #[test]
    fn clear_during_capture_protects_later_taps() {
        let mut state = SessionState::new();
        state.add_point(Point::new(1.0, 1.0));
        let snapshot = state.begin_capture().unwrap();
        state.clear_points();
        state.add_point(Point::new(8.0, 8.0));

        assert_eq!(state.complete_capture(measurement("m1"), &snapshot), 1);
        assert_eq!(state.points, vec![Point::new(8.0, 8.0)]);
    }

    #[test]
    fn failure_leaves_points_and_active_alone() {
        let mut state = SessionState::new();
        state.active_measurement = Some(measurement("old"));
        state.add_point(Point::new(1.0, 1.0));
        state.begin_capture().unwrap();
        state.fail_capture();

        assert!(!state.is_processing);
        assert_eq!(state.points.len(), 1);
        assert_eq!(state.active_measurement.unwrap().id, "old");
    }

    #[test]
    fn cancel_signals_the_snapshot_token() {
        let mut state = SessionState::new();
        assert!(!state.cancel_capture());
        let snapshot = state.begin_capture().unwrap();
        assert!(state.cancel_capture());
        assert!(snapshot.token.is_cancelled());
    }

    #[test]
    fn forget_only_matches_the_active_id() {
        let mut state = SessionState::new();
        state.active_measurement = Some(measurement("m1"));
        assert!(!state.forget_active("other"));
        assert!(state.active_measurement.is_some());
        assert!(state.forget_active("m1"));
        assert!(state.active_measurement.is_none());
    }

    #[test]
    fn toggle_unit_twice_restores_original() {
        let mut state = SessionState::new();
        let original = state.current_unit;
        assert_eq!(state.toggle_unit(), MeasurementUnit::In);
        assert_eq!(state.toggle_unit(), original);
    }
}
