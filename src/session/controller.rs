use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::sync::Mutex;

use crate::{
    events::{AppEvent, EventBus},
    history::HistoryStore,
    models::{Measurement, MeasurementPatch, MeasurementUnit, Point},
    utils::{generate_id, now_millis},
};

use super::{
    capture::{CameraDevice, CaptureError, CapturedPhoto},
    detector::{DetectionRequest, MeasurementDetector, SimulatedDetector},
    state::{CaptureSnapshot, SessionState},
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub const LINE_ANIMATION: Duration = Duration::from_millis(400);
pub const RESULT_REVEAL: Duration = Duration::from_millis(500);

/// Durations handed to the presentation layer with animation events.
#[derive(Debug, Clone, Copy)]
pub struct AnimationTimings {
    pub line_animation: Duration,
    pub result_reveal: Duration,
}

impl Default for AnimationTimings {
    fn default() -> Self {
        Self {
            line_animation: LINE_ANIMATION,
            result_reveal: RESULT_REVEAL,
        }
    }
}

/// Owns the measurement session and runs captures against a detector.
///
/// Clones share the same session. The state lock is never held while the
/// camera, detector or database is awaited.
pub struct SessionController<D = SimulatedDetector> {
    state: Arc<Mutex<SessionState>>,
    detector: Arc<D>,
    history: HistoryStore,
    events: EventBus,
    timings: AnimationTimings,
}

impl<D> Clone for SessionController<D> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            detector: self.detector.clone(),
            history: self.history.clone(),
            events: self.events.clone(),
            timings: self.timings,
        }
    }
}

impl<D: MeasurementDetector> SessionController<D> {
    pub fn new(detector: D, history: HistoryStore, events: EventBus) -> Self {
        Self::with_timings(detector, history, events, AnimationTimings::default())
    }

    pub fn with_timings(
        detector: D,
        history: HistoryStore,
        events: EventBus,
        timings: AnimationTimings,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            detector: Arc::new(detector),
            history,
            events,
            timings,
        }
    }

    pub async fn get_state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn add_point(&self, point: Point) -> usize {
        let point_count = self.state.lock().await.add_point(point);

        self.events.emit(AppEvent::PointsChanged { point_count });
        if point_count >= 2 {
            self.events.emit(AppEvent::LineAnimation {
                duration_ms: duration_ms(self.timings.line_animation),
            });
        }
        point_count
    }

    pub async fn clear_points(&self) {
        self.state.lock().await.clear_points();
        self.events.emit(AppEvent::PointsCleared);
    }

    /// Measure `photo`. Yields exactly one new measurement, or an error and no changes.
    pub async fn capture(&self, photo: CapturedPhoto) -> Result<Measurement, CaptureError> {
        let snapshot = self.begin_capture().await?;
        let result = self.detect_and_record(&snapshot, photo).await;
        self.finish_capture(&snapshot, result).await
    }

    /// Take a picture with `camera` and measure it, holding the processing flag throughout.
    pub async fn capture_from<C: CameraDevice>(
        &self,
        camera: &C,
    ) -> Result<Measurement, CaptureError> {
        let snapshot = self.begin_capture().await?;
        let photo = tokio::select! {
            photo = camera.take_picture() => photo,
            _ = snapshot.token.cancelled() => Err(CaptureError::Cancelled),
        };
        let result = match photo {
            Ok(photo) => self.detect_and_record(&snapshot, photo).await,
            Err(err) => Err(err),
        };
        self.finish_capture(&snapshot, result).await
    }

    /// Abandon the in-flight capture so its result never lands. No-op when idle.
    pub async fn cancel_capture(&self) -> bool {
        let cancelled = self.state.lock().await.cancel_capture();
        if cancelled {
            log_info!("In-flight capture cancelled");
        }
        cancelled
    }

    /// Merge `patch` into the active measurement and its history entry.
    ///
    /// Returns `Ok(None)` when nothing is active.
    pub async fn save(&self, patch: MeasurementPatch) -> Result<Option<Measurement>> {
        let active = self.state.lock().await.active_measurement.clone();
        let Some(active) = active else {
            return Ok(None);
        };

        let updated = active.merged(&patch)?;
        if !self.history.update(&updated).await? {
            log_warn!("Measurement {} is no longer in history", updated.id);
        }

        Ok(Some(self.publish_saved(updated).await))
    }

    /// Refresh the active copy if it is still `updated` and announce the change.
    ///
    /// History already holds `updated`; a capture finishing first only means the
    /// active slot moved on.
    async fn publish_saved(&self, updated: Measurement) -> Measurement {
        if !self.state.lock().await.refresh_active(&updated) {
            log_info!("Saved {} after it stopped being active", updated.id);
        }

        self.events.emit(AppEvent::MeasurementUpdated {
            measurement: updated.clone(),
        });
        updated
    }

    /// Remove `id` from history and clear it if active. Unknown ids are a no-op.
    pub async fn delete_measurement(&self, id: &str) -> Result<bool> {
        let removed = self.history.remove(id).await?;
        let was_active = self.forget_active(id).await;
        Ok(removed || was_active)
    }

    /// Clear the active measurement when it is `id`, leaving history alone.
    pub async fn forget_active(&self, id: &str) -> bool {
        self.state.lock().await.forget_active(id)
    }

    pub async fn toggle_unit(&self) -> MeasurementUnit {
        let unit = self.state.lock().await.toggle_unit();
        self.events.emit(AppEvent::UnitChanged { unit });
        unit
    }

    async fn begin_capture(&self) -> Result<CaptureSnapshot, CaptureError> {
        let snapshot = self.state.lock().await.begin_capture()?;
        log_info!("Capture started with {} points", snapshot.points.len());
        self.events.emit(AppEvent::ProcessingChanged {
            is_processing: true,
        });
        Ok(snapshot)
    }

    async fn detect_and_record(
        &self,
        snapshot: &CaptureSnapshot,
        photo: CapturedPhoto,
    ) -> Result<Measurement, CaptureError> {
        let request = DetectionRequest {
            image_uri: photo.uri().to_string(),
            points: snapshot.points.clone(),
        };

        let detection = tokio::select! {
            detection = self.detector.detect(request) => {
                detection.map_err(|err| CaptureError::Detection(format!("{err:#}")))?
            }
            _ = snapshot.token.cancelled() => return Err(CaptureError::Cancelled),
        };

        if snapshot.token.is_cancelled() {
            return Err(CaptureError::Cancelled);
        }

        let measurement = Measurement {
            id: generate_id(),
            value: detection.value,
            unit: snapshot.unit,
            image_uri: Some(photo.into_uri()),
            timestamp: now_millis(),
            label: None,
            object_name: Some(detection.object_name),
            object_details: Some(detection.object_details),
            points: snapshot.points.clone(),
        };

        self.history
            .add(&measurement)
            .await
            .map_err(|err| CaptureError::Storage(format!("{err:#}")))?;

        Ok(measurement)
    }

    async fn finish_capture(
        &self,
        snapshot: &CaptureSnapshot,
        result: Result<Measurement, CaptureError>,
    ) -> Result<Measurement, CaptureError> {
        match result {
            Ok(measurement) => {
                let point_count = self
                    .state
                    .lock()
                    .await
                    .complete_capture(measurement.clone(), snapshot);

                log_info!(
                    "Capture produced {} ({})",
                    measurement.id,
                    measurement.display_value()
                );
                self.events.emit(AppEvent::PointsChanged { point_count });
                self.events.emit(AppEvent::ResultReady {
                    measurement: measurement.clone(),
                    reveal_ms: duration_ms(self.timings.result_reveal),
                });
                self.events.emit(AppEvent::ProcessingChanged {
                    is_processing: false,
                });
                Ok(measurement)
            }
            Err(err) => {
                self.state.lock().await.fail_capture();

                match &err {
                    CaptureError::Cancelled => log_info!("Capture cancelled"),
                    other => log_error!("Capture failed: {other}"),
                }
                self.events.emit(AppEvent::CaptureFailed {
                    message: err.to_string(),
                });
                self.events.emit(AppEvent::ProcessingChanged {
                    is_processing: false,
                });
                Err(err)
            }
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use crate::{
        db::Database,
        events::drain,
        session::detector::{reference_object, Detection},
    };

    struct FailingDetector;

    impl MeasurementDetector for FailingDetector {
        fn detect(
            &self,
            _request: DetectionRequest,
        ) -> impl std::future::Future<Output = Result<Detection>> + Send {
            async { Err(anyhow!("model unavailable")) }
        }
    }

    struct BrokenCamera;

    impl CameraDevice for BrokenCamera {
        fn take_picture(
            &self,
        ) -> impl std::future::Future<Output = Result<CapturedPhoto, CaptureError>> + Send
        {
            async { Err(CaptureError::Device("permission denied".into())) }
        }
    }

    struct FixedCamera;

    impl CameraDevice for FixedCamera {
        fn take_picture(
            &self,
        ) -> impl std::future::Future<Output = Result<CapturedPhoto, CaptureError>> + Send
        {
            async { CapturedPhoto::new("file://camera.jpg") }
        }
    }

    fn controller_with<D: MeasurementDetector>(
        detector: D,
    ) -> (SessionController<D>, HistoryStore, EventBus) {
        let events = EventBus::new();
        let history = HistoryStore::new(Database::in_memory().unwrap(), events.clone());
        let controller = SessionController::new(detector, history.clone(), events.clone());
        (controller, history, events)
    }

    fn controller() -> (SessionController, HistoryStore, EventBus) {
        controller_with(SimulatedDetector::with_seed(Duration::ZERO, 3))
    }

    fn photo() -> CapturedPhoto {
        CapturedPhoto::new("file://x.jpg").unwrap()
    }

    #[tokio::test]
    async fn line_animation_starts_at_two_points() {
        let (controller, _, events) = controller();
        let mut rx = events.subscribe();

        controller.add_point(Point::new(10.0, 10.0)).await;
        assert_eq!(drain(&mut rx), vec![AppEvent::PointsChanged { point_count: 1 }]);

        controller.add_point(Point::new(50.0, 50.0)).await;
        assert_eq!(
            drain(&mut rx),
            vec![
                AppEvent::PointsChanged { point_count: 2 },
                AppEvent::LineAnimation { duration_ms: 400 },
            ]
        );
    }

    #[tokio::test]
    async fn capture_records_one_fresh_measurement() {
        let (controller, history, events) = controller();
        controller.add_point(Point::new(10.0, 10.0)).await;
        controller.add_point(Point::new(50.0, 50.0)).await;
        let mut rx = events.subscribe();

        let measurement = controller.capture(photo()).await.unwrap();

        assert_eq!(measurement.unit, MeasurementUnit::Cm);
        assert_eq!(measurement.image_uri.as_deref(), Some("file://x.jpg"));
        assert_eq!(
            measurement.points,
            vec![Point::new(10.0, 10.0), Point::new(50.0, 50.0)]
        );
        assert_eq!(measurement.id.len(), 21);
        let object = reference_object(measurement.object_name.as_deref().unwrap()).unwrap();
        let near = |d: f64| measurement.value >= d * 0.9 - 0.051 && measurement.value <= d * 1.1 + 0.051;
        assert!(near(object.width) || near(object.height));

        let state = controller.get_state().await;
        assert!(!state.is_processing);
        assert!(state.points.is_empty());
        assert_eq!(state.active_measurement, Some(measurement.clone()));

        let saved = history.list().await.unwrap();
        assert_eq!(saved, vec![measurement.clone()]);

        let published = drain(&mut rx);
        assert_eq!(
            published.first(),
            Some(&AppEvent::ProcessingChanged { is_processing: true })
        );
        assert_eq!(
            published.last(),
            Some(&AppEvent::ProcessingChanged { is_processing: false })
        );
        assert!(published.contains(&AppEvent::ResultReady {
            measurement,
            reveal_ms: 500
        }));
    }

    #[tokio::test]
    async fn captures_prepend_with_distinct_ids() {
        let (controller, history, _) = controller();
        let first = controller.capture(photo()).await.unwrap();
        let second = controller.capture(photo()).await.unwrap();

        assert_ne!(first.id, second.id);
        let ids: Vec<String> = history.list().await.unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], second.id);
    }

    #[tokio::test]
    async fn capture_uses_the_current_unit() {
        let (controller, _, _) = controller();
        controller.toggle_unit().await;
        let measurement = controller.capture(photo()).await.unwrap();
        assert_eq!(measurement.unit, MeasurementUnit::In);
    }

    #[tokio::test]
    async fn concurrent_capture_is_rejected() {
        let (controller, history, _) =
            controller_with(SimulatedDetector::with_seed(Duration::from_millis(200), 1));

        let background = controller.clone();
        let first = tokio::spawn(async move { background.capture(photo()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(controller.get_state().await.is_processing);
        assert!(matches!(
            controller.capture(photo()).await,
            Err(CaptureError::AlreadyProcessing)
        ));
        assert!(controller.get_state().await.is_processing);

        first.await.unwrap().unwrap();
        assert_eq!(history.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn detector_failure_leaves_state_untouched() {
        let (controller, history, events) = controller_with(FailingDetector);
        controller.add_point(Point::new(1.0, 1.0)).await;
        let mut rx = events.subscribe();

        let err = controller.capture(photo()).await.unwrap_err();
        assert!(matches!(err, CaptureError::Detection(_)));

        let state = controller.get_state().await;
        assert!(!state.is_processing);
        assert_eq!(state.points.len(), 1);
        assert!(state.active_measurement.is_none());
        assert!(history.is_empty().await.unwrap());

        let published = drain(&mut rx);
        assert!(published.iter().any(|e| matches!(e, AppEvent::CaptureFailed { .. })));
        assert_eq!(
            published.last(),
            Some(&AppEvent::ProcessingChanged { is_processing: false })
        );
    }

    #[tokio::test]
    async fn camera_failure_is_recoverable() {
        let (controller, history, _) = controller();
        let err = controller.capture_from(&BrokenCamera).await.unwrap_err();
        assert!(matches!(err, CaptureError::Device(_)));
        assert!(!controller.get_state().await.is_processing);
        assert!(history.is_empty().await.unwrap());

        let measurement = controller.capture_from(&FixedCamera).await.unwrap();
        assert_eq!(measurement.image_uri.as_deref(), Some("file://camera.jpg"));
    }

    #[tokio::test]
    async fn cancelled_capture_never_lands() {
        let (controller, history, _) =
            controller_with(SimulatedDetector::with_seed(Duration::from_secs(30), 1));

        let background = controller.clone();
        let pending = tokio::spawn(async move { background.capture(photo()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(controller.cancel_capture().await);
        let result = pending.await.unwrap();
        assert!(matches!(result, Err(CaptureError::Cancelled)));

        let state = controller.get_state().await;
        assert!(!state.is_processing);
        assert!(state.active_measurement.is_none());
        assert!(history.is_empty().await.unwrap());
        assert!(!controller.cancel_capture().await);
    }

    #[tokio::test]
    async fn save_merges_into_active_and_history() {
        let (controller, history, _) = controller();
        assert!(controller
            .save(MeasurementPatch::label("Desk"))
            .await
            .unwrap()
            .is_none());

        let measurement = controller.capture(photo()).await.unwrap();
        let saved = controller
            .save(MeasurementPatch::label("Desk"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(saved.id, measurement.id);
        assert_eq!(saved.value, measurement.value);
        assert_eq!(saved.label.as_deref(), Some("Desk"));
        assert_eq!(
            controller.get_state().await.active_measurement,
            Some(saved.clone())
        );
        assert_eq!(history.get(&measurement.id).await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_clears_active() {
        let (controller, history, _) = controller();
        let keep = controller.capture(photo()).await.unwrap();
        let doomed = controller.capture(photo()).await.unwrap();

        assert!(controller.delete_measurement(&doomed.id).await.unwrap());
        let after_once = history.list().await.unwrap();
        assert!(!controller.delete_measurement(&doomed.id).await.unwrap());
        let after_twice = history.list().await.unwrap();

        assert_eq!(after_once, after_twice);
        assert_eq!(after_once, vec![keep]);
        assert!(controller.get_state().await.active_measurement.is_none());
    }

    #[tokio::test]
    async fn clear_points_keeps_saved_measurements() {
        let (controller, history, events) = controller();
        let measurement = controller.capture(photo()).await.unwrap();
        controller.add_point(Point::new(3.0, 4.0)).await;
        let mut rx = events.subscribe();

        controller.clear_points().await;

        let state = controller.get_state().await;
        assert!(state.points.is_empty());
        assert_eq!(state.active_measurement, Some(measurement));
        assert_eq!(history.len().await.unwrap(), 1);
        assert_eq!(drain(&mut rx), vec![AppEvent::PointsCleared]);
    }

    #[tokio::test]
    async fn taps_during_capture_survive_completion() {
        let (controller, history, events) =
            controller_with(SimulatedDetector::with_seed(Duration::from_millis(200), 1));
        controller.add_point(Point::new(1.0, 1.0)).await;

        let background = controller.clone();
        let pending = tokio::spawn(async move { background.capture(photo()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        controller.add_point(Point::new(7.0, 7.0)).await;
        let mut rx = events.subscribe();

        let measurement = pending.await.unwrap().unwrap();
        assert_eq!(measurement.points, vec![Point::new(1.0, 1.0)]);
        assert_eq!(controller.get_state().await.points, vec![Point::new(7.0, 7.0)]);
        assert_eq!(history.list().await.unwrap()[0].points, vec![Point::new(1.0, 1.0)]);
        assert_eq!(
            drain(&mut rx).first(),
            Some(&AppEvent::PointsChanged { point_count: 1 })
        );
    }

    #[tokio::test]
    async fn saving_a_replaced_result_still_reports_the_history_write() {
        let (controller, history, events) = controller();
        let first = controller.capture(photo()).await.unwrap();
        let second = controller.capture(photo()).await.unwrap();

        let mut edited = first.merged(&MeasurementPatch::label("Shelf")).unwrap();
        assert!(history.update(&edited).await.unwrap());
        let mut rx = events.subscribe();

        edited = controller.publish_saved(edited).await;

        assert_eq!(edited.label.as_deref(), Some("Shelf"));
        assert_eq!(
            controller.get_state().await.active_measurement,
            Some(second)
        );
        assert_eq!(
            drain(&mut rx),
            vec![AppEvent::MeasurementUpdated { measurement: edited.clone() }]
        );
        assert_eq!(history.get(&first.id).await.unwrap(), Some(edited));
    }
}
