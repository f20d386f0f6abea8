use crate::{
    models::{Measurement, MeasurementPatch, MeasurementUnit, Point},
    session::{CapturedPhoto, SessionController, SessionState},
    AppState,
};

fn controller_from_state(state: &AppState) -> SessionController {
    state.session.clone()
}

pub async fn get_session_state(state: &AppState) -> Result<SessionState, String> {
    let controller = controller_from_state(state);
    Ok(controller.get_state().await)
}

pub async fn add_measurement_point(state: &AppState, x: f64, y: f64) -> Result<usize, String> {
    if !x.is_finite() || !y.is_finite() {
        return Err(format!("invalid point ({x}, {y})"));
    }
    let controller = controller_from_state(state);
    Ok(controller.add_point(Point::new(x, y)).await)
}

pub async fn clear_measurement_points(state: &AppState) -> Result<(), String> {
    let controller = controller_from_state(state);
    controller.clear_points().await;
    Ok(())
}

pub async fn take_measurement(state: &AppState, uri: String) -> Result<Measurement, String> {
    let photo = CapturedPhoto::new(uri).map_err(|e| e.to_string())?;
    let controller = controller_from_state(state);
    controller.capture(photo).await.map_err(|e| e.to_string())
}

pub async fn cancel_measurement(state: &AppState) -> Result<bool, String> {
    let controller = controller_from_state(state);
    Ok(controller.cancel_capture().await)
}

pub async fn save_measurement(
    state: &AppState,
    patch: MeasurementPatch,
) -> Result<Option<Measurement>, String> {
    let controller = controller_from_state(state);
    controller.save(patch).await.map_err(|e| e.to_string())
}

pub async fn delete_measurement(state: &AppState, id: String) -> Result<bool, String> {
    let controller = controller_from_state(state);
    controller
        .delete_measurement(&id)
        .await
        .map_err(|e| e.to_string())
}

pub async fn toggle_unit(state: &AppState) -> Result<MeasurementUnit, String> {
    let controller = controller_from_state(state);
    Ok(controller.toggle_unit().await)
}
