pub mod api;
pub mod intake;

use axum::routing::{get, post};
use axum::Router;
use incident_core::event_log::EventLog;
use incident_core::store::IncidentStore;

#[derive(Clone)]
pub struct AppState {
    pub store: IncidentStore,
    pub log: EventLog,
}

pub fn build_state(db_path: &str) -> Result<AppState, String> {
    Ok(AppState {
        store: IncidentStore::open(db_path)?,
        log: EventLog::open(db_path)?,
    })
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/reports", post(intake::file_generic_report))
        .route("/reports/mobile", post(intake::file_mobile_report))
        .route("/incidents", get(api::list_incidents))
        .route("/incidents/:id", get(api::get_incident))
        .route("/incidents/:id/actions", get(api::get_actions))
        .route("/incidents/:id/transition", post(api::post_transition))
        .route("/incidents/:id/log-report", post(api::post_log_report))
        .route("/incidents/:id/comments", post(api::post_comment))
        .route("/incidents/:id/media", post(api::post_media))
        .with_state(state)
}

pub(crate) fn now_string() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return "0".into();
    };
    duration.as_secs().to_string()
}
