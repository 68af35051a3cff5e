use crate::{now_string, AppState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use incident_core::event_log::{Event, EventType};
use incident_core::incident::{Incident, MediaKind, MediaRef};
use report_registry::{validate_report_v1, CanonicalReportV1};

/// Normalizes one external submission shape into the canonical report.
pub trait ReportAdapter: Send + Sync + 'static {
    fn parse(&self, payload: &serde_json::Value) -> Result<CanonicalReportV1, String>;
}

pub struct GenericAdapter;

/// The mobile app posts its form fields stringly typed; coordinates and
/// media arrive as strings and `{url}` objects.
pub struct MobileFormAdapter;

impl ReportAdapter for GenericAdapter {
    fn parse(&self, payload: &serde_json::Value) -> Result<CanonicalReportV1, String> {
        let report = CanonicalReportV1 {
            schema: "report.v1".into(),
            reporter_id: payload
                .get("reporter_id")
                .or_else(|| payload.get("user_id"))
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string(),
            title: payload
                .get("title")
                .or_else(|| payload.get("incident_title"))
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string(),
            description: payload
                .get("description")
                .or_else(|| payload.get("incident_description"))
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string(),
            category: payload
                .get("category")
                .or_else(|| payload.get("incident_type"))
                .and_then(serde_json::Value::as_str)
                .unwrap_or("other")
                .to_string(),
            latitude: payload.get("latitude").and_then(serde_json::Value::as_f64),
            longitude: payload.get("longitude").and_then(serde_json::Value::as_f64),
            media: payload
                .get("media")
                .and_then(serde_json::Value::as_array)
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_str().map(ToString::to_string))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default(),
            occurred_at: now_string(),
        };
        validate_report_v1(&report)?;
        Ok(report)
    }
}

impl ReportAdapter for MobileFormAdapter {
    fn parse(&self, payload: &serde_json::Value) -> Result<CanonicalReportV1, String> {
        let coordinate = |key: &str| {
            payload
                .get(key)
                .and_then(serde_json::Value::as_str)
                .and_then(|s| s.parse::<f64>().ok())
                .or_else(|| payload.get(key).and_then(serde_json::Value::as_f64))
        };

        let media = payload
            .get("media")
            .and_then(serde_json::Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|item| {
                        item.get("url")
                            .or_else(|| item.get("uri"))
                            .and_then(serde_json::Value::as_str)
                            .map(ToString::to_string)
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let report = CanonicalReportV1 {
            schema: "report.v1".into(),
            reporter_id: payload
                .get("user_id")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string(),
            title: payload
                .get("incident_title")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string(),
            description: payload
                .get("incident_description")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string(),
            category: payload
                .get("incident_type")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("other")
                .to_string(),
            latitude: coordinate("latitude"),
            longitude: coordinate("longitude"),
            media,
            occurred_at: now_string(),
        };
        validate_report_v1(&report)?;
        Ok(report)
    }
}

pub async fn file_generic_report(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    file_report(&state, &GenericAdapter, &payload)
}

pub async fn file_mobile_report(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    file_report(&state, &MobileFormAdapter, &payload)
}

fn file_report(
    state: &AppState,
    adapter: &impl ReportAdapter,
    payload: &serde_json::Value,
) -> (StatusCode, Json<serde_json::Value>) {
    let report = match adapter.parse(payload) {
        Ok(report) => report,
        Err(detail) => {
            tracing::warn!(%detail, "report intake rejected");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": detail })),
            );
        }
    };

    let id = uuid::Uuid::new_v4().to_string();
    let now = now_string();
    let mut incident = match Incident::new(&id, &report.reporter_id, &now).submit(&now) {
        Ok(incident) => incident,
        Err(error) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": error.to_string() })),
            );
        }
    };
    for reference in &report.media {
        match incident.attach_media(MediaRef {
            reference: reference.clone(),
            kind: media_kind_for(reference),
        }) {
            Ok(next) => incident = next,
            Err(error) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": error.to_string() })),
                );
            }
        }
    }

    if let Err(detail) = state.store.insert(&incident) {
        tracing::warn!(%detail, "failed to persist new incident");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": detail })),
        );
    }

    let _ = state.log.append(&Event {
        id: None,
        incident_id: incident.id.clone(),
        event_type: EventType::Reported,
        description: format!("incident reported: {}", report.title),
        details: serde_json::to_value(&report).ok(),
        timestamp: now,
    });

    tracing::info!(incident_id = %incident.id, "incident filed");
    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": incident.id,
            "status": incident.status.label(),
        })),
    )
}

fn media_kind_for(reference: &str) -> MediaKind {
    let lower = reference.to_lowercase();
    if [".mp4", ".mov", ".webm", ".mkv"]
        .iter()
        .any(|ext| lower.ends_with(ext))
    {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}
