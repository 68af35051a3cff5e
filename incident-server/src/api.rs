use crate::{now_string, AppState};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use incident_core::actions::visible_actions;
use incident_core::command::{Command, RejectKind, RejectReason, ResponderAssignment, ResponderKind};
use incident_core::error::TransitionError;
use incident_core::event_log::{Event, EventType};
use incident_core::incident::{Applied, Incident, MediaKind, MediaRef, SideEffect};
use incident_core::log_report::{ImpactFields, LogReport};
use incident_core::policy::{self, Actor, Role};
use report_registry::{
    validate_log_report_v1, validate_transition_v1, IncidentReadV1, LogReportSubmissionV1,
    ResponderRefV1, ReviewerRefV1, TransitionRequestV1,
};
use serde::Deserialize;

/// Builds the typed command out of the posted `button_type` request. The
/// payload/tag consistency check stays in the core.
pub fn command_from_request(request: &TransitionRequestV1) -> Result<Command, TransitionError> {
    let responders = request
        .responders
        .iter()
        .map(|r| {
            let kind = ResponderKind::parse_label(&r.responder_type).ok_or_else(|| {
                TransitionError::invalid(format!("unknown responder type '{}'", r.responder_type))
            })?;
            Ok(ResponderAssignment {
                user_id: r.id.clone(),
                name: r.name.clone(),
                kind,
                number: r.number.clone(),
            })
        })
        .collect::<Result<Vec<_>, TransitionError>>()?;

    let note = request
        .cancel_reason
        .clone()
        .or_else(|| request.reason_for_cancellation.clone());

    let command = match request.button_type.to_lowercase().as_str() {
        "accept" => Command::ReviewerAccept { responders },
        "duplicate" => Command::ReviewerReject {
            reason: RejectReason {
                kind: RejectKind::Duplicate,
                duplicate_incident_id: request.duplicate_incident_id.clone(),
                note,
            },
        },
        "cancel" => Command::ReviewerReject {
            reason: RejectReason {
                kind: RejectKind::Cancel,
                duplicate_incident_id: None,
                note,
            },
        },
        "responderaccept" => Command::ResponderAccept,
        "responderreject" => Command::ResponderReject {
            note: note.unwrap_or_default(),
        },
        "complete" => Command::ResponderComplete,
        "close" => Command::AdminClose,
        "admincancel" => Command::AdminCancel {
            note: note.unwrap_or_default(),
        },
        other => {
            return Err(TransitionError::invalid(format!(
                "unknown button_type '{other}'"
            )))
        }
    };
    command.validate()?;
    Ok(command)
}

pub fn actor_from_request(request: &TransitionRequestV1) -> Result<Actor, TransitionError> {
    let role = Role::parse_label(&request.actor_role).ok_or_else(|| {
        TransitionError::invalid(format!("unknown actor_role '{}'", request.actor_role))
    })?;
    Ok(Actor {
        user_id: request.actor_user_id.clone(),
        role,
    })
}

pub fn incident_read(incident: &Incident) -> IncidentReadV1 {
    IncidentReadV1 {
        id: incident.id.clone(),
        status: incident.status.label().to_string(),
        reviewers: incident
            .assigned_reviewers
            .iter()
            .map(|r| ReviewerRefV1 {
                name: r.name.clone().unwrap_or_else(|| r.user_id.clone()),
                number: r.number.clone(),
            })
            .collect(),
        responders: incident
            .assigned_responders
            .iter()
            .map(|r| ResponderRefV1 {
                id: r.user_id.clone(),
                name: r.name.clone(),
                responder_type: r.kind.label().to_string(),
                number: r.number.clone(),
            })
            .collect(),
        media: incident.media.iter().map(|m| m.reference.clone()).collect(),
        log_report: incident.log_report.as_ref().map(log_report_read),
    }
}

pub fn log_report_read(report: &LogReport) -> LogReportSubmissionV1 {
    LogReportSubmissionV1 {
        incident_log_report_id: report.id.clone(),
        incident_id: report.incident_id.clone(),
        user_id: report.opened_by.clone(),
        submit_status: if report.is_submitted {
            "submitted"
        } else {
            "pending"
        }
        .to_string(),
        human_counts: report.fields.human_counts.clone(),
        human_names: report.fields.human_names.clone(),
        animal_counts: report.fields.animal_counts.clone(),
        animal_names: report.fields.animal_names.clone(),
        infrastructure_counts: report.fields.infrastructure_counts.clone(),
        infrastructure_names: report.fields.infrastructure_names.clone(),
        crop_counts: report.fields.crop_counts.clone(),
        crop_names: report.fields.crop_names.clone(),
    }
}

pub fn error_status(error: &TransitionError) -> StatusCode {
    match error {
        TransitionError::InvalidCommandPayload { .. } => StatusCode::BAD_REQUEST,
        TransitionError::Denied(_) => StatusCode::FORBIDDEN,
        TransitionError::IllegalTransition
        | TransitionError::LogReportIncomplete
        | TransitionError::Stale => StatusCode::CONFLICT,
    }
}

fn error_response(error: &TransitionError) -> (StatusCode, Json<serde_json::Value>) {
    (
        error_status(error),
        Json(serde_json::json!({
            "error": error.to_string(),
            "reason": error,
        })),
    )
}

fn storage_error(detail: String) -> (StatusCode, Json<serde_json::Value>) {
    tracing::warn!(%detail, "storage failure");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": detail })),
    )
}

fn not_found(id: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": format!("unknown incident '{id}'") })),
    )
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub open: bool,
}

pub async fn list_incidents(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    let loaded = if query.open {
        state.store.list_open()
    } else {
        state.store.list()
    };
    match loaded {
        Ok(incidents) => {
            let reads = incidents.iter().map(incident_read).collect::<Vec<_>>();
            (
                StatusCode::OK,
                Json(serde_json::to_value(reads).unwrap_or_default()),
            )
        }
        Err(detail) => storage_error(detail),
    }
}

pub async fn get_incident(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.store.get(&id) {
        Ok(Some(incident)) => (
            StatusCode::OK,
            Json(serde_json::to_value(incident_read(&incident)).unwrap_or_default()),
        ),
        Ok(None) => not_found(&id),
        Err(detail) => storage_error(detail),
    }
}

#[derive(Deserialize)]
pub struct ActorQuery {
    pub user_id: String,
    pub role: String,
}

pub async fn get_actions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ActorQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(role) = Role::parse_label(&query.role) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": format!("unknown role '{}'", query.role) })),
        );
    };
    let actor = Actor {
        user_id: query.user_id,
        role,
    };
    match state.store.get(&id) {
        Ok(Some(incident)) => {
            let actions = visible_actions(&incident, &actor)
                .into_iter()
                .map(|tag| tag.label())
                .collect::<Vec<_>>();
            (
                StatusCode::OK,
                Json(serde_json::json!({ "incident_id": id, "actions": actions })),
            )
        }
        Ok(None) => not_found(&id),
        Err(detail) => storage_error(detail),
    }
}

pub async fn post_transition(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<TransitionRequestV1>,
) -> (StatusCode, Json<serde_json::Value>) {
    if let Err(detail) = validate_transition_v1(&request) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": detail })),
        );
    }
    if request.incident_id != id {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "incident_id does not match the path" })),
        );
    }

    let actor = match actor_from_request(&request) {
        Ok(actor) => actor,
        Err(error) => return error_response(&error),
    };
    let command = match command_from_request(&request) {
        Ok(command) => command,
        Err(error) => return error_response(&error),
    };

    let incident = match state.store.get(&id) {
        Ok(Some(incident)) => incident,
        Ok(None) => return not_found(&id),
        Err(detail) => return storage_error(detail),
    };

    let now = now_string();
    match incident.apply(&command, &actor, &now) {
        Ok(applied) => {
            if let Err(detail) = state.store.put(&applied.incident) {
                return storage_error(detail);
            }
            journal_transition(&state, &incident, &applied, &request, &actor, &now);
            tracing::info!(
                incident_id = %id,
                from = incident.status.label(),
                to = applied.incident.status.label(),
                "transition applied"
            );
            (
                StatusCode::OK,
                Json(serde_json::to_value(incident_read(&applied.incident)).unwrap_or_default()),
            )
        }
        Err(error) => {
            let _ = state.log.append(&Event {
                id: None,
                incident_id: id.clone(),
                event_type: EventType::TransitionDenied,
                description: format!("transition refused: {error}"),
                details: Some(serde_json::json!({
                    "button_type": request.button_type,
                    "actor_user_id": actor.user_id,
                    "actor_role": actor.role.label(),
                    "reason": error,
                })),
                timestamp: now,
            });
            tracing::warn!(incident_id = %id, %error, "transition refused");
            error_response(&error)
        }
    }
}

fn journal_transition(
    state: &AppState,
    before: &Incident,
    applied: &Applied,
    request: &TransitionRequestV1,
    actor: &Actor,
    now: &str,
) {
    let _ = state.log.append(&Event {
        id: None,
        incident_id: before.id.clone(),
        event_type: EventType::StatusChanged,
        description: format!(
            "status changed: {} -> {}",
            before.status.label(),
            applied.incident.status.label()
        ),
        details: Some(serde_json::json!({
            "button_type": request.button_type,
            "actor_user_id": actor.user_id,
            "actor_role": actor.role.label(),
            "from": before.status.label(),
            "to": applied.incident.status.label(),
            "note": request.cancel_reason.clone()
                .or_else(|| request.reason_for_cancellation.clone()),
            "duplicate_incident_id": request.duplicate_incident_id,
        })),
        timestamp: now.to_string(),
    });

    for effect in &applied.effects {
        match effect {
            SideEffect::NotifyResponders => {
                let _ = state.log.append(&Event {
                    id: None,
                    incident_id: before.id.clone(),
                    event_type: EventType::ResponderAssigned,
                    description: "responders assigned".into(),
                    details: serde_json::to_value(&applied.incident.assigned_responders).ok(),
                    timestamp: now.to_string(),
                });
            }
            SideEffect::OpenLogReport => {
                let _ = state.log.append(&Event {
                    id: None,
                    incident_id: before.id.clone(),
                    event_type: EventType::LogReportUpdated,
                    description: "log report opened".into(),
                    details: None,
                    timestamp: now.to_string(),
                });
            }
            // Reporter notification and PDF generation ride on the
            // StatusChanged event consumed by downstream workers.
            SideEffect::NotifyReporter | SideEffect::GenerateClosurePdf => {}
        }
    }
}

#[derive(Deserialize)]
pub struct LogReportQuery {
    pub role: Option<String>,
}

pub async fn post_log_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LogReportQuery>,
    Json(submission): Json<LogReportSubmissionV1>,
) -> (StatusCode, Json<serde_json::Value>) {
    if let Err(detail) = validate_log_report_v1(&submission) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": detail })),
        );
    }
    if submission.incident_id != id {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "incident_id does not match the path" })),
        );
    }

    let role = match query.role.as_deref() {
        None => Role::Responder,
        Some(value) => match Role::parse_label(value) {
            Some(role) => role,
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": format!("unknown role '{value}'") })),
                )
            }
        },
    };
    let actor = Actor {
        user_id: submission.user_id.clone(),
        role,
    };

    let incident = match state.store.get(&id) {
        Ok(Some(incident)) => incident,
        Ok(None) => return not_found(&id),
        Err(detail) => return storage_error(detail),
    };

    let fields = ImpactFields {
        human_counts: submission.human_counts.clone(),
        human_names: submission.human_names.clone(),
        animal_counts: submission.animal_counts.clone(),
        animal_names: submission.animal_names.clone(),
        infrastructure_counts: submission.infrastructure_counts.clone(),
        infrastructure_names: submission.infrastructure_names.clone(),
        crop_counts: submission.crop_counts.clone(),
        crop_names: submission.crop_names.clone(),
    };

    let now = now_string();
    let updated = match incident.update_log_report(&actor, fields) {
        Ok(updated) => updated,
        Err(error) => return error_response(&error),
    };
    let submitting = submission.submit_status.eq_ignore_ascii_case("submitted");
    let updated = if submitting {
        match updated.submit_log_report(&actor, &now) {
            Ok(updated) => updated,
            Err(error) => return error_response(&error),
        }
    } else {
        updated
    };

    if let Err(detail) = state.store.put(&updated) {
        return storage_error(detail);
    }
    let _ = state.log.append(&Event {
        id: None,
        incident_id: id.clone(),
        event_type: if submitting {
            EventType::LogReportSubmitted
        } else {
            EventType::LogReportUpdated
        },
        description: if submitting {
            "log report submitted".into()
        } else {
            "log report updated".into()
        },
        details: Some(serde_json::json!({ "user_id": submission.user_id })),
        timestamp: now,
    });

    let report = updated.log_report.as_ref().map(log_report_read);
    (
        StatusCode::OK,
        Json(serde_json::to_value(report).unwrap_or_default()),
    )
}

#[derive(Deserialize)]
pub struct CommentBody {
    pub user_id: String,
    pub role: String,
    pub body: String,
}

pub async fn post_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(comment): Json<CommentBody>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(role) = Role::parse_label(&comment.role) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": format!("unknown role '{}'", comment.role) })),
        );
    };
    if comment.body.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "comment body is required" })),
        );
    }
    let actor = Actor {
        user_id: comment.user_id.clone(),
        role,
    };

    let incident = match state.store.get(&id) {
        Ok(Some(incident)) => incident,
        Ok(None) => return not_found(&id),
        Err(detail) => return storage_error(detail),
    };

    if let Err(reason) = policy::can_comment(&actor, &incident) {
        let error = TransitionError::Denied(reason);
        return error_response(&error);
    }

    let _ = state.log.append(&Event {
        id: None,
        incident_id: id.clone(),
        event_type: EventType::CommentPosted,
        description: format!("comment posted by {}", comment.user_id),
        details: Some(serde_json::json!({
            "user_id": comment.user_id,
            "role": actor.role.label(),
            "body": comment.body,
        })),
        timestamp: now_string(),
    });

    (StatusCode::CREATED, Json(serde_json::json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct MediaBody {
    pub user_id: String,
    pub reference: String,
    pub kind: String,
}

pub async fn post_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(media): Json<MediaBody>,
) -> (StatusCode, Json<serde_json::Value>) {
    let kind = match media.kind.to_lowercase().as_str() {
        "image" => MediaKind::Image,
        "video" => MediaKind::Video,
        other => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": format!("unknown media kind '{other}'") })),
            )
        }
    };

    let incident = match state.store.get(&id) {
        Ok(Some(incident)) => incident,
        Ok(None) => return not_found(&id),
        Err(detail) => return storage_error(detail),
    };

    let attached = match incident.attach_media(MediaRef {
        reference: media.reference.clone(),
        kind,
    }) {
        Ok(attached) => attached,
        Err(error) => return error_response(&error),
    };

    if let Err(detail) = state.store.put(&attached) {
        return storage_error(detail);
    }
    let _ = state.log.append(&Event {
        id: None,
        incident_id: id.clone(),
        event_type: EventType::MediaAttached,
        description: format!("media attached: {}", media.reference),
        details: Some(serde_json::json!({
            "user_id": media.user_id,
            "reference": media.reference,
            "kind": media.kind,
        })),
        timestamp: now_string(),
    });

    (
        StatusCode::OK,
        Json(serde_json::to_value(incident_read(&attached)).unwrap_or_default()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use incident_core::command::CommandTag;
    use incident_core::error::DenialReason;

    fn request(button_type: &str) -> TransitionRequestV1 {
        TransitionRequestV1 {
            incident_id: "inc-1".into(),
            button_type: button_type.into(),
            actor_user_id: "rev-1".into(),
            actor_role: "reviewer".into(),
            ..Default::default()
        }
    }

    #[test]
    fn duplicate_button_builds_a_duplicate_rejection() {
        let mut req = request("Duplicate");
        req.duplicate_incident_id = Some("inc-0".into());
        let command = command_from_request(&req).expect("command");
        assert_eq!(command.tag(), CommandTag::ReviewerReject);
        assert!(matches!(
            command,
            Command::ReviewerReject {
                reason: RejectReason {
                    kind: RejectKind::Duplicate,
                    ..
                }
            }
        ));
    }

    #[test]
    fn duplicate_button_without_reference_is_rejected_before_dispatch() {
        let req = request("Duplicate");
        assert!(matches!(
            command_from_request(&req),
            Err(TransitionError::InvalidCommandPayload { .. })
        ));
    }

    #[test]
    fn cancel_button_carries_the_cancel_reason() {
        let mut req = request("Cancel");
        req.cancel_reason = Some("not an incident".into());
        let command = command_from_request(&req).expect("command");
        assert_eq!(
            command.target_status(),
            incident_core::status::Status::Rejected
        );
    }

    #[test]
    fn accept_button_maps_responder_assignments() {
        let mut req = request("Accept");
        req.responders = vec![ResponderRefV1 {
            id: "R1".into(),
            name: "City Ambulance".into(),
            responder_type: "Ambulance".into(),
            number: Some("108".into()),
        }];
        let command = command_from_request(&req).expect("command");
        let Command::ReviewerAccept { responders } = command else {
            panic!("expected ReviewerAccept");
        };
        assert_eq!(responders[0].kind, ResponderKind::Ambulance);
        assert_eq!(responders[0].user_id, "R1");
    }

    #[test]
    fn unknown_responder_type_is_an_invalid_payload() {
        let mut req = request("Accept");
        req.responders = vec![ResponderRefV1 {
            id: "R1".into(),
            name: "Navy".into(),
            responder_type: "Navy".into(),
            number: None,
        }];
        assert!(matches!(
            command_from_request(&req),
            Err(TransitionError::InvalidCommandPayload { .. })
        ));
    }

    #[test]
    fn button_type_matching_is_case_insensitive() {
        let mut req = request("responderreject");
        req.actor_role = "responder".into();
        req.cancel_reason = Some("wrong district".into());
        let command = command_from_request(&req).expect("command");
        assert_eq!(command.tag(), CommandTag::ResponderReject);
    }

    #[test]
    fn error_statuses_follow_the_taxonomy() {
        assert_eq!(
            error_status(&TransitionError::invalid("x")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&TransitionError::Denied(DenialReason::WrongRole)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(error_status(&TransitionError::Stale), StatusCode::CONFLICT);
        assert_eq!(
            error_status(&TransitionError::LogReportIncomplete),
            StatusCode::CONFLICT
        );
        assert_eq!(
            error_status(&TransitionError::IllegalTransition),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn read_shape_uses_free_text_labels() {
        let reviewer = Actor {
            user_id: "rev-1".into(),
            role: Role::Reviewer,
        };
        let incident = Incident::new("inc-1", "citizen-1", "100")
            .submit("101")
            .expect("submit");
        let applied = incident
            .apply(
                &Command::ReviewerAccept {
                    responders: vec![ResponderAssignment {
                        user_id: "R1".into(),
                        name: "City Fire".into(),
                        kind: ResponderKind::Fire,
                        number: Some("101".into()),
                    }],
                },
                &reviewer,
                "102",
            )
            .expect("accept");

        let read = incident_read(&applied.incident);
        assert_eq!(read.status, "Pending Response by Responder");
        assert_eq!(read.reviewers.len(), 1);
        assert_eq!(read.reviewers[0].name, "rev-1");
        assert_eq!(read.responders[0].responder_type, "Fire");
        assert!(read.log_report.is_none());
    }

    #[test]
    fn log_report_read_reflects_submit_status() {
        let report = LogReport::open("inc-1", "R1", "100");
        assert_eq!(log_report_read(&report).submit_status, "pending");
        let submitted = report.submit("101").expect("submit");
        assert_eq!(log_report_read(&submitted).submit_status, "submitted");
    }
}
