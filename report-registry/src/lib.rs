use serde::{Deserialize, Serialize};

/// Canonical citizen report submission shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CanonicalReportV1 {
    pub schema: String,
    pub reporter_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub media: Vec<String>,
    pub occurred_at: String,
}

/// Transition request posted against one incident.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransitionRequestV1 {
    pub incident_id: String,
    pub button_type: String,
    pub actor_user_id: String,
    pub actor_role: String,
    #[serde(default)]
    pub responders: Vec<ResponderRefV1>,
    pub cancel_reason: Option<String>,
    pub duplicate_incident_id: Option<String>,
    pub reason_for_cancellation: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResponderRefV1 {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub responder_type: String,
    pub number: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewerRefV1 {
    pub name: String,
    pub number: Option<String>,
}

/// Post-incident impact report submission shape.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LogReportSubmissionV1 {
    pub incident_log_report_id: String,
    pub incident_id: String,
    pub user_id: String,
    pub submit_status: String,
    #[serde(default)]
    pub human_counts: Vec<u32>,
    #[serde(default)]
    pub human_names: Vec<String>,
    #[serde(default)]
    pub animal_counts: Vec<u32>,
    #[serde(default)]
    pub animal_names: Vec<String>,
    #[serde(default)]
    pub infrastructure_counts: Vec<u32>,
    #[serde(default)]
    pub infrastructure_names: Vec<String>,
    #[serde(default)]
    pub crop_counts: Vec<u32>,
    #[serde(default)]
    pub crop_names: Vec<String>,
}

/// Incident read shape served to role-specific clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IncidentReadV1 {
    pub id: String,
    pub status: String,
    pub reviewers: Vec<ReviewerRefV1>,
    pub responders: Vec<ResponderRefV1>,
    pub media: Vec<String>,
    pub log_report: Option<LogReportSubmissionV1>,
}

pub const KNOWN_BUTTON_TYPES: [&str; 8] = [
    "Accept",
    "Duplicate",
    "Cancel",
    "ResponderAccept",
    "ResponderReject",
    "Complete",
    "Close",
    "AdminCancel",
];

pub fn validate_report_v1(report: &CanonicalReportV1) -> Result<(), String> {
    if report.schema != "report.v1" {
        return Err(format!("unsupported schema '{}'", report.schema));
    }
    if report.reporter_id.trim().is_empty() {
        return Err("reporter_id is required".into());
    }
    if report.title.trim().is_empty() {
        return Err("title is required".into());
    }
    if let Some(lat) = report.latitude {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!("latitude {lat} out of range"));
        }
    }
    if let Some(lon) = report.longitude {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(format!("longitude {lon} out of range"));
        }
    }
    Ok(())
}

pub fn validate_transition_v1(request: &TransitionRequestV1) -> Result<(), String> {
    if request.incident_id.trim().is_empty() {
        return Err("incident_id is required".into());
    }
    if request.actor_user_id.trim().is_empty() {
        return Err("actor_user_id is required".into());
    }
    let known = KNOWN_BUTTON_TYPES
        .iter()
        .any(|b| b.eq_ignore_ascii_case(&request.button_type));
    if !known {
        return Err(format!("unknown button_type '{}'", request.button_type));
    }
    match request.actor_role.to_lowercase().as_str() {
        "citizen" | "reviewer" | "responder" | "admin" => {}
        other => return Err(format!("invalid actor_role '{other}'")),
    }
    Ok(())
}

pub fn validate_log_report_v1(submission: &LogReportSubmissionV1) -> Result<(), String> {
    if submission.incident_id.trim().is_empty() {
        return Err("incident_id is required".into());
    }
    if submission.user_id.trim().is_empty() {
        return Err("user_id is required".into());
    }
    match submission.submit_status.to_lowercase().as_str() {
        "pending" | "submitted" => {}
        other => return Err(format!("invalid submit_status '{other}'")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> CanonicalReportV1 {
        CanonicalReportV1 {
            schema: "report.v1".into(),
            reporter_id: "citizen-1".into(),
            title: "flooded underpass".into(),
            description: "water rising fast".into(),
            category: "flood".into(),
            latitude: Some(26.9),
            longitude: Some(75.8),
            media: vec!["img-1".into()],
            occurred_at: "1700000000".into(),
        }
    }

    #[test]
    fn validates_report_v1() {
        assert!(validate_report_v1(&report()).is_ok());
    }

    #[test]
    fn rejects_unknown_schema() {
        let mut bad = report();
        bad.schema = "report.v2".into();
        assert!(validate_report_v1(&bad).is_err());
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let mut bad = report();
        bad.latitude = Some(123.0);
        assert!(validate_report_v1(&bad).is_err());
    }

    #[test]
    fn validates_transition_v1() {
        let request = TransitionRequestV1 {
            incident_id: "inc-1".into(),
            button_type: "Duplicate".into(),
            actor_user_id: "rev-1".into(),
            actor_role: "reviewer".into(),
            duplicate_incident_id: Some("inc-2".into()),
            ..Default::default()
        };
        assert!(validate_transition_v1(&request).is_ok());
    }

    #[test]
    fn rejects_unknown_button_type() {
        let request = TransitionRequestV1 {
            incident_id: "inc-1".into(),
            button_type: "Escalate".into(),
            actor_user_id: "rev-1".into(),
            actor_role: "reviewer".into(),
            ..Default::default()
        };
        assert!(validate_transition_v1(&request).is_err());
    }

    #[test]
    fn button_type_matching_ignores_case() {
        let request = TransitionRequestV1 {
            incident_id: "inc-1".into(),
            button_type: "responderaccept".into(),
            actor_user_id: "resp-1".into(),
            actor_role: "responder".into(),
            ..Default::default()
        };
        assert!(validate_transition_v1(&request).is_ok());
    }

    #[test]
    fn validates_log_report_submit_status() {
        let mut submission = LogReportSubmissionV1 {
            incident_log_report_id: "lr-1".into(),
            incident_id: "inc-1".into(),
            user_id: "resp-1".into(),
            submit_status: "submitted".into(),
            ..Default::default()
        };
        assert!(validate_log_report_v1(&submission).is_ok());

        submission.submit_status = "done".into();
        assert!(validate_log_report_v1(&submission).is_err());
    }
}
