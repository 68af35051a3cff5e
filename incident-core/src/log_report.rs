use crate::error::TransitionError;
use serde::{Deserialize, Serialize};

/// Impact tallies for the four report categories, mirroring the submission
/// wire shape.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactFields {
    pub human_counts: Vec<u32>,
    pub human_names: Vec<String>,
    pub animal_counts: Vec<u32>,
    pub animal_names: Vec<String>,
    pub infrastructure_counts: Vec<u32>,
    pub infrastructure_names: Vec<String>,
    pub crop_counts: Vec<u32>,
    pub crop_names: Vec<String>,
}

/// Post-incident impact report. Once submitted it is frozen; administrative
/// closure requires a submitted report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogReport {
    pub id: String,
    pub incident_id: String,
    pub opened_by: String,
    pub fields: ImpactFields,
    pub is_submitted: bool,
    pub opened_at: String,
    pub submitted_at: Option<String>,
}

impl LogReport {
    pub fn open(incident_id: &str, opened_by: &str, now: &str) -> LogReport {
        LogReport {
            id: format!("{incident_id}/log-report"),
            incident_id: incident_id.to_string(),
            opened_by: opened_by.to_string(),
            fields: ImpactFields::default(),
            is_submitted: false,
            opened_at: now.to_string(),
            submitted_at: None,
        }
    }

    pub fn update(&self, fields: ImpactFields) -> Result<LogReport, TransitionError> {
        if self.is_submitted {
            return Err(TransitionError::Stale);
        }
        let mut next = self.clone();
        next.fields = fields;
        Ok(next)
    }

    pub fn submit(&self, now: &str) -> Result<LogReport, TransitionError> {
        if self.is_submitted {
            return Err(TransitionError::Stale);
        }
        let mut next = self.clone();
        next.is_submitted = true;
        next.submitted_at = Some(now.to_string());
        Ok(next)
    }
}
