use crate::command::{Command, RejectKind, ResponderAssignment};
use crate::error::{DenialReason, TransitionError};
use crate::log_report::{ImpactFields, LogReport};
use crate::policy::{self, Actor};
use crate::status::Status;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub reference: String,
    pub kind: MediaKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerRef {
    pub user_id: String,
    pub name: Option<String>,
    pub number: Option<String>,
}

/// Present iff the incident reached Rejected or Duplicate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub kind: RejectKind,
    pub duplicate_incident_id: Option<String>,
    pub note: Option<String>,
}

/// I/O the caller performs after a successful apply. Never performed inside
/// the aggregate itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideEffect {
    NotifyResponders,
    NotifyReporter,
    OpenLogReport,
    GenerateClosurePdf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Applied {
    pub incident: Incident,
    pub effects: Vec<SideEffect>,
}

/// One reported disaster event. An immutable value: every operation returns
/// a new version and leaves the input untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub status: Status,
    pub reporter_id: String,
    pub assigned_reviewers: Vec<ReviewerRef>,
    pub assigned_responders: Vec<ResponderAssignment>,
    pub rejection: Option<Rejection>,
    pub log_report: Option<LogReport>,
    pub media: Vec<MediaRef>,
    pub created_at: String,
    pub status_changed_at: String,
}

impl Incident {
    pub fn new(id: &str, reporter_id: &str, now: &str) -> Incident {
        Incident {
            id: id.to_string(),
            status: Status::New,
            reporter_id: reporter_id.to_string(),
            assigned_reviewers: Vec::new(),
            assigned_responders: Vec::new(),
            rejection: None,
            log_report: None,
            media: Vec::new(),
            created_at: now.to_string(),
            status_changed_at: now.to_string(),
        }
    }

    /// The citizen-submission step: New -> PendingReview.
    pub fn submit(&self, now: &str) -> Result<Incident, TransitionError> {
        if self.status != Status::New {
            return Err(TransitionError::Stale);
        }
        let mut next = self.clone();
        next.status = Status::PendingReview;
        next.status_changed_at = now.to_string();
        Ok(next)
    }

    pub fn log_report_submitted(&self) -> bool {
        self.log_report.as_ref().map(|r| r.is_submitted).unwrap_or(false)
    }

    pub fn is_assigned_responder(&self, user_id: &str) -> bool {
        self.assigned_responders.iter().any(|r| r.user_id == user_id)
    }

    /// Applies one transition command on behalf of an acting role/identity.
    ///
    /// Order of checks: terminal guard, payload shape, role policy (with a
    /// duplicate-delivery reading of WrongStatus at the command's target),
    /// explicit staleness, then the registry's transition table. Side effects
    /// land atomically with the status change.
    pub fn apply(
        &self,
        command: &Command,
        actor: &Actor,
        now: &str,
    ) -> Result<Applied, TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::Denied(DenialReason::WrongStatus));
        }
        command.validate()?;

        let target = command.target_status();
        if let Err(reason) = policy::can(actor, command.tag(), self) {
            return Err(match reason {
                DenialReason::WrongStatus if self.status == target => TransitionError::Stale,
                DenialReason::LogReportIncomplete => TransitionError::LogReportIncomplete,
                other => TransitionError::Denied(other),
            });
        }
        if self.status == target {
            // Policy passed but the command's outcome is already in place:
            // concurrent re-delivery, e.g. a second ResponderAccept.
            return Err(TransitionError::Stale);
        }
        if !self.status.allowed_next().contains(&target) {
            return Err(TransitionError::IllegalTransition);
        }

        let mut next = self.clone();
        let mut effects = Vec::new();

        match command {
            Command::ReviewerAccept { responders } => {
                next.record_reviewer(actor);
                for assignment in responders {
                    if !next.is_assigned_responder(&assignment.user_id) {
                        next.assigned_responders.push(assignment.clone());
                    }
                }
                effects.push(SideEffect::NotifyResponders);
            }
            Command::ReviewerReject { reason } => {
                next.record_reviewer(actor);
                next.rejection = Some(Rejection {
                    kind: reason.kind,
                    duplicate_incident_id: reason.duplicate_incident_id.clone(),
                    note: reason.note.clone(),
                });
                effects.push(SideEffect::NotifyReporter);
            }
            // The reject note travels in the audit journal; `rejection` stays
            // reserved for terminal reviewer rejections.
            Command::ResponderAccept | Command::ResponderReject { .. } => {}
            Command::ResponderComplete => {
                if next.log_report.is_none() {
                    next.log_report = Some(LogReport::open(&self.id, &actor.user_id, now));
                }
                effects.push(SideEffect::OpenLogReport);
            }
            Command::AdminClose => {
                effects.push(SideEffect::GenerateClosurePdf);
                effects.push(SideEffect::NotifyReporter);
            }
            Command::AdminCancel { .. } => {
                effects.push(SideEffect::NotifyReporter);
            }
        }

        next.status = target;
        next.status_changed_at = now.to_string();
        Ok(Applied {
            incident: next,
            effects,
        })
    }

    pub fn attach_media(&self, media: MediaRef) -> Result<Incident, TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::Denied(DenialReason::WrongStatus));
        }
        let mut next = self.clone();
        next.media.push(media);
        Ok(next)
    }

    pub fn update_log_report(
        &self,
        actor: &Actor,
        fields: ImpactFields,
    ) -> Result<Incident, TransitionError> {
        let report = self.log_report_for_edit(actor)?;
        let mut next = self.clone();
        next.log_report = Some(report.update(fields)?);
        Ok(next)
    }

    pub fn submit_log_report(&self, actor: &Actor, now: &str) -> Result<Incident, TransitionError> {
        let report = self.log_report_for_edit(actor)?;
        let mut next = self.clone();
        next.log_report = Some(report.submit(now)?);
        Ok(next)
    }

    fn log_report_for_edit(&self, actor: &Actor) -> Result<&LogReport, TransitionError> {
        policy::can_edit_log_report(actor, self).map_err(TransitionError::Denied)?;
        self.log_report
            .as_ref()
            .ok_or(TransitionError::Denied(DenialReason::WrongStatus))
    }

    fn record_reviewer(&mut self, actor: &Actor) {
        if !self.assigned_reviewers.iter().any(|r| r.user_id == actor.user_id) {
            self.assigned_reviewers.push(ReviewerRef {
                user_id: actor.user_id.clone(),
                name: None,
                number: None,
            });
        }
    }
}
