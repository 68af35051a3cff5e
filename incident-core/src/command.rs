use crate::error::TransitionError;
use crate::status::Status;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponderKind {
    Ambulance,
    Police,
    Fire,
    Rescue,
}

impl ResponderKind {
    pub fn label(self) -> &'static str {
        match self {
            ResponderKind::Ambulance => "Ambulance",
            ResponderKind::Police => "Police",
            ResponderKind::Fire => "Fire",
            ResponderKind::Rescue => "Rescue",
        }
    }

    pub fn parse_label(value: &str) -> Option<ResponderKind> {
        match value.to_lowercase().as_str() {
            "ambulance" => Some(ResponderKind::Ambulance),
            "police" => Some(ResponderKind::Police),
            "fire" => Some(ResponderKind::Fire),
            "rescue" => Some(ResponderKind::Rescue),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponderAssignment {
    pub user_id: String,
    pub name: String,
    pub kind: ResponderKind,
    pub number: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectKind {
    Duplicate,
    Cancel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectReason {
    pub kind: RejectKind,
    pub duplicate_incident_id: Option<String>,
    pub note: Option<String>,
}

/// A typed request for one lifecycle transition, carrying whatever payload
/// that transition requires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    ReviewerAccept { responders: Vec<ResponderAssignment> },
    ReviewerReject { reason: RejectReason },
    ResponderAccept,
    ResponderReject { note: String },
    ResponderComplete,
    AdminClose,
    AdminCancel { note: String },
}

/// Payload-free discriminant of [`Command`], used by the policy table and
/// the per-role action sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CommandTag {
    ReviewerAccept,
    ReviewerReject,
    ResponderAccept,
    ResponderReject,
    ResponderComplete,
    AdminClose,
    AdminCancel,
}

pub const ALL_TAGS: [CommandTag; 7] = [
    CommandTag::ReviewerAccept,
    CommandTag::ReviewerReject,
    CommandTag::ResponderAccept,
    CommandTag::ResponderReject,
    CommandTag::ResponderComplete,
    CommandTag::AdminClose,
    CommandTag::AdminCancel,
];

impl CommandTag {
    pub fn label(self) -> &'static str {
        match self {
            CommandTag::ReviewerAccept => "ReviewerAccept",
            CommandTag::ReviewerReject => "ReviewerReject",
            CommandTag::ResponderAccept => "ResponderAccept",
            CommandTag::ResponderReject => "ResponderReject",
            CommandTag::ResponderComplete => "ResponderComplete",
            CommandTag::AdminClose => "AdminClose",
            CommandTag::AdminCancel => "AdminCancel",
        }
    }
}

impl Command {
    pub fn tag(&self) -> CommandTag {
        match self {
            Command::ReviewerAccept { .. } => CommandTag::ReviewerAccept,
            Command::ReviewerReject { .. } => CommandTag::ReviewerReject,
            Command::ResponderAccept => CommandTag::ResponderAccept,
            Command::ResponderReject { .. } => CommandTag::ResponderReject,
            Command::ResponderComplete => CommandTag::ResponderComplete,
            Command::AdminClose => CommandTag::AdminClose,
            Command::AdminCancel { .. } => CommandTag::AdminCancel,
        }
    }

    /// Payload-shape validation, independent of any incident state. A command
    /// that fails here never reaches the policy or the aggregate.
    pub fn validate(&self) -> Result<(), TransitionError> {
        match self {
            Command::ReviewerAccept { responders } => {
                if responders.is_empty() {
                    return Err(TransitionError::invalid(
                        "ReviewerAccept requires at least one responder assignment",
                    ));
                }
                if responders.iter().any(|r| r.user_id.trim().is_empty()) {
                    return Err(TransitionError::invalid(
                        "responder assignment is missing a user id",
                    ));
                }
                Ok(())
            }
            Command::ReviewerReject { reason } => match reason.kind {
                RejectKind::Duplicate => match reason.duplicate_incident_id.as_deref() {
                    Some(id) if !id.trim().is_empty() => Ok(()),
                    _ => Err(TransitionError::invalid(
                        "duplicate rejection requires the duplicate incident id",
                    )),
                },
                RejectKind::Cancel => match reason.note.as_deref() {
                    Some(note) if !note.trim().is_empty() => Ok(()),
                    _ => Err(TransitionError::invalid(
                        "cancel rejection requires a reason note",
                    )),
                },
            },
            Command::ResponderReject { note } | Command::AdminCancel { note } => {
                if note.trim().is_empty() {
                    Err(TransitionError::invalid("a reason note is required"))
                } else {
                    Ok(())
                }
            }
            Command::ResponderAccept | Command::ResponderComplete | Command::AdminClose => Ok(()),
        }
    }

    /// The status a valid instance of this command lands on.
    pub fn target_status(&self) -> Status {
        match self {
            Command::ReviewerAccept { .. } => Status::PendingResponseByResponder,
            Command::ReviewerReject { reason } => match reason.kind {
                RejectKind::Duplicate => Status::Duplicate,
                RejectKind::Cancel => Status::Rejected,
            },
            Command::ResponderAccept => Status::PendingClosureByResponder,
            Command::ResponderReject { .. } => Status::PendingReview,
            Command::ResponderComplete => Status::PendingClosureByAdmin,
            Command::AdminClose => Status::Closed,
            Command::AdminCancel { .. } => Status::AdminCancelled,
        }
    }
}
