use crate::command::CommandTag;
use crate::error::DenialReason;
use crate::incident::Incident;
use crate::status::Status;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Citizen,
    Reviewer,
    Responder,
    Admin,
}

pub const ALL_ROLES: [Role; 4] = [Role::Citizen, Role::Reviewer, Role::Responder, Role::Admin];

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Reviewer => "reviewer",
            Role::Responder => "responder",
            Role::Admin => "admin",
        }
    }

    pub fn parse_label(value: &str) -> Option<Role> {
        match value.to_lowercase().as_str() {
            "citizen" => Some(Role::Citizen),
            "reviewer" => Some(Role::Reviewer),
            "responder" => Some(Role::Responder),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Explicit caller context. Passed into every decision; never read from
/// ambient state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

/// Statuses during which discussion stays open.
pub const COMMENTABLE: [Status; 6] = [
    Status::PendingReview,
    Status::PendingResponseByResponder,
    Status::PendingClosureByResponder,
    Status::PendingClosureByAdmin,
    Status::PendingLogReportReview,
    Status::PendingLogReportUpdate,
];

fn required_role(tag: CommandTag) -> Role {
    match tag {
        CommandTag::ReviewerAccept | CommandTag::ReviewerReject => Role::Reviewer,
        CommandTag::ResponderAccept | CommandTag::ResponderReject | CommandTag::ResponderComplete => {
            Role::Responder
        }
        CommandTag::AdminClose | CommandTag::AdminCancel => Role::Admin,
    }
}

/// The authoritative answer to "may this actor issue this command against
/// this incident right now". Consolidates what the legacy screens each
/// re-derived from status strings.
pub fn can(actor: &Actor, tag: CommandTag, incident: &Incident) -> Result<(), DenialReason> {
    if actor.role != required_role(tag) {
        return Err(DenialReason::WrongRole);
    }

    match actor.role {
        // Citizens never hold transition rights; required_role filters them
        // out above.
        Role::Citizen => Err(DenialReason::WrongRole),
        Role::Reviewer => {
            if incident.status != Status::PendingReview {
                return Err(DenialReason::WrongStatus);
            }
            Ok(())
        }
        Role::Responder => {
            if !matches!(
                incident.status,
                Status::PendingResponseByResponder | Status::PendingClosureByResponder
            ) {
                return Err(DenialReason::WrongStatus);
            }
            if !incident.is_assigned_responder(&actor.user_id) {
                return Err(DenialReason::NotAssigned);
            }
            Ok(())
        }
        Role::Admin => {
            if incident.status != Status::PendingClosureByAdmin {
                return Err(DenialReason::WrongStatus);
            }
            if tag == CommandTag::AdminClose && !incident.log_report_submitted() {
                return Err(DenialReason::LogReportIncomplete);
            }
            Ok(())
        }
    }
}

/// Comment gate. Citizens may only discuss their own report; staff roles may
/// comment on anything still open for discussion.
pub fn can_comment(actor: &Actor, incident: &Incident) -> Result<(), DenialReason> {
    if !COMMENTABLE.contains(&incident.status) {
        return Err(DenialReason::WrongStatus);
    }
    if actor.role == Role::Citizen && actor.user_id != incident.reporter_id {
        return Err(DenialReason::NotAssigned);
    }
    Ok(())
}

/// Log-report edit gate: an assigned responder or an admin, while the
/// incident is still open.
pub fn can_edit_log_report(actor: &Actor, incident: &Incident) -> Result<(), DenialReason> {
    if incident.status.is_terminal() {
        return Err(DenialReason::WrongStatus);
    }
    match actor.role {
        Role::Responder => {
            if incident.is_assigned_responder(&actor.user_id) {
                Ok(())
            } else {
                Err(DenialReason::NotAssigned)
            }
        }
        Role::Admin => Ok(()),
        Role::Citizen | Role::Reviewer => Err(DenialReason::WrongRole),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ResponderAssignment, ResponderKind, ALL_TAGS};
    use crate::status::ALL_STATUSES;

    fn fixture(status: Status, submitted: bool) -> Incident {
        let mut incident = Incident::new("inc-1", "citizen-1", "100");
        incident.status = status;
        incident.assigned_responders = vec![ResponderAssignment {
            user_id: "R1".into(),
            name: "City Fire".into(),
            kind: ResponderKind::Fire,
            number: None,
        }];
        if submitted {
            let report = crate::log_report::LogReport::open("inc-1", "R1", "100")
                .submit("101")
                .expect("submit");
            incident.log_report = Some(report);
        }
        incident
    }

    fn actor(role: Role) -> Actor {
        Actor {
            user_id: match role {
                Role::Citizen => "citizen-1".into(),
                Role::Reviewer => "rev-1".into(),
                Role::Responder => "R1".into(),
                Role::Admin => "adm-1".into(),
            },
            role,
        }
    }

    fn permitted(role: Role, tag: CommandTag, status: Status, submitted: bool) -> bool {
        match (role, tag) {
            (Role::Reviewer, CommandTag::ReviewerAccept | CommandTag::ReviewerReject) => {
                status == Status::PendingReview
            }
            (
                Role::Responder,
                CommandTag::ResponderAccept
                | CommandTag::ResponderReject
                | CommandTag::ResponderComplete,
            ) => matches!(
                status,
                Status::PendingResponseByResponder | Status::PendingClosureByResponder
            ),
            (Role::Admin, CommandTag::AdminClose) => {
                status == Status::PendingClosureByAdmin && submitted
            }
            (Role::Admin, CommandTag::AdminCancel) => status == Status::PendingClosureByAdmin,
            _ => false,
        }
    }

    /// Closed-world sweep: exactly the cells from the rule table succeed.
    #[test]
    fn cross_product_matches_the_rule_table() {
        for role in ALL_ROLES {
            for tag in ALL_TAGS {
                for status in ALL_STATUSES {
                    for submitted in [false, true] {
                        let incident = fixture(status, submitted);
                        let outcome = can(&actor(role), tag, &incident);
                        assert_eq!(
                            outcome.is_ok(),
                            permitted(role, tag, status, submitted),
                            "{role:?} {tag:?} {status:?} submitted={submitted}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn denials_name_the_most_specific_reason() {
        let incident = fixture(Status::PendingResponseByResponder, false);

        assert_eq!(
            can(&actor(Role::Citizen), CommandTag::ReviewerAccept, &incident),
            Err(DenialReason::WrongRole)
        );
        assert_eq!(
            can(&actor(Role::Reviewer), CommandTag::ReviewerAccept, &incident),
            Err(DenialReason::WrongStatus)
        );

        let stranger = Actor {
            user_id: "R9".into(),
            role: Role::Responder,
        };
        assert_eq!(
            can(&stranger, CommandTag::ResponderAccept, &incident),
            Err(DenialReason::NotAssigned)
        );

        let closing = fixture(Status::PendingClosureByAdmin, false);
        assert_eq!(
            can(&actor(Role::Admin), CommandTag::AdminClose, &closing),
            Err(DenialReason::LogReportIncomplete)
        );
        assert_eq!(
            can(&actor(Role::Admin), CommandTag::AdminCancel, &closing),
            Ok(())
        );
    }

    #[test]
    fn comments_follow_the_commentable_set() {
        for status in ALL_STATUSES {
            let incident = fixture(status, false);
            let open = COMMENTABLE.contains(&status);
            assert_eq!(
                can_comment(&actor(Role::Citizen), &incident).is_ok(),
                open,
                "{status:?}"
            );
            assert_eq!(
                can_comment(&actor(Role::Reviewer), &incident).is_ok(),
                open,
                "{status:?}"
            );
        }
    }

    #[test]
    fn citizens_comment_only_on_their_own_report() {
        let incident = fixture(Status::PendingReview, false);
        let other_citizen = Actor {
            user_id: "citizen-2".into(),
            role: Role::Citizen,
        };
        assert_eq!(
            can_comment(&other_citizen, &incident),
            Err(DenialReason::NotAssigned)
        );
    }

    #[test]
    fn log_report_edit_gate() {
        let open = fixture(Status::PendingClosureByAdmin, false);
        assert!(can_edit_log_report(&actor(Role::Responder), &open).is_ok());
        assert!(can_edit_log_report(&actor(Role::Admin), &open).is_ok());
        assert_eq!(
            can_edit_log_report(&actor(Role::Reviewer), &open),
            Err(DenialReason::WrongRole)
        );

        let closed = fixture(Status::Closed, true);
        assert_eq!(
            can_edit_log_report(&actor(Role::Responder), &closed),
            Err(DenialReason::WrongStatus)
        );
    }
}
