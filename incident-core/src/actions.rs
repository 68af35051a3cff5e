use crate::command::{CommandTag, ALL_TAGS};
use crate::incident::Incident;
use crate::policy::{self, Actor};
use crate::status::Status;
use std::collections::BTreeSet;

/// The command tags a client may render as buttons for this actor right now.
///
/// Built from the same policy, staleness, and registry checks `apply` runs,
/// so the offered set and the accepted set cannot drift apart.
pub fn visible_actions(incident: &Incident, actor: &Actor) -> BTreeSet<CommandTag> {
    let mut out = BTreeSet::new();
    if incident.status.is_terminal() {
        return out;
    }
    for tag in ALL_TAGS {
        if policy::can(actor, tag, incident).is_err() {
            continue;
        }
        let reachable = targets_of(tag).iter().any(|target| {
            incident.status != *target && incident.status.allowed_next().contains(target)
        });
        if reachable {
            out.insert(tag);
        }
    }
    out
}

/// Statuses a structurally valid payload of this tag can land on.
fn targets_of(tag: CommandTag) -> &'static [Status] {
    match tag {
        CommandTag::ReviewerAccept => &[Status::PendingResponseByResponder],
        CommandTag::ReviewerReject => &[Status::Rejected, Status::Duplicate],
        CommandTag::ResponderAccept => &[Status::PendingClosureByResponder],
        CommandTag::ResponderReject => &[Status::PendingReview],
        CommandTag::ResponderComplete => &[Status::PendingClosureByAdmin],
        CommandTag::AdminClose => &[Status::Closed],
        CommandTag::AdminCancel => &[Status::AdminCancelled],
    }
}
