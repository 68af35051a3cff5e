use serde::{Deserialize, Serialize};

/// The closed set of incident statuses. All status reasoning goes through
/// this enum; free-text labels exist only at the wire boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    New,
    PendingReview,
    Rejected,
    Duplicate,
    PendingResponseByResponder,
    PendingClosureByResponder,
    PendingClosureByAdmin,
    PendingLogReportReview,
    PendingLogReportUpdate,
    Closed,
    AdminCancelled,
}

pub const ALL_STATUSES: [Status; 11] = [
    Status::New,
    Status::PendingReview,
    Status::Rejected,
    Status::Duplicate,
    Status::PendingResponseByResponder,
    Status::PendingClosureByResponder,
    Status::PendingClosureByAdmin,
    Status::PendingLogReportReview,
    Status::PendingLogReportUpdate,
    Status::Closed,
    Status::AdminCancelled,
];

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::Rejected | Status::Duplicate | Status::Closed | Status::AdminCancelled
        )
    }

    /// The static transition table. No other code may encode reachability.
    pub fn allowed_next(self) -> &'static [Status] {
        match self {
            Status::New => &[Status::PendingReview],
            Status::PendingReview => &[
                Status::Rejected,
                Status::Duplicate,
                Status::PendingResponseByResponder,
            ],
            Status::PendingResponseByResponder => &[
                Status::PendingReview,
                Status::PendingClosureByResponder,
                Status::PendingClosureByAdmin,
            ],
            Status::PendingClosureByResponder => {
                &[Status::PendingReview, Status::PendingClosureByAdmin]
            }
            Status::PendingClosureByAdmin => &[Status::Closed, Status::AdminCancelled],
            // Reached by a server-side log-report review flow only; nothing
            // here fabricates a transition out of them.
            Status::PendingLogReportReview | Status::PendingLogReportUpdate => &[],
            Status::Rejected | Status::Duplicate | Status::Closed | Status::AdminCancelled => &[],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::New => "New",
            Status::PendingReview => "Pending Review",
            Status::Rejected => "Rejected",
            Status::Duplicate => "Duplicate",
            Status::PendingResponseByResponder => "Pending Response by Responder",
            Status::PendingClosureByResponder => "Pending Closure by Responder",
            Status::PendingClosureByAdmin => "Pending Closure by Admin",
            Status::PendingLogReportReview => "Pending Log Report Review",
            Status::PendingLogReportUpdate => "Pending Log Report Update",
            Status::Closed => "Closed",
            Status::AdminCancelled => "Admin Cancelled",
        }
    }

    /// Parses a status label, tolerating the casing and separator drift the
    /// legacy clients shipped with.
    pub fn parse_label(value: &str) -> Option<Status> {
        let folded = value
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        ALL_STATUSES
            .into_iter()
            .find(|status| folded == status.label().to_lowercase().replace(' ', ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_set_is_exact() {
        let terminal = ALL_STATUSES
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect::<Vec<_>>();
        assert_eq!(
            terminal,
            vec![
                Status::Rejected,
                Status::Duplicate,
                Status::Closed,
                Status::AdminCancelled
            ]
        );
    }

    #[test]
    fn terminal_statuses_have_no_successors() {
        for status in ALL_STATUSES {
            if status.is_terminal() {
                assert!(status.allowed_next().is_empty(), "{status:?}");
            }
        }
    }

    #[test]
    fn transition_table_targets_are_reachable_members() {
        for status in ALL_STATUSES {
            for next in status.allowed_next() {
                assert_ne!(status, *next, "self-loop at {status:?}");
                assert!(ALL_STATUSES.contains(next));
            }
        }
    }

    #[test]
    fn log_report_review_pair_is_valid_but_unproduced() {
        assert!(!Status::PendingLogReportReview.is_terminal());
        assert!(!Status::PendingLogReportUpdate.is_terminal());
        for status in ALL_STATUSES {
            assert!(!status.allowed_next().contains(&Status::PendingLogReportReview));
            assert!(!status.allowed_next().contains(&Status::PendingLogReportUpdate));
        }
    }

    #[test]
    fn labels_roundtrip() {
        for status in ALL_STATUSES {
            assert_eq!(Status::parse_label(status.label()), Some(status));
        }
    }

    #[test]
    fn parse_label_absorbs_legacy_casing() {
        assert_eq!(
            Status::parse_label("pending review"),
            Some(Status::PendingReview)
        );
        assert_eq!(
            Status::parse_label("PENDING_RESPONSE_BY_RESPONDER"),
            Some(Status::PendingResponseByResponder)
        );
        assert_eq!(
            Status::parse_label("PendingClosureByAdmin"),
            Some(Status::PendingClosureByAdmin)
        );
        assert_eq!(Status::parse_label("pending-review"), Some(Status::PendingReview));
        assert_eq!(Status::parse_label("resolved"), None);
    }
}
