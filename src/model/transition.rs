//! Status transition gate.
//!
//! Advisory only: it decides which affordances the dashboards expose. The
//! backend re-checks role and terminal state on every mutation.

use super::status::Status;

/// Confirmation text shown before a delete is sent.
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this request?";

/// Whether any transition may start from `current`.
#[must_use]
pub const fn can_transition(current: Status) -> bool {
    !current.is_terminal()
}

/// Statuses offered as targets from `current`.
///
/// Includes `current` itself; a same-value transition is a no-op the backend
/// accepts.
#[must_use]
pub fn allowed_targets(current: Status) -> Vec<Status> {
    if can_transition(current) {
        Status::ALL.to_vec()
    } else {
        Vec::new()
    }
}

/// Whether the owner may delete a request in `current`.
#[must_use]
pub const fn can_delete(current: Status) -> bool {
    matches!(
        current,
        Status::Pending | Status::InProgress | Status::OnHold
    )
}

/// Confirmation text shown before a status change is sent.
#[must_use]
pub fn transition_prompt(from: Status, to: Status) -> String {
    format!(
        "Are you sure you want to change status from \"{}\" to \"{}\"?",
        from.label(),
        to.label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_block_transitions() {
        for status in Status::ALL {
            assert_eq!(
                can_transition(status),
                !matches!(status, Status::Resolved | Status::Rejected),
                "{status}"
            );
        }
    }

    #[test]
    fn open_statuses_offer_full_vocabulary_including_self() {
        let targets = allowed_targets(Status::OnHold);
        assert_eq!(targets, Status::ALL.to_vec());
        assert!(targets.contains(&Status::OnHold));
    }

    #[test]
    fn rejected_offers_nothing() {
        assert!(allowed_targets(Status::Rejected).is_empty());
        assert!(!can_delete(Status::Rejected));
    }

    #[test]
    fn delete_gate_matches_open_statuses() {
        let deletable: Vec<Status> = Status::ALL.into_iter().filter(|s| can_delete(*s)).collect();
        assert_eq!(
            deletable,
            vec![Status::Pending, Status::InProgress, Status::OnHold]
        );
    }

    #[test]
    fn prompt_names_both_formatted_statuses() {
        assert_eq!(
            transition_prompt(Status::InProgress, Status::Resolved),
            "Are you sure you want to change status from \"In Progress\" to \"Resolved\"?"
        );
    }
}
