//! Repositories over the relational store. Every multi-write operation that
//! must hold an invariant (order arrays, membership pairs, ownership
//! transfer) is wrapped in a single transaction here, so route handlers only
//! ever observe it fully applied or not at all.

use uuid::Uuid;

pub mod boards;
pub mod cards;
pub mod columns;
pub mod invites;
pub mod labels;
pub mod notifications;
pub mod users;
pub mod workspaces;

/// Result of a member leaving a board or workspace. Single-owner model:
/// ownership passes to the first remaining member, and the entity is deleted
/// when the last member leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    Left,
    OwnershipTransferred(Uuid),
    Deleted,
}

/// Decides what a departure means. `successor` is the earliest remaining
/// member after the leaver's row is gone; it is only consulted when the
/// owner is the one leaving.
pub fn leave_outcome(owner_id: Uuid, leaver_id: Uuid, successor: Option<Uuid>) -> LeaveOutcome {
    if leaver_id != owner_id {
        return LeaveOutcome::Left;
    }
    match successor {
        Some(next_owner) => LeaveOutcome::OwnershipTransferred(next_owner),
        None => LeaveOutcome::Deleted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_owner_departure_just_leaves() {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        assert_eq!(
            leave_outcome(owner, member, Some(Uuid::new_v4())),
            LeaveOutcome::Left
        );
        assert_eq!(leave_outcome(owner, member, None), LeaveOutcome::Left);
    }

    #[test]
    fn owner_departure_transfers_to_remaining_member() {
        let owner = Uuid::new_v4();
        let next = Uuid::new_v4();
        assert_eq!(
            leave_outcome(owner, owner, Some(next)),
            LeaveOutcome::OwnershipTransferred(next)
        );
    }

    #[test]
    fn sole_owner_departure_deletes_the_entity() {
        let owner = Uuid::new_v4();
        assert_eq!(leave_outcome(owner, owner, None), LeaveOutcome::Deleted);
    }
}
