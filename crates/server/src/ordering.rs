//! Order-array maintenance for user-reorderable sequences.
//!
//! Boards keep a `column_order` and columns keep a `card_order`: persisted
//! arrays of child ids that render user-controlled ordering. The arrays are a
//! view over the children, not a source of existence. Writers go through the
//! helpers here; readers use [`order_view`], which tolerates dead references
//! left behind by concurrent deletes.

use std::collections::HashSet;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReorderError {
    #[error("order references unknown id {0}")]
    UnknownId(Uuid),
    #[error("order lists id {0} more than once")]
    DuplicateId(Uuid),
    #[error("order is missing id {0}")]
    MissingId(Uuid),
}

/// Appends `id` to `order` unless it is already present. Retried creation
/// calls therefore never produce duplicate entries.
pub fn append_unique(order: &[Uuid], id: Uuid) -> Vec<Uuid> {
    if order.contains(&id) {
        return order.to_vec();
    }
    let mut updated = Vec::with_capacity(order.len() + 1);
    updated.extend_from_slice(order);
    updated.push(id);
    updated
}

/// Checks that a client-supplied order is a permutation of the container's
/// actual children. Rejecting foreign, duplicate, and missing ids here is
/// what keeps a concurrent drag from silently dropping rows.
pub fn validate_reorder(children: &[Uuid], proposed: &[Uuid]) -> Result<(), ReorderError> {
    let child_set: HashSet<Uuid> = children.iter().copied().collect();
    let mut seen = HashSet::with_capacity(proposed.len());

    for id in proposed {
        if !child_set.contains(id) {
            return Err(ReorderError::UnknownId(*id));
        }
        if !seen.insert(*id) {
            return Err(ReorderError::DuplicateId(*id));
        }
    }

    for id in &child_set {
        if !seen.contains(id) {
            return Err(ReorderError::MissingId(*id));
        }
    }

    Ok(())
}

/// Arranges `items` according to `order`. Ids in the order with no matching
/// item are skipped (dead references); items absent from the order are
/// appended in their given sequence.
pub fn order_view<T, F>(order: &[Uuid], items: Vec<T>, id_of: F) -> Vec<T>
where
    F: Fn(&T) -> Uuid,
{
    let mut by_id: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(by_id.len());

    for id in order {
        if let Some(slot) = by_id
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|item| id_of(item) == *id))
        {
            ordered.push(slot.take().expect("slot checked non-empty"));
        }
    }

    ordered.extend(by_id.into_iter().flatten());
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn append_unique_adds_at_end() {
        let order = ids(2);
        let new_id = Uuid::new_v4();
        let updated = append_unique(&order, new_id);
        assert_eq!(updated, vec![order[0], order[1], new_id]);
    }

    #[test]
    fn append_unique_is_idempotent() {
        let order = ids(3);
        let once = append_unique(&order, order[1]);
        let twice = append_unique(&once, order[1]);
        assert_eq!(once, order);
        assert_eq!(twice, order);
        assert_eq!(once.iter().filter(|id| **id == order[1]).count(), 1);
    }

    #[test]
    fn validate_reorder_accepts_permutation() {
        let children = ids(3);
        let proposed = vec![children[2], children[0], children[1]];
        assert_eq!(validate_reorder(&children, &proposed), Ok(()));
    }

    #[test]
    fn validate_reorder_rejects_foreign_id() {
        let children = ids(2);
        let foreign = Uuid::new_v4();
        let proposed = vec![children[0], children[1], foreign];
        assert_eq!(
            validate_reorder(&children, &proposed),
            Err(ReorderError::UnknownId(foreign))
        );
    }

    #[test]
    fn validate_reorder_rejects_duplicate() {
        let children = ids(2);
        let proposed = vec![children[0], children[1], children[0]];
        assert_eq!(
            validate_reorder(&children, &proposed),
            Err(ReorderError::DuplicateId(children[0]))
        );
    }

    #[test]
    fn validate_reorder_rejects_dropped_id() {
        let children = ids(3);
        let proposed = vec![children[0], children[1]];
        assert_eq!(
            validate_reorder(&children, &proposed),
            Err(ReorderError::MissingId(children[2]))
        );
    }

    #[test]
    fn order_view_skips_dead_references_and_appends_strays() {
        #[derive(Debug, PartialEq)]
        struct Item(Uuid);

        let listed = ids(2);
        let dead = Uuid::new_v4();
        let stray = Uuid::new_v4();

        let order = vec![listed[1], dead, listed[0]];
        let items = vec![Item(listed[0]), Item(listed[1]), Item(stray)];

        let view = order_view(&order, items, |item| item.0);
        assert_eq!(view, vec![Item(listed[1]), Item(listed[0]), Item(stray)]);
    }
}
