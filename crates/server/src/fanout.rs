//! Notification fan-out: durable per-recipient records plus the personal
//! broadcast signal. Delivery to offline users degrades to the record alone;
//! they pick it up on their next fetch.

use serde_json::Value;
use uuid::Uuid;

use crate::{
    AppState,
    db::notifications::{NotificationError, NotificationRepository},
    realtime::{Event, Topic},
};
use api_types::NotificationType;

/// Drops the actor from a candidate recipient list. An actor is never
/// notified about their own action.
pub fn recipients_excluding_actor(candidates: &[Uuid], actor_id: Uuid) -> Vec<Uuid> {
    candidates
        .iter()
        .copied()
        .filter(|id| *id != actor_id)
        .collect()
}

/// Records one notification and wakes the recipient's personal topic.
/// A no-op when the target is the actor.
pub async fn notify_user(
    state: &AppState,
    notification_type: NotificationType,
    actor_id: Uuid,
    target_user_id: Uuid,
    data: Value,
) -> Result<(), NotificationError> {
    if target_user_id == actor_id {
        return Ok(());
    }

    NotificationRepository::record(state.pool(), notification_type, actor_id, target_user_id, data)
        .await?;
    state
        .events()
        .publish(Topic::User(target_user_id), Event::Notification);
    Ok(())
}

/// Records one notification per recipient (actor excluded) and wakes each
/// recipient's personal topic.
pub async fn notify_users(
    state: &AppState,
    notification_type: NotificationType,
    actor_id: Uuid,
    candidates: &[Uuid],
    data: Value,
) -> Result<(), NotificationError> {
    let recipients = recipients_excluding_actor(candidates, actor_id);
    if recipients.is_empty() {
        return Ok(());
    }

    NotificationRepository::record_many(
        state.pool(),
        notification_type,
        actor_id,
        &recipients,
        data,
    )
    .await?;

    for target in recipients {
        state
            .events()
            .publish(Topic::User(target), Event::Notification);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_is_excluded_from_recipients() {
        let actor = Uuid::new_v4();
        let others: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let mut candidates = others.clone();
        candidates.insert(1, actor);

        assert_eq!(recipients_excluding_actor(&candidates, actor), others);
    }

    #[test]
    fn sole_actor_yields_no_recipients() {
        let actor = Uuid::new_v4();
        assert!(recipients_excluding_actor(&[actor], actor).is_empty());
    }
}
