use std::{collections::HashMap, sync::Arc, time::Duration};

use jiff::Timestamp;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, sea_query::Expr,
};
use tokio::{sync::Mutex, task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{
    entities::{media, user, user_media},
    error::AppResult,
    notify::{Notifier, ReminderPayload},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    /// Due reminders not dispatched because their owner or media is gone.
    pub skipped: usize,
}

/// Periodic delivery of due reminders.
///
/// A reminder is cleared only after its notification went out, and only if
/// it still holds the value that fired. Failed deliveries stay due and are
/// retried on the next pass.
pub struct ReminderSweep {
    db: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
    guard: Mutex<()>,
}

impl ReminderSweep {
    pub fn new(db: DatabaseConnection, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier, guard: Mutex::new(()) }
    }

    /// Runs one pass. Returns `None` when another pass is still in progress.
    pub async fn run_once(&self, now: Timestamp) -> AppResult<Option<SweepReport>> {
        let Ok(_running) = self.guard.try_lock() else {
            debug!("previous reminder sweep still running, skipping");
            return Ok(None);
        };

        let now_s = now.as_second();
        let due = user_media::Entity::find()
            .filter(user_media::Column::ReminderAt.is_not_null())
            .filter(user_media::Column::ReminderAt.lte(now_s))
            .order_by_asc(user_media::Column::ReminderAt)
            .order_by_asc(user_media::Column::Id)
            .find_also_related(media::Entity)
            .all(&self.db)
            .await?;

        let mut report = SweepReport { due: due.len(), ..Default::default() };
        if due.is_empty() {
            return Ok(Some(report));
        }

        let user_ids: Vec<i32> = due.iter().map(|(m, _)| m.user_id).collect();
        let owners: HashMap<i32, user::Model> = user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        for (membership, media) in due {
            let (Some(fired), Some(media), Some(owner)) =
                (membership.reminder_at, media, owners.get(&membership.user_id))
            else {
                report.skipped += 1;
                continue;
            };

            let payload = ReminderPayload {
                membership_id: membership.id,
                media_id: media.id,
                tmdb_id: media.tmdb_id,
                media_type: media.media_type,
                title: media.title,
                poster_path: media.poster_path,
                reminder_time: Timestamp::from_second(fired).unwrap_or(now),
                notification_type: membership.notification_type,
            };

            if let Err(err) = self.notifier.send(owner, &payload).await {
                warn!(membership_id = membership.id, error = %err, "reminder delivery failed");
                report.failed += 1;
                continue;
            }

            let cleared = user_media::Entity::update_many()
                .col_expr(user_media::Column::ReminderAt, Expr::value(Option::<i64>::None))
                .col_expr(user_media::Column::UpdatedAt, Expr::value(now_s))
                .filter(user_media::Column::Id.eq(membership.id))
                .filter(user_media::Column::ReminderAt.eq(fired))
                .exec(&self.db)
                .await?;

            if cleared.rows_affected == 0 {
                debug!(membership_id = membership.id, "reminder changed during delivery, kept");
            }
            report.sent += 1;
        }

        info!(
            due = report.due,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "reminder sweep finished"
        );
        Ok(Some(report))
    }

    pub fn spawn(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(err) = self.run_once(Timestamp::now()).await {
                    warn!(error = %err, "reminder sweep failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::{FutureExt, future::BoxFuture};
    use jiff::ToSpan;
    use sea_orm::{ActiveModelTrait, Set};

    use super::*;
    use crate::{
        db::now_sec,
        models::STATUS_ACTIVE,
        notify::{NotifyError, fake::RecordingNotifier},
        testing,
    };

    async fn membership_with_reminder(
        db: &DatabaseConnection,
        user_id: i32,
        media_id: i32,
        at: Timestamp,
    ) -> user_media::Model {
        let now = now_sec();
        user_media::ActiveModel {
            id: Default::default(),
            user_id: Set(user_id),
            media_id: Set(media_id),
            status: Set(STATUS_ACTIVE),
            reminder_at: Set(Some(at.as_second())),
            notification_type: Set(Some(1)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap()
    }

    async fn reload(db: &DatabaseConnection, id: i32) -> user_media::Model {
        user_media::Entity::find_by_id(id).one(db).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn due_reminder_is_sent_once_and_cleared() {
        let db = crate::db::test_db().await;
        let alice = testing::seed_user(&db, "alice", false).await;
        let media = testing::seed_media(&db, 550, "Fight Club").await;
        let now = Timestamp::now();
        let due = membership_with_reminder(&db, alice.id, media.id, now - 1.minute()).await;

        let notifier = Arc::new(RecordingNotifier::default());
        let sweep = ReminderSweep::new(db.clone(), notifier.clone());

        let report = sweep.run_once(now).await.unwrap().unwrap();
        assert_eq!(report, SweepReport { due: 1, sent: 1, failed: 0, skipped: 0 });
        assert_eq!(reload(&db, due.id).await.reminder_at, None);

        {
            let sent = notifier.sent.lock().unwrap();
            assert_eq!(sent[0].0, alice.id);
            assert_eq!(sent[0].1.title, "Fight Club");
            assert_eq!(sent[0].1.notification_type, Some(1));
        }

        let again = sweep.run_once(now).await.unwrap().unwrap();
        assert_eq!(again.due, 0);
        assert_eq!(notifier.count(), 1);
    }

    #[tokio::test]
    async fn future_reminder_is_untouched() {
        let db = crate::db::test_db().await;
        let alice = testing::seed_user(&db, "alice", false).await;
        let media = testing::seed_media(&db, 550, "Fight Club").await;
        let now = Timestamp::now();
        let later = membership_with_reminder(&db, alice.id, media.id, now + 1.hour()).await;

        let notifier = Arc::new(RecordingNotifier::default());
        let sweep = ReminderSweep::new(db.clone(), notifier.clone());

        let report = sweep.run_once(now).await.unwrap().unwrap();
        assert_eq!(report, SweepReport::default());
        assert_eq!(notifier.count(), 0);
        assert_eq!(reload(&db, later.id).await.reminder_at, later.reminder_at);
    }

    #[tokio::test]
    async fn failed_delivery_keeps_reminder_for_retry() {
        let db = crate::db::test_db().await;
        let alice = testing::seed_user(&db, "alice", false).await;
        let media = testing::seed_media(&db, 550, "Fight Club").await;
        let now = Timestamp::now();
        let due = membership_with_reminder(&db, alice.id, media.id, now - 1.minute()).await;

        let sweep = ReminderSweep::new(db.clone(), Arc::new(RecordingNotifier::failing()));
        let report = sweep.run_once(now).await.unwrap().unwrap();
        assert_eq!(report, SweepReport { due: 1, sent: 0, failed: 1, skipped: 0 });
        assert_eq!(reload(&db, due.id).await.reminder_at, due.reminder_at);

        let retry = Arc::new(RecordingNotifier::default());
        let sweep = ReminderSweep::new(db.clone(), retry.clone());
        sweep.run_once(now).await.unwrap().unwrap();
        assert_eq!(retry.count(), 1);
        assert_eq!(reload(&db, due.id).await.reminder_at, None);
    }

    #[tokio::test]
    async fn overlapping_pass_is_skipped() {
        let db = crate::db::test_db().await;
        let alice = testing::seed_user(&db, "alice", false).await;
        let media = testing::seed_media(&db, 550, "Fight Club").await;
        let now = Timestamp::now();
        membership_with_reminder(&db, alice.id, media.id, now - 1.minute()).await;

        let notifier = Arc::new(RecordingNotifier::default());
        let sweep = ReminderSweep::new(db.clone(), notifier.clone());

        let held = sweep.guard.lock().await;
        assert_eq!(sweep.run_once(now).await.unwrap(), None);
        assert_eq!(notifier.count(), 0);
        drop(held);

        assert_eq!(sweep.run_once(now).await.unwrap().map(|r| r.sent), Some(1));
    }

    /// Moves the reminder forward while its notification is in flight.
    struct Rescheduler {
        db: DatabaseConnection,
        to: i64,
    }

    impl Notifier for Rescheduler {
        fn send<'a>(
            &'a self,
            _user: &'a user::Model,
            payload: &'a ReminderPayload,
        ) -> BoxFuture<'a, Result<(), NotifyError>> {
            async move {
                user_media::Entity::update_many()
                    .col_expr(user_media::Column::ReminderAt, Expr::value(Some(self.to)))
                    .filter(user_media::Column::Id.eq(payload.membership_id))
                    .exec(&self.db)
                    .await
                    .unwrap();
                Ok(())
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn reminder_rescheduled_during_delivery_is_kept() {
        let db = crate::db::test_db().await;
        let alice = testing::seed_user(&db, "alice", false).await;
        let media = testing::seed_media(&db, 550, "Fight Club").await;
        let now = Timestamp::now();
        let due = membership_with_reminder(&db, alice.id, media.id, now - 1.minute()).await;
        let next = (now + 24.hours()).as_second();

        let notifier = Arc::new(Rescheduler { db: db.clone(), to: next });
        let sweep = ReminderSweep::new(db.clone(), notifier);
        let report = sweep.run_once(now).await.unwrap().unwrap();
        assert_eq!(report, SweepReport { due: 1, sent: 1, failed: 0, skipped: 0 });
        assert_eq!(reload(&db, due.id).await.reminder_at, Some(next));
    }
}
