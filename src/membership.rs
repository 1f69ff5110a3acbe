use jiff::Timestamp;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::OnConflict,
};
use tracing::{debug, info};

use crate::{
    db::now_sec,
    entities::{media, user_media},
    error::{AppError, AppResult},
    models::{MediaKind, MediaWithMembership, MembershipView, NotificationType, STATUS_ACTIVE},
    registry,
    tmdb::TmdbClient,
    validation::{self, ValidationError},
};

const ALREADY_REGISTERED: &str = "this title is already registered";

/// Adds a catalog title to the user's list. The media record (if new) and the
/// membership are written in one transaction.
pub async fn register(
    db: &DatabaseConnection,
    tmdb: &TmdbClient,
    user_id: i32,
    kind: MediaKind,
    tmdb_id: i32,
) -> AppResult<user_media::Model> {
    let details = registry::fetch_if_missing(db, tmdb, kind, tmdb_id).await?;

    let txn = db.begin().await?;
    let media = registry::materialize(&txn, kind, tmdb_id, details.as_ref()).await?;

    if find(&txn, user_id, media.id).await?.is_some() {
        return Err(AppError::Conflict(ALREADY_REGISTERED.to_string()));
    }

    let now = now_sec();
    let model = user_media::ActiveModel {
        id: Default::default(),
        user_id: Set(user_id),
        media_id: Set(media.id),
        status: Set(STATUS_ACTIVE),
        reminder_at: Set(None),
        notification_type: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let membership = model
        .insert(&txn)
        .await
        .map_err(|e| AppError::on_unique(e, ALREADY_REGISTERED))?;

    txn.commit().await?;
    info!(user_id = user_id, media_id = media.id, tmdb_id = tmdb_id, "title registered");
    Ok(membership)
}

pub async fn is_registered<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    tmdb_id: i32,
) -> AppResult<bool> {
    let found = user_media::Entity::find()
        .inner_join(media::Entity)
        .filter(user_media::Column::UserId.eq(user_id))
        .filter(media::Column::TmdbId.eq(tmdb_id))
        .select_only()
        .column(user_media::Column::Id)
        .into_tuple::<i32>()
        .one(conn)
        .await?;
    Ok(found.is_some())
}

async fn find<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    media_id: i32,
) -> AppResult<Option<user_media::Model>> {
    let found = user_media::Entity::find()
        .filter(user_media::Column::UserId.eq(user_id))
        .filter(user_media::Column::MediaId.eq(media_id))
        .one(conn)
        .await?;
    Ok(found)
}

/// Sets (or replaces) the reminder for a media record on the user's list,
/// creating the membership when it does not exist yet.
pub async fn set_reminder<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    media_id: i32,
    when: Timestamp,
    notification_type: Option<i32>,
    now: Timestamp,
) -> AppResult<user_media::Model> {
    let when = validation::reminder_time(when, now)?;
    if let Some(code) = notification_type {
        NotificationType::from_code(code).ok_or(ValidationError::InvalidNotificationType(code))?;
    }
    registry::get(conn, media_id).await?;

    let now_s = now.as_second();
    let model = user_media::ActiveModel {
        id: Default::default(),
        user_id: Set(user_id),
        media_id: Set(media_id),
        status: Set(STATUS_ACTIVE),
        reminder_at: Set(Some(when.as_second())),
        notification_type: Set(notification_type),
        created_at: Set(now_s),
        updated_at: Set(now_s),
    };

    user_media::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([user_media::Column::UserId, user_media::Column::MediaId])
                .update_columns([
                    user_media::Column::ReminderAt,
                    user_media::Column::NotificationType,
                    user_media::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    debug!(user_id = user_id, media_id = media_id, reminder_at = %when, "reminder set");
    find(conn, user_id, media_id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("membership missing after upsert")))
}

pub async fn list_for_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> AppResult<Vec<MediaWithMembership>> {
    let rows = user_media::Entity::find()
        .filter(user_media::Column::UserId.eq(user_id))
        .order_by_asc(user_media::Column::CreatedAt)
        .order_by_asc(user_media::Column::Id)
        .find_also_related(media::Entity)
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(membership, media)| {
            media.map(|media| MediaWithMembership {
                media,
                membership: MembershipView::from(&membership),
            })
        })
        .collect())
}

/// Deletes a membership owned by `user_id`. Someone else's membership is
/// reported exactly like a missing one.
pub async fn remove<C: ConnectionTrait>(
    conn: &C,
    membership_id: i32,
    user_id: i32,
) -> AppResult<()> {
    let res = user_media::Entity::delete_many()
        .filter(user_media::Column::Id.eq(membership_id))
        .filter(user_media::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    if res.rows_affected == 0 {
        return Err(AppError::not_found("registered work"));
    }
    info!(user_id = user_id, membership_id = membership_id, "registration removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use jiff::ToSpan;
    use sea_orm::PaginatorTrait;

    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn second_registration_is_conflict() {
        let db = crate::db::test_db().await;
        let tmdb = testing::mock_tmdb();
        let alice = testing::seed_user(&db, "alice", false).await;

        let first = register(&db, &tmdb, alice.id, MediaKind::Movie, 550).await.unwrap();
        assert_eq!(first.status, STATUS_ACTIVE);
        assert_eq!(first.reminder_at, None);

        let err = register(&db, &tmdb, alice.id, MediaKind::Movie, 550).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(user_media::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn two_users_share_one_media_record() {
        let db = crate::db::test_db().await;
        let tmdb = testing::mock_tmdb();
        let alice = testing::seed_user(&db, "alice", false).await;
        let bob = testing::seed_user(&db, "bob", false).await;

        let a = register(&db, &tmdb, alice.id, MediaKind::Tv, 1399).await.unwrap();
        let b = register(&db, &tmdb, bob.id, MediaKind::Tv, 1399).await.unwrap();
        assert_eq!(a.media_id, b.media_id);
        assert_eq!(media::Entity::find().count(&db).await.unwrap(), 1);

        assert!(is_registered(&db, alice.id, 1399).await.unwrap());
        assert!(!is_registered(&db, alice.id, 1400).await.unwrap());
    }

    #[tokio::test]
    async fn reminder_must_be_in_the_future() {
        let db = crate::db::test_db().await;
        let alice = testing::seed_user(&db, "alice", false).await;
        let media = testing::seed_media(&db, 550, "Fight Club").await;
        let now = Timestamp::now();

        let err = set_reminder(&db, alice.id, media.id, now, None, now).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::ReminderNotInFuture)));
        assert_eq!(user_media::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reminder_upserts_membership() {
        let db = crate::db::test_db().await;
        let alice = testing::seed_user(&db, "alice", false).await;
        let media = testing::seed_media(&db, 550, "Fight Club").await;
        let now = Timestamp::now();
        let later = now + 1.hour();
        let much_later = now + 2.hours();

        let created = set_reminder(&db, alice.id, media.id, later, Some(1), now).await.unwrap();
        assert_eq!(created.reminder_at, Some(later.as_second()));
        assert_eq!(created.notification_type, Some(1));

        let updated =
            set_reminder(&db, alice.id, media.id, much_later, Some(2), now).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.reminder_at, Some(much_later.as_second()));
        assert_eq!(updated.notification_type, Some(2));
        assert_eq!(user_media::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reminder_for_unknown_media_is_not_found() {
        let db = crate::db::test_db().await;
        let alice = testing::seed_user(&db, "alice", false).await;
        let now = Timestamp::now();

        let err = set_reminder(&db, alice.id, 77, now + 1.hour(), None, now).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let media = testing::seed_media(&db, 550, "Fight Club").await;
        let err =
            set_reminder(&db, alice.id, media.id, now + 1.hour(), Some(9), now).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::InvalidNotificationType(9))));
    }

    #[tokio::test]
    async fn list_and_remove_are_scoped_to_owner() {
        let db = crate::db::test_db().await;
        let tmdb = testing::mock_tmdb();
        let alice = testing::seed_user(&db, "alice", false).await;
        let bob = testing::seed_user(&db, "bob", false).await;

        let membership = register(&db, &tmdb, alice.id, MediaKind::Movie, 550).await.unwrap();
        register(&db, &tmdb, alice.id, MediaKind::Movie, 603).await.unwrap();

        let listed = list_for_user(&db, alice.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].media.tmdb_id, 550);
        assert_eq!(listed[0].membership.id, membership.id);
        assert!(list_for_user(&db, bob.id).await.unwrap().is_empty());

        let err = remove(&db, membership.id, bob.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(list_for_user(&db, alice.id).await.unwrap().len(), 2);

        remove(&db, membership.id, alice.id).await.unwrap();
        assert_eq!(list_for_user(&db, alice.id).await.unwrap().len(), 1);
    }
}
