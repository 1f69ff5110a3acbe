use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    db::now_sec,
    entities::{media, schedule},
    error::{AppError, AppResult},
    models::{CalendarEvent, CalendarExtras},
    registry, validation,
};

#[derive(Debug, Deserialize)]
pub struct NewEntry {
    pub title: String,
    pub date: String,
    pub work_id: Option<i32>,
}

fn to_event(entry: schedule::Model, media: Option<&media::Model>) -> CalendarEvent {
    CalendarEvent {
        title: entry.title,
        start: entry.date,
        all_day: true,
        extended_props: CalendarExtras {
            id: entry.id,
            work_id: entry.media_id,
            poster_path: media.and_then(|m| m.poster_path.clone()),
            overview: media.and_then(|m| m.overview.clone()),
        },
    }
}

pub async fn create<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    new: NewEntry,
) -> AppResult<CalendarEvent> {
    let title = validation::required_text("title", &new.title, validation::MAX_TITLE_LEN)?;
    let date = validation::calendar_date(&new.date)?;
    let media = match new.work_id {
        Some(id) => Some(registry::get(conn, validation::positive_id("work_id", id)?).await?),
        None => None,
    };

    let now = now_sec();
    let entry = schedule::ActiveModel {
        id: Default::default(),
        user_id: Set(user_id),
        media_id: Set(media.as_ref().map(|m| m.id)),
        title: Set(title),
        date: Set(date.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;

    info!(user_id = user_id, schedule_id = entry.id, date = %date, "schedule entry created");
    Ok(to_event(entry, media.as_ref()))
}

pub async fn list<C: ConnectionTrait>(conn: &C, user_id: i32) -> AppResult<Vec<CalendarEvent>> {
    let rows = schedule::Entity::find()
        .filter(schedule::Column::UserId.eq(user_id))
        .order_by_asc(schedule::Column::Date)
        .order_by_asc(schedule::Column::Id)
        .find_also_related(media::Entity)
        .all(conn)
        .await?;

    Ok(rows.into_iter().map(|(entry, media)| to_event(entry, media.as_ref())).collect())
}

/// Deletes an entry owned by `user_id`; other users' entries read as missing.
pub async fn delete<C: ConnectionTrait>(conn: &C, entry_id: i32, user_id: i32) -> AppResult<()> {
    let res = schedule::Entity::delete_many()
        .filter(schedule::Column::Id.eq(entry_id))
        .filter(schedule::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    if res.rows_affected == 0 {
        return Err(AppError::not_found("schedule"));
    }
    info!(user_id = user_id, schedule_id = entry_id, "schedule entry deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{testing, validation::ValidationError};

    fn entry(title: &str, date: &str, work_id: Option<i32>) -> NewEntry {
        NewEntry { title: title.to_string(), date: date.to_string(), work_id }
    }

    #[tokio::test]
    async fn create_and_list_as_calendar_events() {
        let db = crate::db::test_db().await;
        let alice = testing::seed_user(&db, "alice", false).await;
        let media = testing::seed_media(&db, 550, "Fight Club").await;

        let created =
            create(&db, alice.id, entry("Rewatch", "2030-05-01", Some(media.id))).await.unwrap();
        assert!(created.all_day);
        assert_eq!(created.extended_props.work_id, Some(media.id));
        assert_eq!(created.extended_props.poster_path.as_deref(), Some("/550.jpg"));

        create(&db, alice.id, entry("Premiere", "2030-04-01", None)).await.unwrap();

        let events = list(&db, alice.id).await.unwrap();
        let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["Premiere", "Rewatch"]);
        assert_eq!(events[1].extended_props.overview.as_deref(), Some("About Fight Club"));
        assert_eq!(events[0].extended_props.work_id, None);

        let json = serde_json::to_value(&events[1]).unwrap();
        assert_eq!(json["allDay"], true);
        assert_eq!(json["start"], "2030-05-01");
        assert_eq!(json["extendedProps"]["id"], created.extended_props.id);
    }

    #[tokio::test]
    async fn create_validates_input() {
        let db = crate::db::test_db().await;
        let alice = testing::seed_user(&db, "alice", false).await;

        let err = create(&db, alice.id, entry(" ", "2030-01-01", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::Required("title"))));

        let err = create(&db, alice.id, entry("Night", "01/02/2030", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::InvalidDate(_))));

        let err = create(&db, alice.id, entry("Night", "2030-01-01", Some(404))).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert!(list(&db, alice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_is_scoped_to_owner() {
        let db = crate::db::test_db().await;
        let alice = testing::seed_user(&db, "alice", false).await;
        let bob = testing::seed_user(&db, "bob", false).await;
        let created = create(&db, alice.id, entry("Night", "2030-01-01", None)).await.unwrap();
        let id = created.extended_props.id;

        assert!(matches!(delete(&db, id, bob.id).await, Err(AppError::NotFound(_))));
        assert_eq!(list(&db, alice.id).await.unwrap().len(), 1);

        delete(&db, id, alice.id).await.unwrap();
        assert!(list(&db, alice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_media_keeps_schedule_with_null_reference() {
        let db = crate::db::test_db().await;
        let alice = testing::seed_user(&db, "alice", false).await;
        let media = testing::seed_media(&db, 550, "Fight Club").await;
        create(&db, alice.id, entry("Rewatch", "2030-05-01", Some(media.id))).await.unwrap();

        media::Entity::delete_by_id(media.id).exec(&db).await.unwrap();

        let events = list(&db, alice.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].extended_props.work_id, None);
        assert_eq!(events[0].extended_props.poster_path, None);
    }
}
