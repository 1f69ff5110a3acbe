use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, sea_query::OnConflict};
use tracing::debug;

use crate::{
    db::now_sec,
    entities::media,
    error::{AppError, AppResult},
    models::MediaKind,
    tmdb::{Details, TmdbClient},
};

pub async fn find_by_external<C: ConnectionTrait>(
    conn: &C,
    tmdb_id: i32,
) -> AppResult<Option<media::Model>> {
    let media =
        media::Entity::find().filter(media::Column::TmdbId.eq(tmdb_id)).one(conn).await?;
    Ok(media)
}

pub async fn get<C: ConnectionTrait>(conn: &C, media_id: i32) -> AppResult<media::Model> {
    media::Entity::find_by_id(media_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("media"))
}

/// Returns the local record for a catalog title, creating it from TMDB
/// details on first reference. Existing records are returned as stored.
pub async fn resolve_or_create<C: ConnectionTrait>(
    conn: &C,
    tmdb: &TmdbClient,
    kind: MediaKind,
    tmdb_id: i32,
) -> AppResult<media::Model> {
    let details = fetch_if_missing(conn, tmdb, kind, tmdb_id).await?;
    materialize(conn, kind, tmdb_id, details.as_ref()).await
}

/// Catalog lookup half of [`resolve_or_create`]. Runs outside any write
/// transaction so the network call never holds a connection open.
pub async fn fetch_if_missing<C: ConnectionTrait>(
    conn: &C,
    tmdb: &TmdbClient,
    kind: MediaKind,
    tmdb_id: i32,
) -> AppResult<Option<Details>> {
    if let Some(existing) = find_by_external(conn, tmdb_id).await? {
        debug!(tmdb_id = tmdb_id, media_id = existing.id, "media already registered");
        return Ok(None);
    }

    match tmdb.get_details(kind, tmdb_id).await? {
        Some(details) => Ok(Some(details)),
        None => Err(AppError::not_found(format!("{kind} {tmdb_id}"))),
    }
}

/// Storage half of [`resolve_or_create`]: inserts from `details` when given,
/// then reads back the canonical row.
pub async fn materialize<C: ConnectionTrait>(
    conn: &C,
    kind: MediaKind,
    tmdb_id: i32,
    details: Option<&Details>,
) -> AppResult<media::Model> {
    if let Some(details) = details {
        insert_if_absent(conn, kind, tmdb_id, details).await?;
    }

    // A concurrent request may have won the insert; either way the row exists now.
    let media = find_by_external(conn, tmdb_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{kind} {tmdb_id}")))?;
    debug!(tmdb_id = tmdb_id, media_id = media.id, title = %media.title, "media resolved");
    Ok(media)
}

async fn insert_if_absent<C: ConnectionTrait>(
    conn: &C,
    kind: MediaKind,
    tmdb_id: i32,
    details: &Details,
) -> AppResult<()> {
    let now = now_sec();
    let model = media::ActiveModel {
        id: Default::default(),
        tmdb_id: Set(tmdb_id),
        title: Set(details.display_title()),
        media_type: Set(kind.as_str().to_string()),
        release_date: Set(details.first_release()),
        overview: Set(details.overview()),
        poster_path: Set(details.poster_path()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    media::Entity::insert(model)
        .on_conflict(OnConflict::column(media::Column::TmdbId).do_nothing().to_owned())
        .exec_without_returning(conn)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use sea_orm::PaginatorTrait;

    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn resolve_or_create_is_idempotent() {
        let db = crate::db::test_db().await;
        let tmdb = testing::mock_tmdb();

        let first = resolve_or_create(&db, &tmdb, MediaKind::Movie, 550).await.unwrap();
        let second = resolve_or_create(&db, &tmdb, MediaKind::Movie, 550).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first, second);
        assert_eq!(media::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn new_media_is_mapped_from_details() {
        let db = crate::db::test_db().await;
        let tmdb = testing::mock_tmdb();

        let show = resolve_or_create(&db, &tmdb, MediaKind::Tv, 1399).await.unwrap();
        assert_eq!(show.tmdb_id, 1399);
        assert_eq!(show.media_type, "tv");
        assert_eq!(show.title, "Mock tv 1399");
        assert_eq!(show.release_date.as_deref(), Some("2000-01-01"));
        assert_eq!(show.poster_path.as_deref(), Some("/mock-1399.jpg"));
    }

    #[tokio::test]
    async fn existing_media_is_never_refreshed() {
        let db = crate::db::test_db().await;
        let tmdb = testing::mock_tmdb();
        let seeded = testing::seed_media(&db, 603, "The Matrix").await;

        let resolved = resolve_or_create(&db, &tmdb, MediaKind::Movie, 603).await.unwrap();
        assert_eq!(resolved.id, seeded.id);
        assert_eq!(resolved.title, "The Matrix");
    }

    #[tokio::test]
    async fn conflicting_insert_keeps_first_row() {
        let db = crate::db::test_db().await;
        let seeded = testing::seed_media(&db, 13, "Forrest Gump").await;

        let details = Details { id: 13, title: Some("Other".into()), ..Default::default() };
        insert_if_absent(&db, MediaKind::Movie, 13, &details).await.unwrap();

        let stored = find_by_external(&db, 13).await.unwrap().unwrap();
        assert_eq!(stored.id, seeded.id);
        assert_eq!(stored.title, "Forrest Gump");
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let db = crate::db::test_db().await;
        assert!(matches!(get(&db, 42).await, Err(AppError::NotFound(_))));
    }
}
