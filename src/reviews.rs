use jiff::{civil::Date, tz::TimeZone};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
    sea_query::{Expr, Func, SimpleExpr},
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    db::now_sec,
    entities::{media, review, user},
    error::{AppError, AppResult},
    models::{MediaKind, MediaReviews, RankingEntry, ReviewRow, ReviewWithUser, Reviewer},
    registry,
    tmdb::TmdbClient,
    validation::{self, ValidationError},
};

/// Filters for the review listings. Text filters match substrings; the date
/// bounds are inclusive calendar days in UTC.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewFilter {
    pub user_id: Option<i32>,
    pub username: Option<String>,
    pub media_title: Option<String>,
    pub rating_min: Option<i32>,
    pub rating_max: Option<i32>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

/// Posts a rating for a catalog title. The rating is checked before the
/// catalog or the store is touched.
pub async fn post(
    db: &DatabaseConnection,
    tmdb: &TmdbClient,
    user_id: i32,
    kind: MediaKind,
    tmdb_id: i32,
    rating: i32,
    comment: Option<&str>,
) -> AppResult<review::Model> {
    let rating = validation::rating(rating)?;
    let comment = validation::optional_text(comment);

    let details = registry::fetch_if_missing(db, tmdb, kind, tmdb_id).await?;

    let txn = db.begin().await?;
    let media = registry::materialize(&txn, kind, tmdb_id, details.as_ref()).await?;

    let now = now_sec();
    let review = review::ActiveModel {
        id: Default::default(),
        user_id: Set(user_id),
        media_id: Set(media.id),
        rating: Set(rating),
        comment: Set(comment),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(user_id = user_id, media_id = media.id, rating = rating, "review posted");
    Ok(review)
}

/// Reviews for one title with reviewer names. Creates the media record on
/// first reference, same as posting does.
pub async fn list_for_media<C: ConnectionTrait>(
    conn: &C,
    tmdb: &TmdbClient,
    kind: MediaKind,
    tmdb_id: i32,
) -> AppResult<MediaReviews> {
    let media = registry::resolve_or_create(conn, tmdb, kind, tmdb_id).await?;

    let rows = review::Entity::find()
        .filter(review::Column::MediaId.eq(media.id))
        .order_by_asc(review::Column::Id)
        .find_also_related(user::Entity)
        .all(conn)
        .await?;

    let reviews = rows
        .into_iter()
        .map(|(r, u)| ReviewWithUser {
            id: r.id,
            media_id: r.media_id,
            rating: r.rating,
            comment: r.comment,
            created_at: r.created_at,
            user: u.map(|u| Reviewer { id: u.id, username: u.username }),
        })
        .collect::<Vec<_>>();

    debug!(media_id = media.id, reviews = reviews.len(), "loaded reviews");
    Ok(MediaReviews { media, reviews })
}

/// Titles ordered by number of reviews, most reviewed first. Ties go to the
/// older media record.
pub async fn ranking<C: ConnectionTrait>(conn: &C) -> AppResult<Vec<RankingEntry>> {
    let average = Func::avg(Expr::col((review::Entity, review::Column::Rating)));

    let entries = review::Entity::find()
        .select_only()
        .column_as(media::Column::Id, "media_id")
        .column_as(media::Column::TmdbId, "tmdb_id")
        .column_as(media::Column::MediaType, "media_type")
        .column_as(media::Column::Title, "title")
        .column_as(media::Column::PosterPath, "poster_path")
        .column_as(review::Column::Id.count(), "review_count")
        .column_as(SimpleExpr::from(average), "average_rating")
        .join(JoinType::InnerJoin, review::Relation::Media.def())
        .group_by(media::Column::Id)
        .order_by_desc(Expr::cust("review_count"))
        .order_by_asc(media::Column::Id)
        .into_model::<RankingEntry>()
        .all(conn)
        .await?;

    Ok(entries)
}

pub async fn list<C: ConnectionTrait>(
    conn: &C,
    filter: &ReviewFilter,
) -> AppResult<Vec<ReviewRow>> {
    let date_from = filter.date_from.as_deref().map(validation::calendar_date).transpose()?;
    let date_to = filter.date_to.as_deref().map(validation::calendar_date).transpose()?;
    validation::date_range(date_from, date_to)?;
    let created_from = date_from.map(day_start).transpose()?;
    let created_before = date_to.map(day_after).transpose()?;

    let mut query = review::Entity::find()
        .select_only()
        .column_as(review::Column::Id, "id")
        .column_as(review::Column::UserId, "user_id")
        .column_as(user::Column::Username, "username")
        .column_as(review::Column::MediaId, "media_id")
        .column_as(media::Column::Title, "media_title")
        .column_as(review::Column::Rating, "rating")
        .column_as(review::Column::Comment, "comment")
        .column_as(review::Column::CreatedAt, "created_at")
        .column_as(review::Column::UpdatedAt, "updated_at")
        .join(JoinType::InnerJoin, review::Relation::User.def())
        .join(JoinType::InnerJoin, review::Relation::Media.def());

    if let Some(user_id) = filter.user_id {
        query = query.filter(review::Column::UserId.eq(user_id));
    }
    if let Some(username) = validation::optional_text(filter.username.as_deref()) {
        query = query.filter(user::Column::Username.contains(username));
    }
    if let Some(title) = validation::optional_text(filter.media_title.as_deref()) {
        query = query.filter(media::Column::Title.contains(title));
    }
    if let Some(min) = filter.rating_min {
        query = query.filter(review::Column::Rating.gte(min));
    }
    if let Some(max) = filter.rating_max {
        query = query.filter(review::Column::Rating.lte(max));
    }
    if let Some(from) = created_from {
        query = query.filter(review::Column::CreatedAt.gte(from));
    }
    if let Some(before) = created_before {
        query = query.filter(review::Column::CreatedAt.lt(before));
    }

    let rows = query
        .order_by_desc(review::Column::CreatedAt)
        .order_by_desc(review::Column::Id)
        .into_model::<ReviewRow>()
        .all(conn)
        .await?;
    Ok(rows)
}

pub async fn delete<C: ConnectionTrait>(conn: &C, review_id: i32) -> AppResult<()> {
    let res = review::Entity::delete_by_id(review_id).exec(conn).await?;
    if res.rows_affected == 0 {
        return Err(AppError::not_found("review"));
    }
    info!(review_id = review_id, "review deleted");
    Ok(())
}

/// Midnight UTC of `date` in unix seconds. Dates past the representable
/// timestamp range are rejected as invalid input.
fn day_start(date: Date) -> Result<i64, ValidationError> {
    date.to_zoned(TimeZone::UTC)
        .map(|zoned| zoned.timestamp().as_second())
        .map_err(|_| ValidationError::InvalidDate(date.to_string()))
}

/// Exclusive upper bound for an inclusive `date`.
fn day_after(date: Date) -> Result<i64, ValidationError> {
    let next = date.tomorrow().map_err(|_| ValidationError::InvalidDate(date.to_string()))?;
    day_start(next)
}
