use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use super::{JsonBody, QueryParams, catalog_ref};
use crate::{
    AppState,
    auth::CurrentUser,
    entities::review,
    error::AppResult,
    models::{MediaReviews, RankingEntry, ReviewRow},
    reviews::{self, ReviewFilter},
};

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    rating: i32,
    comment: Option<String>,
}

pub async fn for_media(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
) -> AppResult<Json<MediaReviews>> {
    let (kind, tmdb_id) = catalog_ref(&kind, &id)?;
    Ok(Json(reviews::list_for_media(&state.db, &state.tmdb, kind, tmdb_id).await?))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((kind, id)): Path<(String, String)>,
    JsonBody(body): JsonBody<ReviewBody>,
) -> AppResult<(StatusCode, Json<review::Model>)> {
    let (kind, tmdb_id) = catalog_ref(&kind, &id)?;
    let review = reviews::post(
        &state.db,
        &state.tmdb,
        user.id,
        kind,
        tmdb_id,
        body.rating,
        body.comment.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn all(
    State(state): State<Arc<AppState>>,
    QueryParams(filter): QueryParams<ReviewFilter>,
) -> AppResult<Json<Vec<ReviewRow>>> {
    Ok(Json(reviews::list(&state.db, &filter).await?))
}

pub async fn ranking(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<RankingEntry>>> {
    Ok(Json(reviews::ranking(&state.db).await?))
}
