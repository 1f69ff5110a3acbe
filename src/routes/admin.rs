use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::{QueryParams, path_id};
use crate::{
    AppState,
    auth::AdminUser,
    entities::user,
    error::AppResult,
    models::ReviewRow,
    reviews::{self, ReviewFilter},
    users::{self, UserFilter},
};

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    QueryParams(filter): QueryParams<UserFilter>,
) -> AppResult<Json<Vec<user::Model>>> {
    Ok(Json(users::list(&state.db, &filter).await?))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    users::admin_delete(&state.db, &admin, path_id("id", &id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    QueryParams(filter): QueryParams<ReviewFilter>,
) -> AppResult<Json<Vec<ReviewRow>>> {
    Ok(Json(reviews::list(&state.db, &filter).await?))
}

pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let review_id = path_id("id", &id)?;
    reviews::delete(&state.db, review_id).await?;
    tracing::info!(admin_id = admin.id, review_id = review_id, "review removed by admin");
    Ok(StatusCode::NO_CONTENT)
}
