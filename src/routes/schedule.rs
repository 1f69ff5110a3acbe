use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::{JsonBody, path_id};
use crate::{
    AppState,
    auth::CurrentUser,
    error::AppResult,
    models::CalendarEvent,
    schedule::{self, NewEntry},
};

pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<CalendarEvent>>> {
    Ok(Json(schedule::list(&state.db, user.id).await?))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    JsonBody(entry): JsonBody<NewEntry>,
) -> AppResult<(StatusCode, Json<CalendarEvent>)> {
    let event = schedule::create(&state.db, user.id, entry).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    schedule::delete(&state.db, path_id("id", &id)?, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
