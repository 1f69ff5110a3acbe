use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use jiff::Timestamp;
use serde::Deserialize;

use super::{JsonBody, path_id};
use crate::{
    AppState,
    auth::CurrentUser,
    entities::user,
    error::AppResult,
    membership,
    models::{MediaWithMembership, MembershipView},
    users, validation,
};

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    username: String,
    email: String,
}

#[derive(Debug, Deserialize)]
pub struct ReminderRequest {
    work_id: i32,
    reminder_time: Timestamp,
    notification_type: Option<i32>,
}

pub async fn profile(CurrentUser(user): CurrentUser) -> Json<user::Model> {
    Json(user)
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody<ProfileUpdate>,
) -> AppResult<Json<user::Model>> {
    let updated = users::update_profile(&state.db, &user, &body.username, &body.email).await?;
    Ok(Json(updated))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<StatusCode> {
    users::delete(&state.db, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn registered_works(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<MediaWithMembership>>> {
    Ok(Json(membership::list_for_user(&state.db, user.id).await?))
}

pub async fn unregister(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    membership::remove(&state.db, path_id("id", &id)?, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_reminder(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    JsonBody(req): JsonBody<ReminderRequest>,
) -> AppResult<Json<MembershipView>> {
    let media_id = validation::positive_id("work_id", req.work_id)?;
    let updated = membership::set_reminder(
        &state.db,
        user.id,
        media_id,
        req.reminder_time,
        req.notification_type,
        Timestamp::now(),
    )
    .await?;
    Ok(Json(MembershipView::from(&updated)))
}
