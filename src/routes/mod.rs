use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts},
    routing::{delete, get, post},
};
use serde_json::{Value, json};

use crate::{
    AppState,
    error::{AppError, AppResult},
    models::MediaKind,
    validation::{self, ValidationError},
};

mod admin;
mod media;
mod reviews;
mod schedule;
mod user;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/media/search", get(media::search))
        .route("/media/{kind}/{id}", get(media::details))
        .route("/media/{kind}/{id}/register", post(media::register))
        .route("/media/{kind}/{id}/is-registered", get(media::is_registered))
        .route("/media/{kind}/{id}/reviews", get(reviews::for_media).post(reviews::create))
        .route("/reviews", get(reviews::all))
        .route("/reviews/ranking", get(reviews::ranking))
        .route("/schedule", get(schedule::list).post(schedule::create))
        .route("/schedule/{id}", delete(schedule::remove))
        .route("/user", get(user::profile).put(user::update).delete(user::remove))
        .route("/user/registered-works", get(user::registered_works))
        .route("/user/registered-works/{id}", delete(user::unregister))
        .route("/reminders", post(user::set_reminder))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}", delete(admin::delete_user))
        .route("/admin/reviews", get(admin::list_reviews))
        .route("/admin/reviews/{id}", delete(admin::delete_review))
        .with_state(state)
}

/// JSON request body; malformed payloads are rejected with the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Parses the `{kind}/{id}` pair used by the catalog routes.
fn catalog_ref(kind: &str, id: &str) -> AppResult<(MediaKind, i32)> {
    let kind = validation::media_kind(kind)?;
    Ok((kind, path_id("id", id)?))
}

fn path_id(field: &'static str, raw: &str) -> AppResult<i32> {
    let id = raw.parse::<i32>().map_err(|_| ValidationError::InvalidId(field))?;
    Ok(validation::positive_id(field, id)?)
}
