use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{QueryParams, catalog_ref};
use crate::{
    AppState,
    auth::CurrentUser,
    error::{AppError, AppResult},
    membership,
    models::{MediaKind, MembershipView},
    registry,
    tmdb::ResultPage,
    validation,
};

const DEFAULT_SORT: &str = "popularity.desc";

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    query: Option<String>,
    page: Option<u32>,
    media_type: Option<String>,
    sort_by: Option<String>,
}

/// Keyword search when a query is given, otherwise a discover listing.
pub async fn search(
    State(state): State<Arc<AppState>>,
    QueryParams(q): QueryParams<SearchQuery>,
) -> AppResult<Json<ResultPage>> {
    let page = validation::page(q.page.unwrap_or(1))?;

    if let Some(query) = validation::optional_text(q.query.as_deref()) {
        return Ok(Json(state.tmdb.search_multi(&query, page).await?));
    }

    let kind = match validation::optional_text(q.media_type.as_deref()) {
        Some(kind) => validation::media_kind(&kind)?,
        None => MediaKind::Movie,
    };
    let sort_by = validation::optional_text(q.sort_by.as_deref());
    let results =
        state.tmdb.discover(kind, page, sort_by.as_deref().unwrap_or(DEFAULT_SORT)).await?;
    Ok(Json(results))
}

pub async fn details(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
    caller: Option<CurrentUser>,
) -> AppResult<Json<Value>> {
    let (kind, tmdb_id) = catalog_ref(&kind, &id)?;
    let details = state
        .tmdb
        .get_details(kind, tmdb_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{kind} {tmdb_id}")))?;

    let local = registry::find_by_external(&state.db, tmdb_id).await?;
    let is_registered = match &caller {
        Some(CurrentUser(user)) => membership::is_registered(&state.db, user.id, tmdb_id).await?,
        None => false,
    };

    let mut body = serde_json::to_value(&details).map_err(anyhow::Error::from)?;
    if let Value::Object(map) = &mut body {
        map.insert("media_type".into(), json!(kind));
        map.insert("local_id".into(), json!(local.map(|m| m.id)));
        map.insert("is_registered".into(), json!(is_registered));
    }
    Ok(Json(body))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((kind, id)): Path<(String, String)>,
) -> AppResult<(StatusCode, Json<MembershipView>)> {
    let (kind, tmdb_id) = catalog_ref(&kind, &id)?;
    let created = membership::register(&state.db, &state.tmdb, user.id, kind, tmdb_id).await?;
    Ok((StatusCode::CREATED, Json(MembershipView::from(&created))))
}

pub async fn is_registered(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((kind, id)): Path<(String, String)>,
) -> AppResult<Json<Value>> {
    let (_, tmdb_id) = catalog_ref(&kind, &id)?;
    let registered = membership::is_registered(&state.db, user.id, tmdb_id).await?;
    Ok(Json(json!({ "isRegistered": registered })))
}
