use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::CookieJar;

use crate::{
    AppState,
    entities::user,
    error::{AppError, AppResult},
    users,
};

pub const SESSION_COOKIE: &str = "session";

/// The caller, resolved from a bearer token or the session cookie.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub user::Model);

/// A caller holding the admin flag.
#[derive(Clone, Debug)]
pub struct AdminUser(pub user::Model);

fn credential(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(&parts.headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().trim().to_string())
        .filter(|t| !t.is_empty())
}

async fn resolve(parts: &Parts, state: &AppState) -> AppResult<Option<user::Model>> {
    match credential(parts) {
        Some(token) => users::find_by_token(&state.db, &token).await,
        None => Ok(None),
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, state).await?.map(CurrentUser).ok_or(AppError::Unauthorized)
    }
}

impl OptionalFromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(resolve(parts, state).await?.map(CurrentUser))
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) =
            <CurrentUser as FromRequestParts<Arc<AppState>>>::from_request_parts(parts, state)
                .await?;
        if !user.is_admin {
            return Err(AppError::Forbidden("administrator access required".into()));
        }
        Ok(AdminUser(user))
    }
}
