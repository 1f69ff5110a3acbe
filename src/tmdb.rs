use std::{num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::{error::AppResult, models::MediaKind};

const UNKNOWN_TITLE: &str = "Unknown title";

pub struct TmdbClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
    language: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(
        client: reqwest::Client,
        access_token: String,
        base_url: String,
        language: String,
        rps: u32,
    ) -> Self {
        if access_token.trim().is_empty() {
            tracing::warn!("Using mock TMDB data - no TMDB_ACCESS_TOKEN provided");
        }

        let rps = NonZeroU32::new(rps.max(1)).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));
        Self { client, access_token, base_url, language, limiter }
    }

    fn is_mock(&self) -> bool {
        self.access_token.trim().is_empty()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    pub async fn search_multi(&self, query: &str, page: u32) -> AppResult<ResultPage> {
        if self.is_mock() {
            return Ok(mock_page(page, MediaKind::Movie, query));
        }

        self.limiter.until_ready().await;
        tracing::debug!(query = %query, page = page, "searching TMDB");

        let page_param = page.to_string();
        let resp: ResultPage = self
            .client
            .get(self.url("search/multi"))
            .bearer_auth(&self.access_token)
            .query(&[
                ("query", query),
                ("page", page_param.as_str()),
                ("language", self.language.as_str()),
                ("include_adult", "false"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp)
    }

    pub async fn discover(
        &self,
        kind: MediaKind,
        page: u32,
        sort_by: &str,
    ) -> AppResult<ResultPage> {
        if self.is_mock() {
            return Ok(mock_page(page, kind, sort_by));
        }

        self.limiter.until_ready().await;
        tracing::debug!(kind = %kind, page = page, sort_by = %sort_by, "discovering on TMDB");

        let page_param = page.to_string();
        let resp: ResultPage = self
            .client
            .get(self.url(&format!("discover/{}", kind.as_str())))
            .bearer_auth(&self.access_token)
            .query(&[
                ("sort_by", sort_by),
                ("page", page_param.as_str()),
                ("language", self.language.as_str()),
                ("include_adult", "false"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp)
    }

    /// Fetches a title's details; `None` when TMDB does not know the id.
    pub async fn get_details(&self, kind: MediaKind, tmdb_id: i32) -> AppResult<Option<Details>> {
        if self.is_mock() {
            return Ok(Some(mock_details(kind, tmdb_id)));
        }

        self.limiter.until_ready().await;
        tracing::debug!(kind = %kind, tmdb_id = tmdb_id, "fetching TMDB details");

        let resp = self
            .client
            .get(self.url(&format!("{}/{}", kind.as_str(), tmdb_id)))
            .bearer_auth(&self.access_token)
            .query(&[("language", self.language.as_str())])
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let details: Details = resp.error_for_status()?.json().await?;
        Ok(Some(details))
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ResultPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

/// Detail record for a movie or show. Fields the registry does not map are
/// kept in `extra` and passed through to clients untouched.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Details {
    pub id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Details {
    /// Movies carry `title`, shows carry `name`.
    pub fn display_title(&self) -> String {
        non_empty(self.title.as_deref())
            .or_else(|| non_empty(self.name.as_deref()))
            .unwrap_or(UNKNOWN_TITLE)
            .to_string()
    }

    pub fn first_release(&self) -> Option<String> {
        non_empty(self.release_date.as_deref())
            .or_else(|| non_empty(self.first_air_date.as_deref()))
            .map(str::to_string)
    }

    pub fn overview(&self) -> Option<String> {
        non_empty(self.overview.as_deref()).map(str::to_string)
    }

    pub fn poster_path(&self) -> Option<String> {
        non_empty(self.poster_path.as_deref()).map(str::to_string)
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn mock_details(kind: MediaKind, tmdb_id: i32) -> Details {
    let title = format!("Mock {kind} {tmdb_id}");
    let (title, name, release_date, first_air_date) = match kind {
        MediaKind::Movie => (Some(title), None, Some("2000-01-01".to_string()), None),
        MediaKind::Tv => (None, Some(title), None, Some("2000-01-01".to_string())),
    };
    Details {
        id: tmdb_id,
        title,
        name,
        release_date,
        first_air_date,
        overview: Some("Mock overview".to_string()),
        poster_path: Some(format!("/mock-{tmdb_id}.jpg")),
        extra: Map::new(),
    }
}

fn mock_page(page: u32, kind: MediaKind, hint: &str) -> ResultPage {
    ResultPage {
        page,
        results: vec![json!({
            "id": 550,
            "media_type": kind.as_str(),
            "title": format!("Mock result for {hint}"),
            "poster_path": "/mock-550.jpg",
        })],
        total_pages: 1,
        total_results: 1,
    }
}
