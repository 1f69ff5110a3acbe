//! Fixtures shared by the unit tests.

use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use crate::{
    db::now_sec,
    entities::{media, user},
    tmdb::TmdbClient,
    users::{self, NewUser},
};

pub fn mock_tmdb() -> TmdbClient {
    TmdbClient::new(
        reqwest::Client::new(),
        String::new(),
        "http://127.0.0.1:9".to_string(),
        "ja-JP".to_string(),
        100,
    )
}

pub async fn seed_user(db: &DatabaseConnection, username: &str, is_admin: bool) -> user::Model {
    users::create(
        db,
        NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "not-a-real-hash".to_string(),
            api_token: format!("token-{username}"),
            is_admin,
        },
    )
    .await
    .expect("seed user")
}

pub async fn seed_media(db: &DatabaseConnection, tmdb_id: i32, title: &str) -> media::Model {
    let now = now_sec();
    media::ActiveModel {
        id: Default::default(),
        tmdb_id: Set(tmdb_id),
        title: Set(title.to_string()),
        media_type: Set("movie".to_string()),
        release_date: Set(None),
        overview: Set(Some(format!("About {title}"))),
        poster_path: Set(Some(format!("/{tmdb_id}.jpg"))),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed media")
}
