use jiff::Timestamp;
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use crate::entities::{media, user_media};

/// Membership status assigned on registration.
pub const STATUS_ACTIVE: i32 = 1;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "movie" => Some(MediaKind::Movie),
            "tv" => Some(MediaKind::Tv),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum NotificationType {
    Email,
    Push,
}

impl NotificationType {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(NotificationType::Email),
            2 => Some(NotificationType::Push),
            _ => None,
        }
    }
}

/// Membership state as exposed alongside its media record.
#[derive(Clone, Debug, Serialize)]
pub struct MembershipView {
    pub id: i32,
    pub status: i32,
    pub reminder_time: Option<Timestamp>,
    pub notification_type: Option<i32>,
}

impl From<&user_media::Model> for MembershipView {
    fn from(m: &user_media::Model) -> Self {
        Self {
            id: m.id,
            status: m.status,
            reminder_time: m.reminder_at.and_then(|s| Timestamp::from_second(s).ok()),
            notification_type: m.notification_type,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MediaWithMembership {
    #[serde(flatten)]
    pub media: media::Model,
    pub membership: MembershipView,
}

/// Reviewer identity attached to a review; never carries credentials.
#[derive(Clone, Debug, Serialize)]
pub struct Reviewer {
    pub id: i32,
    pub username: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReviewWithUser {
    pub id: i32,
    pub media_id: i32,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: i64,
    pub user: Option<Reviewer>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MediaReviews {
    pub media: media::Model,
    pub reviews: Vec<ReviewWithUser>,
}

#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
pub struct RankingEntry {
    pub media_id: i32,
    pub tmdb_id: i32,
    pub media_type: String,
    pub title: String,
    pub poster_path: Option<String>,
    pub review_count: i64,
    pub average_rating: f64,
}

/// Review flattened with the reviewer's name and the media title.
#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
pub struct ReviewRow {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub media_id: i32,
    pub media_title: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub title: String,
    pub start: String,
    pub all_day: bool,
    pub extended_props: CalendarExtras,
}

#[derive(Clone, Debug, Serialize)]
pub struct CalendarExtras {
    pub id: i32,
    pub work_id: Option<i32>,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
}
