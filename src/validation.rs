//! Input checks shared by the HTTP layer and the ledgers.
//!
//! Every check returns a typed [`ValidationError`] and runs before any write
//! or catalog call, so a rejected request leaves no trace in the store.

use jiff::{Timestamp, civil::Date};
use thiserror::Error;

use crate::models::MediaKind;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;
pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_PAGE: u32 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(i32),

    #[error("media type must be `movie` or `tv`, got `{0}`")]
    InvalidMediaKind(String),

    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("page must be between 1 and 500, got {0}")]
    InvalidPage(u32),

    #[error("`{0}` is not a valid calendar date (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("`{0}` is not a valid email address")]
    InvalidEmail(String),

    #[error("{0} must be a positive id")]
    InvalidId(&'static str),

    #[error("reminder time must be in the future")]
    ReminderNotInFuture,

    #[error("date_from must not be after date_to")]
    InvertedDateRange,

    #[error("unknown notification type {0}")]
    InvalidNotificationType(i32),

    #[error("malformed request: {0}")]
    MalformedRequest(String),
}

pub fn rating(value: i32) -> Result<i32, ValidationError> {
    if (MIN_RATING..=MAX_RATING).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::RatingOutOfRange(value))
    }
}

pub fn media_kind(value: &str) -> Result<MediaKind, ValidationError> {
    MediaKind::parse(value).ok_or_else(|| ValidationError::InvalidMediaKind(value.to_string()))
}

/// Trims `value` and rejects it when empty or longer than `max` characters.
pub fn required_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required(field));
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(value.to_string())
}

/// Trims optional free text, mapping blank input to `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

pub fn page(value: u32) -> Result<u32, ValidationError> {
    if (1..=MAX_PAGE).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::InvalidPage(value))
    }
}

pub fn positive_id(field: &'static str, value: i32) -> Result<i32, ValidationError> {
    if value > 0 { Ok(value) } else { Err(ValidationError::InvalidId(field)) }
}

pub fn calendar_date(value: &str) -> Result<Date, ValidationError> {
    value.trim().parse::<Date>().map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

pub fn email(value: &str) -> Result<String, ValidationError> {
    let value = required_text("email", value, MAX_TITLE_LEN)?;
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        },
        None => false,
    };
    if valid { Ok(value) } else { Err(ValidationError::InvalidEmail(value)) }
}

pub fn reminder_time(when: Timestamp, now: Timestamp) -> Result<Timestamp, ValidationError> {
    if when > now { Ok(when) } else { Err(ValidationError::ReminderNotInFuture) }
}

pub fn date_range(from: Option<Date>, to: Option<Date>) -> Result<(), ValidationError> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(ValidationError::InvertedDateRange),
        _ => Ok(()),
    }
}
