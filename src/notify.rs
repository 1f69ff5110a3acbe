use futures::{FutureExt, future::BoxFuture};
use jiff::Timestamp;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::entities::user;

/// Everything a notification channel needs to tell a user that a title is due.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReminderPayload {
    pub membership_id: i32,
    pub media_id: i32,
    pub tmdb_id: i32,
    pub media_type: String,
    pub title: String,
    pub poster_path: Option<String>,
    pub reminder_time: Timestamp,
    pub notification_type: Option<i32>,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification endpoint answered {0}")]
    Rejected(reqwest::StatusCode),
}

pub trait Notifier: Send + Sync {
    fn send<'a>(
        &'a self,
        user: &'a user::Model,
        payload: &'a ReminderPayload,
    ) -> BoxFuture<'a, Result<(), NotifyError>>;
}

/// Emits reminders as log events. Used when no webhook is configured.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send<'a>(
        &'a self,
        user: &'a user::Model,
        payload: &'a ReminderPayload,
    ) -> BoxFuture<'a, Result<(), NotifyError>> {
        tracing::info!(
            user_id = user.id,
            email = %user.email,
            membership_id = payload.membership_id,
            tmdb_id = payload.tmdb_id,
            title = %payload.title,
            notification_type = ?payload.notification_type,
            "reminder due"
        );
        futures::future::ready(Ok(())).boxed()
    }
}

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

impl Notifier for WebhookNotifier {
    fn send<'a>(
        &'a self,
        user: &'a user::Model,
        payload: &'a ReminderPayload,
    ) -> BoxFuture<'a, Result<(), NotifyError>> {
        async move {
            let body = json!({
                "user": { "id": user.id, "username": user.username, "email": user.email },
                "reminder": payload,
            });
            let resp = self.client.post(&self.url).json(&body).send().await?;
            if !resp.status().is_success() {
                return Err(NotifyError::Rejected(resp.status()));
            }
            tracing::debug!(
                user_id = user.id,
                membership_id = payload.membership_id,
                "webhook delivered"
            );
            Ok(())
        }
        .boxed()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> ReminderPayload {
        ReminderPayload {
            membership_id: 1,
            media_id: 2,
            tmdb_id: 550,
            media_type: "movie".into(),
            title: "Fight Club".into(),
            poster_path: None,
            reminder_time: Timestamp::from_second(1_900_000_000).unwrap(),
            notification_type: Some(1),
        }
    }

    fn user() -> user::Model {
        user::Model {
            id: 7,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: String::new(),
            api_token: "t".into(),
            is_admin: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        LogNotifier.send(&user(), &payload()).await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_webhook_is_a_transport_error() {
        let notifier =
            WebhookNotifier::new(reqwest::Client::new(), "http://127.0.0.1:9/hook".into());
        let err = notifier.send(&user(), &payload()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Transport(_)));
    }

    #[test]
    fn payload_serializes_fire_time_as_rfc3339() {
        let json = serde_json::to_value(payload()).unwrap();
        assert_eq!(json["reminder_time"], "2030-03-17T17:46:40Z");
        assert_eq!(json["tmdb_id"], 550);
    }
}
