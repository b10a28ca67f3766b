use reqwest::Client as HttpClient;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{ContentItem, User},
};

const FCM_API_URL: &str = "https://fcm.googleapis.com/v1/projects";

/// Notification shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl PushMessage {
    /// Announcement for a newly added catalog item
    pub fn new_content(item: &ContentItem) -> Self {
        Self {
            title: "New video added".to_string(),
            body: item.title.clone(),
            image: item.thumbnail_url.clone(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, token: &str, message: &PushMessage) -> AppResult<()>;
}

/// Firebase Cloud Messaging over the HTTP v1 API
pub struct FcmSender {
    client: HttpClient,
    project_id: String,
    access_token: String,
}

impl FcmSender {
    pub fn new(project_id: String, access_token: String) -> Self {
        Self {
            client: HttpClient::new(),
            project_id,
            access_token,
        }
    }
}

#[async_trait::async_trait]
impl PushSender for FcmSender {
    async fn send(&self, token: &str, message: &PushMessage) -> AppResult<()> {
        let url = format!("{}/{}/messages:send", FCM_API_URL, self.project_id);
        let body = json!({
            "message": {
                "token": token,
                "notification": message,
            }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "FCM returned status {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}

/// Used when push credentials are not configured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledPushSender;

#[async_trait::async_trait]
impl PushSender for DisabledPushSender {
    async fn send(&self, _token: &str, _message: &PushMessage) -> AppResult<()> {
        tracing::debug!("Push delivery disabled, dropping notification");
        Ok(())
    }
}

/// Sends the new-content notification to every user holding a token
///
/// Failures are logged per user; returns how many deliveries succeeded.
pub async fn announce_new_content(
    users: &[User],
    sender: Arc<dyn PushSender>,
    item: &ContentItem,
) -> usize {
    let message = PushMessage::new_content(item);
    let mut delivered = 0;

    for user in users {
        let Some(token) = user.fcm_token.as_deref().filter(|t| !t.is_empty()) else {
            continue;
        };
        match sender.send(token, &message).await {
            Ok(()) => delivered += 1,
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user.id, "Push notification failed");
            }
        }
    }

    tracing::info!(item_id = %item.id, delivered, "New content announced");
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn user(id: &str, token: Option<&str>) -> User {
        User {
            id: id.to_string(),
            name: id.to_string(),
            coins: 0,
            fcm_token: token.map(String::from),
        }
    }

    fn item() -> ContentItem {
        ContentItem {
            id: "m1".to_string(),
            title: "Inception".to_string(),
            thumbnail_url: Some("poster.jpg".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_content_message() {
        let message = PushMessage::new_content(&item());
        assert_eq!(message.title, "New video added");
        assert_eq!(message.body, "Inception");
        assert_eq!(message.image.as_deref(), Some("poster.jpg"));
    }

    #[tokio::test]
    async fn test_announce_counts_successes_and_skips_tokenless_users() {
        let mut sender = MockPushSender::new();
        sender
            .expect_send()
            .with(eq("good"), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Ok(()));
        sender
            .expect_send()
            .with(eq("stale"), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Err(AppError::ExternalApi("unregistered".to_string())));

        let users = vec![
            user("a", Some("good")),
            user("b", None),
            user("c", Some("stale")),
            user("d", Some("")),
        ];

        let delivered = announce_new_content(&users, Arc::new(sender), &item()).await;
        assert_eq!(delivered, 1);
    }
}
