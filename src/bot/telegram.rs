//! A small client for the Telegram Bot API, covering the methods the accountant uses.

use crate::bot::Sender;
use crate::error::Res;
use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::trace;

const API: &str = "https://api.telegram.org";

/// Only message updates are handled, everything else is not even delivered.
const ALLOWED_UPDATES: &[&str] = &["message"];

/// Calls Telegram Bot API methods with a bot token. Cheap to clone.
#[derive(Clone)]
pub(crate) struct Telegram {
    http: reqwest::Client,
    base: String,
}

impl std::fmt::Debug for Telegram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The base URL contains the bot token.
        f.debug_struct("Telegram").finish_non_exhaustive()
    }
}

impl Telegram {
    pub(crate) fn new(bot_token: &str) -> Res<Self> {
        if bot_token.trim().is_empty() {
            bail!("The Telegram bot token is empty");
        }
        let http = reqwest::Client::builder()
            .build()
            .context("Unable to build the HTTP client")?;
        Ok(Self {
            http,
            base: format!("{API}/bot{}", bot_token.trim()),
        })
    }

    /// Calls `method` with `params` as a JSON body and returns the `result` of the response.
    async fn call<P, R>(&self, method: &str, params: &P, timeout: Option<Duration>) -> Res<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        trace!("Calling Telegram method {method}");
        let mut request = self
            .http
            .post(format!("{}/{method}", self.base))
            .json(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response: ApiResponse<R> = request
            .send()
            .await
            .with_context(|| format!("Failed to call Telegram method {method}"))?
            .json()
            .await
            .with_context(|| format!("Failed to parse the response of Telegram method {method}"))?;
        response.into_result(method)
    }

    /// Long-polls for updates after `offset`. Waits up to `timeout` for something to arrive.
    pub(crate) async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Res<Vec<Update>> {
        let params = GetUpdates {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: ALLOWED_UPDATES,
        };
        // Give the HTTP request some slack beyond the long-poll timeout.
        self.call("getUpdates", &params, Some(timeout + Duration::from_secs(10)))
            .await
    }

    /// Replaces any existing webhook with one pointing at `url`. Pending updates are dropped.
    pub(crate) async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> Res<()> {
        self.delete_webhook().await?;
        let mut params = json!({
            "url": url,
            "allowed_updates": ALLOWED_UPDATES,
            "drop_pending_updates": true,
        });
        if let Some(secret_token) = secret_token {
            params["secret_token"] = json!(secret_token);
        }
        let _: bool = self.call("setWebhook", &params, None).await?;
        Ok(())
    }

    /// Removes the webhook and drops pending updates.
    pub(crate) async fn delete_webhook(&self) -> Res<()> {
        let _: bool = self
            .call("deleteWebhook", &json!({ "drop_pending_updates": true }), None)
            .await?;
        Ok(())
    }

    pub(crate) async fn webhook_info(&self) -> Res<WebhookInfo> {
        self.call("getWebhookInfo", &json!({}), None).await
    }
}

#[async_trait::async_trait]
impl Sender for Telegram {
    async fn send_message(&self, chat_id: i64, text: &str) -> Res<()> {
        let _: Message = self
            .call(
                "sendMessage",
                &json!({ "chat_id": chat_id, "text": text }),
                None,
            )
            .await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct GetUpdates<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

/// Every Bot API response has this envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<R> {
    ok: bool,
    result: Option<R>,
    description: Option<String>,
    error_code: Option<i64>,
}

impl<R> ApiResponse<R> {
    fn into_result(self, method: &str) -> Res<R> {
        if !self.ok {
            bail!(
                "Telegram method {method} failed with code {}: {}",
                self.error_code.unwrap_or_default(),
                self.description.unwrap_or_default()
            );
        }
        self.result
            .with_context(|| format!("Telegram method {method} returned no result"))
    }
}

/// An incoming update. Only messages are of interest, other kinds have `message: None`.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// What Telegram knows about the registered webhook.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct WebhookInfo {
    pub url: String,
    #[serde(default)]
    pub pending_update_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_updates: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_deserialize() {
        let json = r#"{
            "update_id": 10001,
            "message": {
                "message_id": 7,
                "date": 1760000000,
                "chat": {"id": 42, "type": "private", "first_name": "Ana"},
                "from": {"id": 42, "is_bot": false, "first_name": "Ana", "username": "ana"},
                "text": "Lunch 2.95"
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert_eq!(update.update_id, 10001);
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, 42);
        assert_eq!(message.text.as_deref(), Some("Lunch 2.95"));
        assert_eq!(message.from.unwrap().first_name, "Ana");
    }

    #[test]
    fn test_update_without_message() {
        let json = r#"{"update_id": 5, "edited_message": {"message_id": 1, "chat": {"id": 1}}}"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert!(update.message.is_none());
    }

    #[test]
    fn test_api_response_error() {
        let json = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;
        let response: ApiResponse<bool> = serde_json::from_str(json).unwrap();
        let err = response.into_result("getMe").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Telegram method getMe failed with code 401: Unauthorized"
        );
    }

    #[test]
    fn test_api_response_ok() {
        let json = r#"{"ok": true, "result": {"url": "https://example.com/hook", "pending_update_count": 2}}"#;
        let response: ApiResponse<WebhookInfo> = serde_json::from_str(json).unwrap();
        let info = response.into_result("getWebhookInfo").unwrap();
        assert_eq!(info.url, "https://example.com/hook");
        assert_eq!(info.pending_update_count, 2);
    }

    #[test]
    fn test_empty_token() {
        assert!(Telegram::new("  ").is_err());
        let telegram = Telegram::new("123:abc").unwrap();
        assert!(!format!("{telegram:?}").contains("abc"));
    }
}
