//! Slack Events API adapter
//!
//! Only direct messages from humans are handled. Replies are posted back
//! to the same conversation with `chat.postMessage`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::config::SlackConfig;
use crate::domain::CommandRequest;
use crate::domain::command::TRIGGER;
use crate::error::{BridgeError, Result};

/// Top-level payload posted by Slack to the events endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEnvelope {
    UrlVerification { challenge: String },
    EventCallback { event: SlackEvent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// What the events endpoint should do with a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackAction {
    /// Echo the challenge as the response body
    Challenge(String),
    /// Dispatch `request` and post the reply to `channel`
    Dispatch {
        channel: String,
        request: CommandRequest,
    },
    Ignore,
}

/// Decide how to handle one events payload
///
/// Slack turns a leading `/` into a slash command, so users may type
/// commands with or without it; the trigger is always restored.
#[must_use]
pub fn classify(envelope: SlackEnvelope) -> SlackAction {
    match envelope {
        SlackEnvelope::UrlVerification { challenge } => SlackAction::Challenge(challenge),
        SlackEnvelope::EventCallback { event } => {
            let is_dm = event.kind == "message" && event.channel_type.as_deref() == Some("im");
            if !is_dm || event.bot_id.is_some() {
                return SlackAction::Ignore;
            }
            let (Some(channel), Some(text)) = (event.channel, event.text) else {
                return SlackAction::Ignore;
            };
            let text = text.trim();
            let cleaned = text.strip_prefix(TRIGGER).unwrap_or(text);
            SlackAction::Dispatch {
                channel,
                request: CommandRequest::from_user(format!("{TRIGGER}{cleaned}")),
            }
        }
        SlackEnvelope::Other => SlackAction::Ignore,
    }
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SlackApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Minimal Slack Web API client
pub struct SlackClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<Zeroizing<String>>,
}

impl SlackClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &SlackConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BridgeError::Http {
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
        })
    }

    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Post `text` to `channel`
    ///
    /// # Errors
    ///
    /// Returns an error if no bot token is configured, the request fails,
    /// or Slack answers `ok: false`.
    pub async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        let token = self.token.as_ref().ok_or_else(|| BridgeError::Http {
            reason: "SLACK_BOT_TOKEN is not configured".to_string(),
        })?;

        let resp = self
            .http
            .post(format!("{}/chat.postMessage", self.api_url))
            .bearer_auth(token.as_str())
            .json(&PostMessage { channel, text })
            .send()
            .await
            .map_err(|e| BridgeError::Http {
                reason: format!("chat.postMessage: {e}"),
            })?;

        let body: SlackApiResponse = resp.json().await.map_err(|e| BridgeError::Http {
            reason: format!("chat.postMessage response: {e}"),
        })?;

        if body.ok {
            Ok(())
        } else {
            Err(BridgeError::Http {
                reason: format!(
                    "Slack API error: {}",
                    body.error.as_deref().unwrap_or("unknown")
                ),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: serde_json::Value) -> SlackEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_url_verification() {
        let action = classify(envelope(json!({
            "type": "url_verification",
            "token": "legacy",
            "challenge": "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P"
        })));
        assert_eq!(
            action,
            SlackAction::Challenge("3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P".to_string())
        );
    }

    #[test]
    fn test_dm_without_slash_gets_trigger() {
        let action = classify(envelope(json!({
            "type": "event_callback",
            "event": {"type": "message", "channel_type": "im", "channel": "D123", "text": " df "}
        })));
        assert_eq!(
            action,
            SlackAction::Dispatch {
                channel: "D123".to_string(),
                request: CommandRequest::from_user("/df"),
            }
        );
    }

    #[test]
    fn test_dm_with_slash_is_not_doubled() {
        let action = classify(envelope(json!({
            "type": "event_callback",
            "event": {"type": "message", "channel_type": "im", "channel": "D123", "text": "/getlog /var/log/app.log"}
        })));
        let SlackAction::Dispatch { request, .. } = action else {
            panic!("Expected Dispatch");
        };
        assert_eq!(request.raw_text, "/getlog /var/log/app.log");
    }

    #[test]
    fn test_bot_messages_ignored() {
        let action = classify(envelope(json!({
            "type": "event_callback",
            "event": {"type": "message", "channel_type": "im", "channel": "D123", "text": "✅ Résultat:", "bot_id": "B1"}
        })));
        assert_eq!(action, SlackAction::Ignore);
    }

    #[test]
    fn test_channel_messages_ignored() {
        let action = classify(envelope(json!({
            "type": "event_callback",
            "event": {"type": "message", "channel_type": "channel", "channel": "C123", "text": "/df"}
        })));
        assert_eq!(action, SlackAction::Ignore);
    }

    #[test]
    fn test_unknown_envelope_ignored() {
        let action = classify(envelope(json!({"type": "app_rate_limited", "minute_rate_limited": 1})));
        assert_eq!(action, SlackAction::Ignore);
    }

    #[tokio::test]
    async fn test_post_without_token_fails() {
        let client = SlackClient::new(&SlackConfig::default()).unwrap();
        assert!(!client.has_token());
        let err = client.post_message("D123", "hi").await.unwrap_err();
        assert!(err.to_string().contains("SLACK_BOT_TOKEN"));
    }
}
