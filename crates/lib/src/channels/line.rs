//! LINE channel: Messaging API client (reply, push, content) and webhook payload types.

use crate::channels::messaging::{ContentStream, LineError, MessagingApi};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;

const LINE_API_BASE: &str = "https://api.line.me";
const LINE_DATA_API_BASE: &str = "https://api-data.line.me";

/// Webhook POST body.
#[derive(Debug, Deserialize)]
pub struct LineWebhookBody {
    #[serde(default)]
    pub events: Vec<LineEvent>,
}

/// One webhook event. Only the fields the bot reads are modelled; unknown event types parse
/// with most fields absent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineEvent {
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<LineSource>,
    #[serde(default)]
    pub message: Option<LineMessage>,
    /// Stable id for the delivery, repeated on redelivery.
    #[serde(default)]
    pub webhook_event_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSource {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}

impl LineSource {
    /// Id usable as a push target. Users first, then the group or room the message came from.
    pub fn recipient_id(&self) -> Option<String> {
        self.user_id
            .clone()
            .or_else(|| self.group_id.clone())
            .or_else(|| self.room_id.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct LineMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub typ: String,
}

/// LINE Messaging API client authenticated with a channel access token.
pub struct LineClient {
    access_token: String,
    api_base: String,
    data_api_base: String,
    client: reqwest::Client,
}

impl LineClient {
    pub fn new(
        access_token: impl Into<String>,
        api_base: Option<String>,
        data_api_base: Option<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            api_base: api_base
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| LINE_API_BASE.to_string()),
            data_api_base: data_api_base
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| LINE_DATA_API_BASE.to_string()),
            client: reqwest::Client::new(),
        }
    }

    /// POST a JSON body to a Messaging API path and map non-2xx statuses to `LineError`.
    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<(), LineError> {
        let url = format!("{}{}", self.api_base, path);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(api_error(status, body));
        }
        Ok(())
    }
}

/// Invalid reply tokens come back as 400 with this message.
fn api_error(status: u16, body: String) -> LineError {
    if status == 400 && body.contains("Invalid reply token") {
        LineError::ReplyTokenExpired
    } else {
        LineError::Api { status, body }
    }
}

fn text_messages(text: &str) -> serde_json::Value {
    serde_json::json!([{ "type": "text", "text": text }])
}

#[async_trait]
impl MessagingApi for LineClient {
    async fn reply_text(&self, reply_token: &str, text: &str) -> Result<(), LineError> {
        let body = serde_json::json!({
            "replyToken": reply_token,
            "messages": text_messages(text),
        });
        self.post_json("/v2/bot/message/reply", &body).await
    }

    async fn push_text(&self, to: &str, text: &str) -> Result<(), LineError> {
        let body = serde_json::json!({
            "to": to,
            "messages": text_messages(text),
        });
        self.post_json("/v2/bot/message/push", &body).await
    }

    async fn message_content(&self, message_id: &str) -> Result<ContentStream, LineError> {
        let url = format!(
            "{}/v2/bot/message/{}/content",
            self.data_api_base, message_id
        );
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(api_error(status, body));
        }
        Ok(res
            .bytes_stream()
            .map(|chunk| chunk.map_err(LineError::Request))
            .boxed())
    }
}
