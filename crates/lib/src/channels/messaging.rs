//! Messaging API seam: reply, push and message content.

use async_trait::async_trait;
use axum::body::Bytes;
use futures_util::stream::BoxStream;

/// Chunked binary content of one message.
pub type ContentStream = BoxStream<'static, Result<Bytes, LineError>>;

#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("line request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("reply token expired or already used")]
    ReplyTokenExpired,
    #[error("line api error: {status} {body}")]
    Api { status: u16, body: String },
}

/// Platform operations used by the pipeline. Implemented by `LineClient`; tests provide fakes.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    /// Reply with one text message using the single-use token of the triggering event.
    async fn reply_text(&self, reply_token: &str, text: &str) -> Result<(), LineError>;

    /// Push one text message to a user, group or room id.
    async fn push_text(&self, to: &str, text: &str) -> Result<(), LineError>;

    /// Open the binary content (e.g. image) of a message as a chunk stream.
    async fn message_content(&self, message_id: &str) -> Result<ContentStream, LineError>;
}
