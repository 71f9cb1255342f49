//! Image message pipeline: interim reply, download, encode, classify, format, push.
//!
//! Every stage returns a typed result and every terminal state ends in exactly one push
//! attempt. Nothing here panics or propagates; failures are logged.

use crate::channels::{InboundEvent, LineError, MessagingApi};
use crate::image;
use crate::llm::{ImageClassifier, UNAVAILABLE_SENTINEL};
use crate::verdict;
use std::fmt;
use std::sync::Arc;

pub const INTERIM_MESSAGE: &str = "🔍 收到圖片！AI 分析中，請稍候 10-20 秒...";
pub const DOWNLOAD_FAILED_MESSAGE: &str = "❌ 圖片下載失敗，請重新傳送圖片。";
pub const ENCODE_FAILED_MESSAGE: &str = "❌ 圖片處理失敗，請確認傳送的是有效的圖片。";

/// Per-event progress, logged as the pipeline advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Acknowledged,
    Fetching,
    FetchFailed,
    Fetched,
    Classifying,
    Classified,
    Formatting,
    Replied,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Received => "received",
            Stage::Acknowledged => "acknowledged",
            Stage::Fetching => "fetching",
            Stage::FetchFailed => "fetch_failed",
            Stage::Fetched => "fetched",
            Stage::Classifying => "classifying",
            Stage::Classified => "classified",
            Stage::Formatting => "formatting",
            Stage::Replied => "replied",
        };
        f.write_str(s)
    }
}

/// How the pipeline ended for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Classification result pushed.
    Replied,
    /// Image could not be downloaded.
    DownloadFailed,
    /// Downloaded content was not a usable image.
    EncodeFailed,
    /// Model call failed; the degraded verdict was pushed.
    ServiceUnavailable,
}

/// Outcome plus delivery status of the interim and final messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineReport {
    pub outcome: Outcome,
    pub interim_sent: bool,
    pub final_delivered: bool,
}

/// Services for one image event. Built once at startup and shared across tasks.
#[derive(Clone)]
pub struct Pipeline {
    messaging: Arc<dyn MessagingApi>,
    classifier: Arc<dyn ImageClassifier>,
}

impl Pipeline {
    pub fn new(messaging: Arc<dyn MessagingApi>, classifier: Arc<dyn ImageClassifier>) -> Self {
        Self {
            messaging,
            classifier,
        }
    }

    fn advance(&self, event: &InboundEvent, stage: Stage) {
        log::debug!("message {}: {}", event.message_id, stage);
    }

    /// Run the whole pipeline for one image event.
    pub async fn run(&self, event: &InboundEvent) -> PipelineReport {
        self.advance(event, Stage::Received);
        let interim_sent = match self
            .messaging
            .reply_text(&event.reply_token, INTERIM_MESSAGE)
            .await
        {
            Ok(()) => true,
            Err(LineError::ReplyTokenExpired) => {
                log::warn!(
                    "message {}: reply token expired, skipping interim reply",
                    event.message_id
                );
                false
            }
            Err(e) => {
                log::warn!("message {}: interim reply failed: {}", event.message_id, e);
                false
            }
        };
        self.advance(event, Stage::Acknowledged);

        let (outcome, text) = self.classify_event(event).await;
        let final_delivered = self.push_final(event, &text).await;
        match outcome {
            Outcome::Replied if final_delivered => {
                self.advance(event, Stage::Replied);
                log::info!("message {}: analysis complete and pushed", event.message_id);
            }
            _ => log::info!("message {}: finished with {:?}", event.message_id, outcome),
        }
        PipelineReport {
            outcome,
            interim_sent,
            final_delivered,
        }
    }

    /// Fetch, encode, classify and format. Returns the outcome and the final text to push.
    async fn classify_event(&self, event: &InboundEvent) -> (Outcome, String) {
        self.advance(event, Stage::Fetching);
        let Some(bytes) = image::download(&event.message_id, self.messaging.as_ref()).await else {
            self.advance(event, Stage::FetchFailed);
            return (Outcome::DownloadFailed, DOWNLOAD_FAILED_MESSAGE.to_string());
        };
        let Some(encoded) = image::encode(&bytes) else {
            self.advance(event, Stage::FetchFailed);
            return (Outcome::EncodeFailed, ENCODE_FAILED_MESSAGE.to_string());
        };
        self.advance(event, Stage::Fetched);

        self.advance(event, Stage::Classifying);
        let (outcome, raw) = match self.classifier.classify(&encoded).await {
            Ok(raw) => (Outcome::Replied, raw),
            Err(e) => {
                log::error!(
                    "message {}: classification failed ({}): {}",
                    event.message_id,
                    if e.is_transient() { "transient" } else { "permanent" },
                    e
                );
                (Outcome::ServiceUnavailable, UNAVAILABLE_SENTINEL.to_string())
            }
        };
        self.advance(event, Stage::Classified);

        self.advance(event, Stage::Formatting);
        (outcome, verdict::format(&raw))
    }

    async fn push_final(&self, event: &InboundEvent, text: &str) -> bool {
        match self.messaging.push_text(&event.recipient_id, text).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("message {}: final push failed: {}", event.message_id, e);
                false
            }
        }
    }
}
