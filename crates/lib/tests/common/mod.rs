//! Fakes for the messaging and classifier seams.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Bytes;
use futures_util::StreamExt;
use lib::channels::{ContentStream, LineError, MessagingApi};
use lib::image::EncodedImage;
use lib::llm::{ClassifyError, ImageClassifier};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Reply { token: String, text: String },
    Push { to: String, text: String },
}

/// What `message_content` should yield.
pub enum Content {
    Chunks(Vec<&'static [u8]>),
    OpenFails,
    BreaksMidStream,
}

pub struct FakeMessaging {
    pub content: Content,
    pub reply_expired: bool,
    pub push_fails: bool,
    pub sent: Mutex<Vec<Sent>>,
}

impl FakeMessaging {
    pub fn with_content(content: Content) -> Self {
        Self {
            content,
            reply_expired: false,
            push_fails: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn pushes(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Push { text, .. } => Some(text),
                Sent::Reply { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl MessagingApi for FakeMessaging {
    async fn reply_text(&self, reply_token: &str, text: &str) -> Result<(), LineError> {
        if self.reply_expired {
            return Err(LineError::ReplyTokenExpired);
        }
        self.sent.lock().unwrap().push(Sent::Reply {
            token: reply_token.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn push_text(&self, to: &str, text: &str) -> Result<(), LineError> {
        if self.push_fails {
            return Err(LineError::Api {
                status: 500,
                body: "push failed".to_string(),
            });
        }
        self.sent.lock().unwrap().push(Sent::Push {
            to: to.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn message_content(&self, _message_id: &str) -> Result<ContentStream, LineError> {
        match &self.content {
            Content::Chunks(chunks) => {
                let items: Vec<Result<Bytes, LineError>> = chunks
                    .iter()
                    .map(|c| Ok(Bytes::from_static(*c)))
                    .collect();
                Ok(futures_util::stream::iter(items).boxed())
            }
            Content::OpenFails => Err(LineError::Api {
                status: 404,
                body: "not found".to_string(),
            }),
            Content::BreaksMidStream => {
                let items: Vec<Result<Bytes, LineError>> = vec![
                    Ok(Bytes::from_static(b"\xFF\xD8")),
                    Err(LineError::Api {
                        status: 502,
                        body: "connection reset".to_string(),
                    }),
                ];
                Ok(futures_util::stream::iter(items).boxed())
            }
        }
    }
}

pub struct FakeClassifier {
    pub verdict: Result<&'static str, fn() -> ClassifyError>,
    /// How long `classify` takes before answering.
    pub delay: Duration,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<EncodedImage>>,
}

impl FakeClassifier {
    pub fn answering(verdict: &'static str) -> Self {
        Self {
            verdict: Ok(verdict),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: fn() -> ClassifyError) -> Self {
        Self {
            verdict: Err(err),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageClassifier for FakeClassifier {
    async fn classify(&self, image: &EncodedImage) -> Result<String, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(image.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.verdict {
            Ok(v) => Ok(v.to_string()),
            Err(make) => Err(make()),
        }
    }
}
