//! Classifier seam and the fixed waste-classification prompt.

use crate::image::EncodedImage;
use async_trait::async_trait;
use std::time::Duration;

/// Verdict the model is told to return when the item cannot be identified.
pub const UNRECOGNIZED_SENTINEL: &str = "無法辨識";
/// Verdict used in place of a model answer when the service call fails.
pub const UNAVAILABLE_SENTINEL: &str = "分析服務暫時無法使用";

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("classification timed out after {0:?}")]
    Timeout(Duration),
    #[error("classification rate limited: {0}")]
    RateLimited(String),
    #[error("classification unauthorized: {0}")]
    Unauthorized(String),
    #[error("classification api error: {status} {body}")]
    Api { status: u16, body: String },
    #[error("classification request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("classification returned no content")]
    EmptyResponse,
}

impl ClassifyError {
    /// True for failures that may succeed on a later attempt (deadline, rate limit, transport, 5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            ClassifyError::Timeout(_) | ClassifyError::RateLimited(_) => true,
            ClassifyError::Request(e) => !e.is_decode(),
            ClassifyError::Api { status, .. } => *status >= 500,
            ClassifyError::Unauthorized(_) | ClassifyError::EmptyResponse => false,
        }
    }
}

/// Classifies one encoded image into a raw verdict string.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    async fn classify(&self, image: &EncodedImage) -> Result<String, ClassifyError>;
}

/// Instruction prompt embedding the category vocabulary.
pub fn build_prompt(categories: &[&str]) -> String {
    format!(
        "You are a Taiwan waste classification expert. Analyze the main item in this image and reply strictly in this format: `item_name, category`

Categories: {}

Rules:
- Identify the main item name in Chinese
- Choose the correct category
- If unclear, reply: \"{}\"
- No extra text or explanations

Examples:
- 寶特瓶, 資源回收
- 香蕉皮, 廚餘
- 電池, 有害垃圾",
        categories.join(", "),
        UNRECOGNIZED_SENTINEL
    )
}
