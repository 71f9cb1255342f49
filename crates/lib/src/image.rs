//! Image download and transport encoding.

use crate::channels::MessagingApi;
use base64::Engine;
use futures_util::StreamExt;

const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";

/// Base64 image data plus the media type used in the data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub media_type: &'static str,
    pub data: String,
}

impl EncodedImage {
    /// `data:<media type>;base64,<data>` for inline attachment.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// Download the content of `message_id`, concatenating every chunk. Any error yields None.
pub async fn download(message_id: &str, api: &dyn MessagingApi) -> Option<Vec<u8>> {
    log::info!("downloading image for message {}", message_id);
    let mut stream = match api.message_content(message_id).await {
        Ok(s) => s,
        Err(e) => {
            log::warn!("image download failed for message {}: {}", message_id, e);
            return None;
        }
    };
    let mut buffer = Vec::new();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => buffer.extend_from_slice(&bytes),
            Err(e) => {
                log::warn!("image download interrupted for message {}: {}", message_id, e);
                return None;
            }
        }
    }
    log::debug!("downloaded {} bytes for message {}", buffer.len(), message_id);
    Some(buffer)
}

/// Base64-encode image bytes. Empty input is not an image and yields None.
pub fn encode(bytes: &[u8]) -> Option<EncodedImage> {
    if bytes.is_empty() {
        log::warn!("image encode failed: empty content");
        return None;
    }
    Some(EncodedImage {
        media_type: sniff_media_type(bytes),
        data: base64::engine::general_purpose::STANDARD.encode(bytes),
    })
}

/// Media type from magic bytes; JPEG when unknown.
fn sniff_media_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        DEFAULT_MEDIA_TYPE
    }
}
