//! Inbound image event: what the pipeline needs from one webhook event.

use crate::channels::line::LineEvent;

/// An image message from a user, group or room, ready for the classify pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub message_id: String,
    /// Push target: user id, else group id, else room id.
    pub recipient_id: String,
    pub reply_token: String,
}

impl InboundEvent {
    /// Build from a webhook event. None unless it is a `message` event carrying an `image`
    /// with a reply token and an addressable source.
    pub fn from_line_event(event: &LineEvent) -> Option<Self> {
        if event.typ != "message" {
            return None;
        }
        let message = event.message.as_ref()?;
        if message.typ != "image" {
            return None;
        }
        let reply_token = event.reply_token.clone()?;
        let recipient_id = event.source.as_ref()?.recipient_id()?;
        Some(Self {
            message_id: message.id.clone(),
            recipient_id,
            reply_token,
        })
    }
}
