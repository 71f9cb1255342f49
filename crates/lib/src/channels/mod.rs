//! Messaging platform channel (LINE).
//!
//! `MessagingApi` is the seam the pipeline talks to; `LineClient` is the HTTP implementation.
//! Webhook payloads are parsed here and image messages become `InboundEvent`s.

mod inbound;
mod line;
mod messaging;
mod signature;

pub use inbound::InboundEvent;
pub use line::{LineClient, LineEvent, LineMessage, LineSource, LineWebhookBody};
pub use messaging::{ContentStream, LineError, MessagingApi};
pub use signature::{sign_body, verify_signature, SignatureError};
