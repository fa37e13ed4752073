//! Messaging-platform boundary: the outbound reply/push HTTP client and
//! inbound webhook signature verification.

pub mod client;
pub mod signature;

pub use client::{
    LineClient, LineClientConfig, ReplyDeliveryError, DEFAULT_LINE_API_BASE,
    MAX_MESSAGES_PER_SEND,
};
pub use signature::{sign_webhook_body, verify_webhook_signature, WEBHOOK_SIGNATURE_HEADER};
