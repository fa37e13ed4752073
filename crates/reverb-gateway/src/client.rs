use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{redirect::Policy, StatusCode};
use reverb_domain::ReplyMessage;
use reverb_engine::ReplyGateway;
use serde_json::{json, Value};

pub const DEFAULT_LINE_API_BASE: &str = "https://api.line.me";
/// The platform caps reply and push payloads at five messages per call.
pub const MAX_MESSAGES_PER_SEND: usize = 5;
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Clone)]
/// Public struct `LineClientConfig` used to construct the platform client.
pub struct LineClientConfig {
    pub api_base: String,
    pub channel_access_token: String,
    pub http_timeout_ms: u64,
}

impl Default for LineClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_LINE_API_BASE.to_string(),
            channel_access_token: String::new(),
            http_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone)]
/// Structured delivery failure with a stable reason code; callers never retry
/// within the core.
pub struct ReplyDeliveryError {
    pub reason_code: String,
    pub detail: String,
    pub http_status: Option<u16>,
}

impl std::fmt::Display for ReplyDeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "reason_code={} http_status={} detail={}",
            self.reason_code,
            self.http_status
                .map(|value| value.to_string())
                .unwrap_or_else(|| "none".to_string()),
            self.detail
        )
    }
}

impl std::error::Error for ReplyDeliveryError {}

#[derive(Debug, Clone)]
/// Platform messaging client: correlated replies against a reply token, plus
/// uncorrelated pushes (the shared send-message shape used by batch delivery).
pub struct LineClient {
    config: LineClientConfig,
    http: reqwest::Client,
}

impl LineClient {
    pub fn new(config: LineClientConfig) -> Result<Self> {
        if config.channel_access_token.trim().is_empty() {
            bail!("line client requires a channel access token");
        }
        if config.http_timeout_ms == 0 {
            bail!("line client requires http timeout > 0");
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .redirect(Policy::none())
            .build()
            .context("failed to build line http client")?;
        Ok(Self { config, http })
    }

    pub async fn send_reply(
        &self,
        reply_token: &str,
        messages: &[ReplyMessage],
    ) -> Result<(), ReplyDeliveryError> {
        if reply_token.trim().is_empty() {
            return Err(invalid_input("reply token cannot be empty"));
        }
        let body = reply_payload(reply_token, messages)?;
        self.post("/v2/bot/message/reply", body).await
    }

    pub async fn send_push(
        &self,
        to: &str,
        messages: &[ReplyMessage],
    ) -> Result<(), ReplyDeliveryError> {
        if to.trim().is_empty() {
            return Err(invalid_input("push recipient cannot be empty"));
        }
        let body = push_payload(to, messages)?;
        self.post("/v2/bot/message/push", body).await
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<(), ReplyDeliveryError> {
        let url = format!("{}{}", self.config.api_base.trim_end_matches('/'), endpoint);
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.config.channel_access_token.trim())
            .json(&body)
            .send()
            .await
            .map_err(|error| ReplyDeliveryError {
                reason_code: "delivery_transport_error".to_string(),
                detail: error.to_string(),
                http_status: None,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = response
            .text()
            .await
            .unwrap_or_default()
            .trim()
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        Err(ReplyDeliveryError {
            reason_code: classify_status(status).to_string(),
            detail: format!("platform returned {}: {}", status.as_u16(), detail),
            http_status: Some(status.as_u16()),
        })
    }
}

#[async_trait]
impl ReplyGateway for LineClient {
    async fn reply(&self, reply_token: &str, messages: &[ReplyMessage]) -> Result<()> {
        self.send_reply(reply_token, messages).await?;
        Ok(())
    }
}

fn reply_payload(reply_token: &str, messages: &[ReplyMessage]) -> Result<Value, ReplyDeliveryError> {
    Ok(json!({
        "replyToken": reply_token,
        "messages": capped_messages(messages)?,
    }))
}

fn push_payload(to: &str, messages: &[ReplyMessage]) -> Result<Value, ReplyDeliveryError> {
    Ok(json!({
        "to": to,
        "messages": capped_messages(messages)?,
    }))
}

fn capped_messages(messages: &[ReplyMessage]) -> Result<Vec<&ReplyMessage>, ReplyDeliveryError> {
    if messages.is_empty() {
        return Err(invalid_input("at least one message is required"));
    }
    Ok(messages.iter().take(MAX_MESSAGES_PER_SEND).collect())
}

fn invalid_input(detail: &str) -> ReplyDeliveryError {
    ReplyDeliveryError {
        reason_code: "delivery_invalid_input".to_string(),
        detail: detail.to_string(),
        http_status: None,
    }
}

fn classify_status(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "delivery_invalid_request",
        401 | 403 => "delivery_auth_rejected",
        429 => "delivery_throttled",
        500..=599 => "delivery_platform_unavailable",
        _ => "delivery_http_error",
    }
}
